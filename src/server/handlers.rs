use crate::server::page;
use crate::server::AppState;
use crate::server::SESSION_COOKIE;
use crate::spreadsheet::XLSX_MIME;
use crate::workflow::export::ExportRequest;
use crate::workflow::session::Notice;
use crate::workflow::session::Session;
use axum::extract::Multipart;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use axum::Form;
use chrono::Local;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Name of the form field carrying the uploaded workbook
const FILE_FIELD: &str = "file";
/// Prefix of editor grid fields, followed by `{row}:{col}`
const CELL_FIELD_PREFIX: &str = "cell:";

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Reads the session id from the request cookies.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(|id| Uuid::parse_str(id.trim()).ok())
}

fn cookie_value(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

fn session_cookie(id: Uuid) -> [(HeaderName, String); 1] {
    [(header::SET_COOKIE, cookie_value(id))]
}

fn resolve_session(state: &AppState, headers: &HeaderMap) -> (Uuid, Arc<Mutex<Session>>) {
    state.sessions.resolve(session_id(headers))
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded = url::form_urlencoded::byte_serialize(filename.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}

pub(super) async fn index() -> Redirect {
    Redirect::to("/intake")
}

pub(super) async fn healthz() -> &'static str {
    "ok"
}

pub(super) async fn intake_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = resolve_session(&state, &headers);
    let mut session = session.lock().await;
    (session_cookie(id), Html(page::intake(&mut session))).into_response()
}

pub(super) async fn intake_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let (id, session) = resolve_session(&state, &headers);
    let mut session = session.lock().await;

    let mut upload = None::<(String, Vec<u8>)>;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or("upload.xlsx").to_owned();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(error) => {
                        warn!(%error, "upload body rejected");
                        session.intake.notify(Notice::Error(format!("Error reading uploaded file: {}", error.body_text())));
                        break;
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "upload body rejected");
                session.intake.notify(Notice::Error(format!("Error reading uploaded file: {}", error.body_text())));
                break;
            }
        }
    }

    if let Some((file_name, bytes)) = upload {
        // failures are queued as notices on the intake tab
        let _ = state.workflow.intake(&mut session, &file_name, bytes);
    }
    (session_cookie(id), Redirect::to("/intake")).into_response()
}

pub(super) async fn intake_archive(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = resolve_session(&state, &headers);
    let mut session = session.lock().await;
    let _ = state.workflow.archive_original(&mut session, today()).await;
    (session_cookie(id), Redirect::to("/intake")).into_response()
}

pub(super) async fn amend_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = resolve_session(&state, &headers);
    let mut session = session.lock().await;
    let html = page::amend(&mut session, state.workflow.editable_columns(), today());
    (session_cookie(id), Html(html)).into_response()
}

/// Applies grid edits, then saves the form or runs the export.
pub(super) async fn amend_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let (id, session) = resolve_session(&state, &headers);
    let mut session = session.lock().await;

    let mut request = ExportRequest::new(today());
    let mut action = String::new();
    let mut edits = Vec::<(usize, usize, String)>::new();
    let mut valid_date = true;
    for (name, value) in fields {
        match name.as_str() {
            "editor_name" => request.editor_name = value,
            "branch" => request.branch = value,
            "custom_branch" => request.custom_branch = value,
            "action" => action = value,
            "dst_date" => match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
                Ok(date) => request.date = date,
                Err(_) => valid_date = false,
            },
            name => {
                if let Some((row, col)) = parse_cell_field(name) {
                    edits.push((row, col, value));
                }
            }
        }
    }

    apply_edits(&state, &mut session, edits);

    if action == "export" && valid_date {
        let _ = state.workflow.export(&mut session, request).await;
    } else {
        if !valid_date {
            session.amend.notify(Notice::Error("Please enter the DST date as YYYY-MM-DD.".to_owned()));
        }
        session.draft = Some(request);
    }
    (session_cookie(id), Redirect::to("/amend")).into_response()
}

fn apply_edits(state: &AppState, session: &mut Session, edits: Vec<(usize, usize, String)>) {
    for (row, col, input) in edits {
        let column = session
            .current_table()
            .and_then(|table| table.column_names().nth(col))
            .map(str::to_owned);
        match column {
            Some(column) => {
                // rejected edits are queued as notices on the amendment tab
                let _ = state.workflow.edit(session, row, &column, &input);
            }
            None => warn!(row, col, "edit to unknown cell ignored"),
        }
    }
}

fn parse_cell_field(name: &str) -> Option<(usize, usize)> {
    let (row, col) = name.strip_prefix(CELL_FIELD_PREFIX)?.split_once(':')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

pub(super) async fn download(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = resolve_session(&state, &headers);
    let session = session.lock().await;
    match session.last_export() {
        Some(file) => (
            [
                (header::SET_COOKIE, cookie_value(id)),
                (header::CONTENT_TYPE, XLSX_MIME.to_owned()),
                (header::CONTENT_DISPOSITION, content_disposition(&file.filename)),
            ],
            file.bytes.to_owned(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            session_cookie(id),
            Html("<p>No amended DST has been generated yet. <a href=\"/amend\">Back</a></p>"),
        )
            .into_response(),
    }
}
