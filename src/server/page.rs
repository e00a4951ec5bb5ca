//! Server-rendered HTML for the two tabs.
use crate::table::Table;
use crate::workflow::amendment::ColumnPartition;
use crate::workflow::export::ExportRequest;
use crate::workflow::export::BRANCH_OPTIONS;
use crate::workflow::export::OTHER_BRANCH;
use crate::workflow::session::Notice;
use crate::workflow::session::Session;
use crate::workflow::WorkflowError;
use crate::workflow::PREVIEW_ROWS;
use chrono::NaiveDate;
use quick_xml::escape::escape;
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;}nav a{margin-right:1rem;}nav a.active{font-weight:bold;}\
table{border-collapse:collapse;margin:1rem 0;}th,td{border:1px solid #ccc;padding:2px 6px;}td.locked{background:#f3f3f3;color:#555;}\
td textarea{border:none;width:100%;min-width:8rem;font:inherit;resize:vertical;}.notice{padding:.5rem 1rem;margin:.5rem 0;white-space:pre-line;}\
.info{background:#e8f0fe;}.success{background:#e6f4ea;}.warning{background:#fef7e0;}.error{background:#fce8e6;}";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Intake,
    Amend,
}

fn layout(active: Tab, body: &str) -> String {
    let link = |tab: Tab, href: &str, label: &str| {
        let class = if tab == active { " class=\"active\"" } else { "" };
        format!("<a href=\"{}\"{}>{}</a>", href, class, label)
    };
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>DST Amendment Tool</title><style>{}</style></head>\
         <body><h1>DST Amendment Tool</h1><nav>{}{}</nav><hr>{}</body></html>",
        STYLE,
        link(Tab::Intake, "/intake", "1. BCC Upload DST"),
        link(Tab::Amend, "/amend", "2. FL Amend DST"),
        body
    )
}

fn notices(html: &mut String, notices: &[Notice]) {
    for notice in notices {
        let (class, message) = match notice {
            Notice::Info(message) => ("info", message),
            Notice::Success(message) => ("success", message),
            Notice::Warning(message) => ("warning", message),
            Notice::Error(message) => ("error", message),
        };
        let _ = write!(html, "<div class=\"notice {}\">{}</div>", class, escape(message.as_str()));
    }
}

/// Renders a table; cells of editable columns become text areas named `cell:{row}:{col}`.
///
/// Text areas keep line breaks on submit where `<input>` drops them. The
/// newline after the opening tag is swallowed by the HTML parser, so a value
/// starting with a newline survives.
fn table(html: &mut String, table: &Table, partition: Option<&ColumnPartition>) {
    html.push_str("<table><thead><tr><th></th>");
    for name in table.column_names() {
        let _ = write!(html, "<th>{}</th>", escape(name));
    }
    html.push_str("</tr></thead><tbody>");
    for row in 0..table.row_count() {
        let _ = write!(html, "<tr><th>{}</th>", row);
        for (col, (name, value)) in table.column_names().zip(table.row(row)).enumerate() {
            let text = value.to_string();
            match partition {
                Some(partition) if partition.is_editable(name) => {
                    let _ = write!(
                        html,
                        "<td><textarea name=\"cell:{}:{}\" rows=\"1\">\n{}</textarea></td>",
                        row,
                        col,
                        escape(text.as_str())
                    );
                }
                Some(_) => {
                    let _ = write!(html, "<td class=\"locked\">{}</td>", escape(text.as_str()));
                }
                None => {
                    let _ = write!(html, "<td>{}</td>", escape(text.as_str()));
                }
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
}

/// Tab 1: upload form, preview and archive button.
pub(crate) fn intake(session: &mut Session) -> String {
    let mut html = String::from("<h2>BCC: Upload Original DST</h2>");
    let pending = session.intake.take_notices();
    notices(&mut html, &pending);

    html.push_str(
        "<form method=\"post\" action=\"/intake\" enctype=\"multipart/form-data\">\
         <label>Upload DST Excel file (.xlsx) <input type=\"file\" name=\"file\" accept=\".xlsx\"></label> \
         <button type=\"submit\">Load DST</button></form>",
    );

    match session.handoff() {
        Some(handoff) => {
            let _ = write!(
                html,
                "<p>Loaded <b>{}</b>: {} rows, {} columns. Showing the first {} rows.</p>",
                escape(handoff.file_name.as_str()),
                handoff.table.row_count(),
                handoff.table.column_count(),
                PREVIEW_ROWS
            );
            table(&mut html, &handoff.table.head(PREVIEW_ROWS), None);
            html.push_str(
                "<form method=\"post\" action=\"/intake/archive\">\
                 <button type=\"submit\">Upload Original DST to Google Drive</button></form>",
            );
        }
        None if pending.is_empty() => {
            notices(&mut html, &[Notice::Info(WorkflowError::NoFileError.to_string())]);
        }
        None => {}
    }
    layout(Tab::Intake, &html)
}

/// Tab 2: editor grid and export form.
pub(crate) fn amend(session: &mut Session, editable_columns: &[String], today: NaiveDate) -> String {
    let mut html = String::from("<h2>FL: Amend DST</h2>");
    let pending = session.amend.take_notices();
    notices(&mut html, &pending);

    let current = match session.current_table() {
        Some(table) => table,
        None => {
            notices(&mut html, &[Notice::Warning(WorkflowError::NoTableError.to_string())]);
            return layout(Tab::Amend, &html);
        }
    };
    let partition = match session.amendment() {
        Some(amendment) => amendment.partition().to_owned(),
        None => ColumnPartition::new(current, editable_columns),
    };
    if let Some(warning) = partition.missing_columns_warning() {
        notices(&mut html, &[Notice::Warning(warning)]);
    }

    let draft = session.draft().cloned().unwrap_or_else(|| ExportRequest::new(today));
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/amend\">\
         <p><label>Your Name (required): <input name=\"editor_name\" value=\"{}\"></label></p>\
         <h3>DST Table (only specific columns are editable):</h3>",
        escape(draft.editor_name.as_str())
    );
    table(&mut html, current, Some(&partition));

    html.push_str("<h3>Export Amended DST</h3><p>");
    let _ = write!(
        html,
        "<label>DST Date <input type=\"date\" name=\"dst_date\" value=\"{}\"></label> ",
        draft.date.format("%Y-%m-%d")
    );
    html.push_str("<label>Branch <select name=\"branch\">");
    for option in BRANCH_OPTIONS {
        let selected = if draft.branch == option { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{0}\"{1}>{0}</option>", option, selected);
    }
    let _ = write!(
        html,
        "</select></label> <label>If '{}', specify branch code: <input name=\"custom_branch\" value=\"{}\"></label></p>",
        OTHER_BRANCH,
        escape(draft.custom_branch.as_str())
    );
    html.push_str(
        "<p><button type=\"submit\" name=\"action\" value=\"save\">Save Edits</button> \
         <button type=\"submit\" name=\"action\" value=\"export\">Generate &amp; Upload Amended DST</button></p></form>",
    );

    if let Some(file) = session.last_export() {
        let _ = write!(
            html,
            "<p><a href=\"/amend/download\">Download Amended DST</a> ({})</p>",
            escape(file.filename.as_str())
        );
    }
    layout(Tab::Amend, &html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use crate::workflow::session::Handoff;
    use crate::workflow::EDITABLE_COLUMNS;

    fn session_with(table: Table) -> Session {
        let mut session = Session::default();
        session.set_handoff(Some(Handoff {
            file_name: "dst <1>.xlsx".to_owned(),
            table,
            original_bytes: vec![],
        }));
        session
    }

    fn editable() -> Vec<String> {
        EDITABLE_COLUMNS.iter().map(|name| name.to_string()).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn locked_columns_have_no_text_areas() {
        let table = Table::from_rows(
            vec!["NAME".to_owned(), "PIC".to_owned()],
            vec![vec!["<b>Alice</b>".into(), "Bob".into()]],
        )
        .unwrap();
        let html = amend(&mut session_with(table), &editable(), today());

        assert!(html.contains("<td class=\"locked\">&lt;b&gt;Alice&lt;/b&gt;</td>"), "{}", html);
        assert!(html.contains("<textarea name=\"cell:0:1\" rows=\"1\">\nBob</textarea>"), "{}", html);
        assert!(!html.contains("cell:0:0"));
        assert!(html.contains("value=\"2024-05-01\""));
    }

    #[test]
    fn amend_without_table_warns() {
        let html = amend(&mut Session::default(), &editable(), today());
        assert!(html.contains("No DST loaded yet. Please ask BCC to upload DST in Tab 1."));
        assert!(!html.contains("<form"));
    }

    #[test]
    fn amend_warns_when_no_editable_column() {
        let table = Table::from_rows(vec!["NAME".to_owned()], vec![vec![Value::from("Alice")]]).unwrap();
        let html = amend(&mut session_with(table), &editable(), today());
        assert!(html.contains("None of the expected editable columns were found"));
    }

    #[test]
    fn intake_preview_is_limited() {
        let rows = (0..25).map(|index| vec![Value::Number(index as f64)]).collect();
        let table = Table::from_rows(vec!["N".to_owned()], rows).unwrap();
        let html = intake(&mut session_with(table));

        assert!(html.contains("dst &lt;1&gt;.xlsx"));
        assert!(html.contains("<td>19</td>"));
        assert!(!html.contains("<td>20</td>"));
        assert!(html.contains("Upload Original DST to Google Drive"));
    }

    #[test]
    fn intake_prompts_for_file() {
        let html = intake(&mut Session::default());
        assert!(html.contains("Please upload the daily DST Excel file provided by BCC."));
    }

    #[test]
    fn notices_are_shown_once() {
        let mut session = Session::default();
        session.intake.notify(Notice::Error("Error reading Excel file: boom".to_owned()));
        assert!(intake(&mut session).contains("class=\"notice error\">Error reading Excel file: boom"));
        assert!(!intake(&mut session).contains("boom"));
    }
}
