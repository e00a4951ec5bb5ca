//! Google Drive v3 upload client authenticated with a service account.
use crate::spreadsheet::XLSX_MIME;
use crate::storage::FileStore;
use crate::storage::ServiceAccountKey;
use crate::storage::StorageError;
use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for each signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Uploads files to Drive folders.
///
/// One instance is shared by all sessions. The access token is cached and
/// refreshed under a mutex so concurrent uploads trigger at most one refresh.
pub struct DriveClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    upload_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl DriveClient {
    /// Creates a client; fails if the private key cannot be loaded.
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<DriveClient, StorageError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StorageError::CredentialError(format!("Load private key failed: {}", e)))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(DriveClient {
            http,
            key,
            signing_key,
            upload_url: DRIVE_UPLOAD_URL.to_owned(),
            token: Mutex::new(None),
        })
    }

    /// Overrides the upload endpoint.
    pub fn with_upload_url(mut self, url: impl Into<String>) -> DriveClient {
        self.upload_url = url.into();
        self
    }

    /// Builds the signed JWT bearer assertion exchanged for an access token.
    fn assertion(&self, now: i64) -> Result<String, StorageError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| StorageError::CredentialError(format!("Sign assertion failed: {}", e)))
    }

    /// Returns a cached access token, fetching a new one when it is about to expire.
    async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(Instant::now())) {
            return Ok(token.value.to_owned());
        }

        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let response = self.http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(TokenErrorResponse { error, error_description: Some(description) }) => {
                    format!("{}: {}", error, description)
                }
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => format!("HTTP {}: {}", status, body),
            };
            warn!(client_email = %self.key.client_email, %message, "token request rejected");
            return Err(StorageError::AuthError(message));
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "access token refreshed");
        *cached = Some(CachedToken {
            value: token.access_token.to_owned(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl FileStore for DriveClient {
    async fn upload(&self, folder_id: &str, bytes: &[u8], filename: &str) -> Result<String, StorageError> {
        let token = self.access_token().await?;
        let metadata = serde_json::to_string(&FileMetadata {
            name: filename,
            parents: [folder_id],
            mime_type: XLSX_MIME,
        })?;
        let boundary = format!("dst-{}", Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, XLSX_MIME, bytes);

        let response = self.http
            .post(&self.upload_url)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|response| response.error.message)
                .unwrap_or(body);
            warn!(folder_id, filename, status = status.as_u16(), %message, "upload rejected");
            return Err(StorageError::ApiError { status: status.as_u16(), message });
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(folder_id, filename, file_id = %uploaded.id, size = bytes.len(), "file uploaded");
        Ok(uploaded.id)
    }
}

/// Assembles a `multipart/related` body: JSON metadata part, then the file content.
fn multipart_related_body(boundary: &str, metadata: &str, mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
