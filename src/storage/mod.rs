//! # Storage
//!
//! Persists exported workbooks in a remote folder. The workflow only sees the
//! [`FileStore`] trait; [`drive::DriveClient`] is the Google Drive
//! implementation wired up in `main`.
use async_trait::async_trait;
use thiserror::Error;

pub mod credential;
pub mod drive;

pub use credential::ServiceAccountKey;
pub use drive::DriveClient;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid service account credential: {0}")]
    CredentialError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request to storage failed: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Encode request failed: {0}")]
    EncodingError(#[from] serde_json::Error),

    #[error("Storage returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },
}

/// A destination for finished files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Uploads `bytes` as `filename` into the folder and returns the new file id.
    ///
    /// A single attempt is made; failures are returned to the caller as-is.
    async fn upload(&self, folder_id: &str, bytes: &[u8], filename: &str) -> Result<String, StorageError>;
}
