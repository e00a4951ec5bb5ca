use crate::storage::StorageError;
use serde::Deserialize;
use std::fmt;

/// Token endpoint used when the key file does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The subset of a Google service-account key file needed to obtain tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

impl ServiceAccountKey {
    /// Parses a key from its JSON text.
    ///
    /// Keys pasted into secret stores often arrive with the PEM line breaks
    /// written as the two characters `\n`; those are turned back into newlines.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let mut key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| StorageError::CredentialError(e.to_string()))?;
        key.private_key = normalize_private_key(&key.private_key);

        if key.client_email.trim().is_empty() {
            return Err(StorageError::CredentialError("client_email is empty".to_owned()));
        }
        if !key.private_key.starts_with("-----BEGIN") {
            return Err(StorageError::CredentialError(
                "private_key is not a PEM encoded key".to_owned(),
            ));
        }
        Ok(key)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Replaces literal `\n` sequences with newlines and trims surrounding whitespace.
pub(crate) fn normalize_private_key(key: &str) -> String {
    key.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .trim()
        .to_owned()
}
