//! Settings read from the environment at startup.
use crate::workflow::Folders;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_ORIGINAL_FOLDER_ID: &str = "1evbb47pc4wVovWkzmIXEtFADXogiVKBy";
pub const DEFAULT_AMENDED_FOLDER_ID: &str = "1uHnJYnk_ULo5xtxJyAwxE_4OddFOZQUm";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}: {message}")]
    InvalidValueError {
        name: &'static str,
        value: String,
        message: String,
    },

    #[error("Missing service account: set DST_SERVICE_ACCOUNT_JSON or DST_SERVICE_ACCOUNT_FILE")]
    MissingServiceAccountError,

    #[error("Read service account file '{path}' failed: {source}")]
    ServiceAccountFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub folders: Folders,
    /// Service-account key JSON
    pub service_account: String,
    pub http_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());

        let bind = lookup("DST_HTTP_BIND").unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let bind = bind.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValueError {
            name: "DST_HTTP_BIND",
            value: bind.to_owned(),
            message: e.to_string(),
        })?;

        let folders = Folders {
            original: lookup("DST_ORIGINAL_FOLDER_ID").unwrap_or_else(|| DEFAULT_ORIGINAL_FOLDER_ID.to_owned()),
            amended: lookup("DST_AMENDED_FOLDER_ID").unwrap_or_else(|| DEFAULT_AMENDED_FOLDER_ID.to_owned()),
        };

        let service_account = match (lookup("DST_SERVICE_ACCOUNT_JSON"), lookup("DST_SERVICE_ACCOUNT_FILE")) {
            (Some(json), _) => json,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::ServiceAccountFileError { path, source })?,
            (None, None) => return Err(ConfigError::MissingServiceAccountError),
        };

        let http_timeout = parse_in_range("DST_HTTP_TIMEOUT_SECS", lookup("DST_HTTP_TIMEOUT_SECS"), 1..=600, DEFAULT_HTTP_TIMEOUT_SECS)?;
        let max_upload_mb = parse_in_range("DST_MAX_UPLOAD_MB", lookup("DST_MAX_UPLOAD_MB"), 1..=1024, DEFAULT_MAX_UPLOAD_MB)?;

        Ok(Config {
            bind,
            folders,
            service_account,
            http_timeout: Duration::from_secs(http_timeout),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}

fn parse_in_range<T>(
    name: &'static str,
    value: Option<String>,
    range: std::ops::RangeInclusive<T>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
{
    let value = match value {
        Some(value) => value,
        None => return Ok(default),
    };
    match value.parse::<T>() {
        Ok(parsed) if range.contains(&parsed) => Ok(parsed),
        _ => Err(ConfigError::InvalidValueError {
            name,
            message: format!("expected a number between {} and {}", range.start(), range.end()),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[("DST_SERVICE_ACCOUNT_JSON", "{}")]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8501".parse::<SocketAddr>().unwrap());
        assert_eq!(config.folders.original, DEFAULT_ORIGINAL_FOLDER_ID);
        assert_eq!(config.folders.amended, DEFAULT_AMENDED_FOLDER_ID);
        assert_eq!(config.service_account, "{}");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("DST_HTTP_BIND", "0.0.0.0:9000"),
            ("DST_ORIGINAL_FOLDER_ID", "orig"),
            ("DST_AMENDED_FOLDER_ID", " amended "),
            ("DST_SERVICE_ACCOUNT_JSON", "{\"a\":1}"),
            ("DST_SERVICE_ACCOUNT_FILE", "/ignored.json"),
            ("DST_HTTP_TIMEOUT_SECS", "5"),
            ("DST_MAX_UPLOAD_MB", "10"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.folders.original, "orig");
        assert_eq!(config.folders.amended, "amended");
        assert_eq!(config.service_account, "{\"a\":1}");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn service_account_is_required() {
        assert!(matches!(config(&[]), Err(ConfigError::MissingServiceAccountError)));
        assert!(matches!(
            config(&[("DST_SERVICE_ACCOUNT_JSON", "  ")]),
            Err(ConfigError::MissingServiceAccountError)
        ));
        assert!(matches!(
            config(&[("DST_SERVICE_ACCOUNT_FILE", "/nonexistent/dst-key.json")]),
            Err(ConfigError::ServiceAccountFileError { .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let error = match config(&[("DST_SERVICE_ACCOUNT_JSON", "{}"), ("DST_HTTP_TIMEOUT_SECS", "0")]) {
            Err(error) => error,
            Ok(_) => panic!("a zero timeout was accepted"),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value '0' for DST_HTTP_TIMEOUT_SECS: expected a number between 1 and 600"
        );
        assert!(config(&[("DST_SERVICE_ACCOUNT_JSON", "{}"), ("DST_HTTP_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("DST_SERVICE_ACCOUNT_JSON", "{}"), ("DST_HTTP_BIND", "localhost")]).is_err());
    }
}
