use std::path::Path;
use std::sync::PoisonError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid settings: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    IoContext {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON: {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize JSON: {source}")]
    JsonSerialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("{method} {url} failed: {status}")]
    Http {
        method: String,
        url: String,
        status: u16,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    MalformedResponse(String),
    #[error("host error: {0}")]
    Host(String),
    #[error("lock poisoned: {0}")]
    Lock(String),
    #[error("{0}")]
    Message(String),
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedResponse(what.into())
    }
}

impl<T> From<PoisonError<T>> for AppError {
    fn from(err: PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_names_method_url_and_status() {
        let err = AppError::Http {
            method: "PUT".to_string(),
            url: "https://demo.zendesk.com/api/services/zis/integrations/x/configs/x_settings"
                .to_string(),
            status: 422,
        };
        let text = err.to_string();
        assert!(text.starts_with("PUT https://demo.zendesk.com"));
        assert!(text.ends_with("422"));
    }

    #[test]
    fn io_helper_keeps_path() {
        let err = AppError::io(
            "/tmp/settings.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/settings.json"));
    }
}
