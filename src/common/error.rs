//! Error types for groupsync

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Store Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request. Perhaps the object exists.")]
    Duplicate(String),

    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Corrupted record: {0}")]
    Corrupted(String),

    // === Payload Errors ===
    #[error("{0}")]
    InvalidPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Network Errors ===
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Did the request fail before a response came back?
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::ConnectionFailed(_) | Error::Timeout(_))
    }

    /// Status code returned by the remote node, if any
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Duplicate(_) | Error::InvalidPayload(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        if let Some(status) = e.status() {
            Error::HttpStatus {
                status: status.as_u16(),
                url,
            }
        } else if e.is_timeout() {
            Error::Timeout(format!("{}: {}", url, e))
        } else {
            Error::ConnectionFailed(format!("{}: {}", url, e))
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        let message = match &self {
            Error::NotFound(_) => "Not found".to_string(),
            Error::Json(_) => "Bad request. Invalid JSON body.".to_string(),
            other => other.to_string(),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
