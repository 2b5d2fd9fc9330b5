/******************************************************************************
    Author: Joaquín Béjar García
    Email: jb@taunais.com
    Date: 16/10/26
 ******************************************************************************/
use reqwest::StatusCode;
use serde_json::Value;
use std::io;
use thiserror::Error;

/// Failures raised by a [`SessionStore`](crate::session::store::SessionStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Problems detected while building the client from its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid default header: {0}")]
    InvalidHeader(String),
    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Normalized outcome of every failed request.
///
/// Whatever went wrong, callers see a status (when a response arrived), a
/// message and the response body (when there was one), see [`AppError::status`],
/// [`AppError::message`] and [`AppError::body`].
#[derive(Debug, Error)]
pub enum AppError {
    /// No response reached the client: connection failure or timeout.
    #[error("{message}")]
    Network { message: String },
    /// The server answered with a non-2xx status other than a recoverable 401.
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: String,
        body: Option<Value>,
    },
    /// A 401 the client could not recover from.
    #[error("{message}")]
    Unauthorized { message: String, body: Option<Value> },
    /// The session store could not be read or written. The request was not sent.
    #[error("session storage unavailable")]
    Storage(#[from] StorageError),
    #[error("invalid client configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("unexpected response: {message}")]
    InvalidResponse { message: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// HTTP status of the response that produced this error, if any arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(status.as_u16()),
            AppError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Response body carried by the error, parsed as JSON when possible.
    pub fn body(&self) -> Option<&Value> {
        match self {
            AppError::Http { body, .. } | AppError::Unauthorized { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized { .. })
    }
}
