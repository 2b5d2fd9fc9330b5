/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use crate::error::AppError;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

/// A response whose body has already been read, so it can be inspected by
/// the interceptors and still turned into either a payload or an error.
#[derive(Debug)]
pub(crate) struct RawResponse {
    status: StatusCode,
    body: String,
}

impl RawResponse {
    #[cfg(test)]
    pub(crate) fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub(crate) async fn read(response: Response) -> Result<Self, AppError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::Network {
            message: format!("failed to read response body: {e}"),
        })?;

        debug!("Response Status: {}", status);
        debug!("Response Body: {} bytes", body.len());

        Ok(Self { status, body })
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    /// Body as JSON, falling back to a JSON string for non-JSON payloads.
    pub(crate) fn body_value(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        Some(serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone())))
    }

    pub(crate) fn into_error(self) -> AppError {
        let message = format!("Request failed with status code {}", self.status.as_u16());
        let body = self.body_value();
        if self.status == StatusCode::UNAUTHORIZED {
            AppError::Unauthorized { message, body }
        } else {
            AppError::Http {
                status: self.status,
                message,
                body,
            }
        }
    }

    /// Deserializes the body. An empty body decodes as JSON `null`, so
    /// `()` and `Option<T>` payloads work for 204-style answers.
    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let text = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(text).map_err(|e| {
            error!("Failed to deserialize response body: {}", e);
            AppError::from(e)
        })
    }
}
