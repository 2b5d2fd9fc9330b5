/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use crate::constants::BEARER_SCHEME;
use crate::error::AppError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Which send of a logical request is being made.
///
/// Threaded through the dispatch loop instead of being stored on the request,
/// so one descriptor can be shared by concurrent calls without ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First send, a 401 may still be recovered by a refresh.
    Initial,
    /// The single resend after a successful refresh.
    Retried,
}

impl Attempt {
    pub fn next(self) -> Self {
        Attempt::Retried
    }

    pub fn is_retried(self) -> bool {
        self == Attempt::Retried
    }
}

/// Immutable description of one outgoing call.
///
/// Every builder method returns a new descriptor, the original stays usable.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    id: Uuid,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            id: Uuid::new_v4(),
            method,
            path,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, AppError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| AppError::InvalidRequest {
            message: format!("invalid header name: {}", name),
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| AppError::InvalidRequest {
            message: format!("invalid value for header {}", name),
        })?;
        let mut next = self.clone();
        next.headers.insert(name, value);
        Ok(next)
    }

    pub fn with_json<B: Serialize + ?Sized>(&self, body: &B) -> Result<Self, AppError> {
        let mut next = self.clone();
        next.body = Some(serde_json::to_value(body)?);
        Ok(next)
    }

    /// Copy of this descriptor carrying `Authorization: Bearer <token>`.
    ///
    /// The token itself never appears in the error.
    pub fn with_bearer(&self, token: &str) -> Result<Self, AppError> {
        let mut value = HeaderValue::from_str(&format!("{} {}", BEARER_SCHEME, token)).map_err(|_| {
            AppError::InvalidRequest {
                message: "access token is not a valid header value".to_string(),
            }
        })?;
        value.set_sensitive(true);
        let mut next = self.clone();
        next.headers.insert(AUTHORIZATION, value);
        Ok(next)
    }

    /// Stable identifier shared by every attempt of this request, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}
