/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use crate::error::AppError;
use crate::session::interface::{RefreshRequest, RefreshResponse};
use crate::transport::response::RawResponse;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

/// Exchanges a refresh token for a new access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Returns the new access token. Any failure, including an answer without
    /// a token, is an error.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AppError>;
}

/// Calls the refresh endpoint of the library API directly, bypassing the
/// interceptors of the authenticated client.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: Client, base_url: &str, refresh_path: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), refresh_path),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        debug!("Attempting to refresh access token at {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| AppError::Network {
                message: format!("refresh request failed: {e}"),
            })?;
        let response = RawResponse::read(response).await?;

        if !response.status().is_success() {
            warn!("Refresh endpoint answered {}", response.status());
            return Err(response.into_error());
        }

        let body: RefreshResponse = response.decode()?;
        match body.access_token {
            Some(token) if !token.trim().is_empty() => {
                debug!("Successfully refreshed access token");
                Ok(token)
            }
            _ => Err(AppError::InvalidResponse {
                message: "no access token in refresh response".to_string(),
            }),
        }
    }
}
