/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use crate::config::{AuthConfig, Config};
use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::{AppError, ConfigError};
use crate::session::events::{AuthEvent, AuthEventBus};
use crate::session::refresh::{HttpTokenRefresher, TokenRefresher};
use crate::session::store::SessionStore;
use crate::transport::navigator::{is_login_location, login_redirect_url, Navigator};
use crate::transport::request::{Attempt, RequestDescriptor};
use crate::transport::response::RawResponse;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// What the response interceptor decided for one attempt.
enum Interception {
    Done(RawResponse),
    Retry { token: String, attempt: Attempt },
}

/// HTTP client for the library API with bearer authentication.
///
/// Before every send the stored access token, if any, is attached as
/// `Authorization: Bearer <token>`. A 401 from a non-auth endpoint triggers one
/// refresh and one resend of the original request. When the session cannot be
/// recovered the client clears it, publishes [`AuthEvent::Logout`] and
/// redirects to the login view with the current location as `returnUrl`.
///
/// Cloning is cheap and every clone shares the same collaborators.
#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    auth: AuthConfig,
    store: Arc<dyn SessionStore>,
    events: AuthEventBus,
    navigator: Arc<dyn Navigator>,
    refresher: Arc<dyn TokenRefresher>,
}

impl AuthenticatedHttpClient {
    /// Creates a client from `config` and its collaborators.
    ///
    /// Refreshing goes through an [`HttpTokenRefresher`] sharing the same
    /// connection pool; replace it with [`Self::with_refresher`].
    pub fn new(
        config: &Config,
        store: Arc<dyn SessionStore>,
        events: AuthEventBus,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AppError> {
        let rest_api = &config.rest_api;
        Url::parse(&rest_api.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {}", rest_api.base_url, e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &rest_api.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let timeout = Duration::from_millis(rest_api.timeout_ms);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .cookie_store(rest_api.with_credentials)
            .build()
            .map_err(ConfigError::ClientBuild)?;

        let base_url = rest_api.base_url.trim_end_matches('/').to_string();
        let refresher = Arc::new(HttpTokenRefresher::new(
            client.clone(),
            &base_url,
            &config.auth.refresh_path,
        ));

        Ok(Self {
            client,
            base_url,
            timeout,
            auth: config.auth.clone(),
            store,
            events,
            navigator,
            refresher,
        })
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn events(&self) -> &AuthEventBus {
        &self.events
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.execute(RequestDescriptor::new(Method::GET, path)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.execute(RequestDescriptor::new(Method::DELETE, path)).await
    }

    /// Sends `method path` with an optional JSON body.
    pub async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, AppError> {
        let descriptor = RequestDescriptor::new(method, path);
        let descriptor = match body {
            Some(body) => descriptor.with_json(body)?,
            None => descriptor,
        };
        self.execute(descriptor).await
    }

    /// Sends a prepared descriptor and decodes a successful body into `T`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T, AppError> {
        self.dispatch(request).await?.decode()
    }

    /// Runs the refresh sub-operation on its own.
    ///
    /// Returns the new access token, or `None` when there is no refresh token
    /// or the refresh failed. On failure the session has already been cleared.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Option<String> {
        let refresh_token = match self.store.get(REFRESH_TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                warn!("No refresh token available");
                return None;
            }
            Err(e) => {
                error!("Failed to read refresh token: {}", e);
                return None;
            }
        };

        let token = match self.refresher.refresh(&refresh_token).await {
            Ok(token) if !token.is_empty() => token,
            Ok(_) => {
                warn!("No access token in refresh response");
                self.clear_session();
                return None;
            }
            Err(e) => {
                error!("Failed to refresh token: {}", e);
                self.clear_session();
                return None;
            }
        };

        if let Err(e) = self.store.set(ACCESS_TOKEN_KEY, &token) {
            error!("Failed to store refreshed access token: {}", e);
            self.clear_session();
            return None;
        }
        info!("Access token refreshed");
        Some(token)
    }

    /// Sends once with the stored token attached and no response interception:
    /// a 401 neither refreshes nor forces a logout. For calls whose caller
    /// handles the session itself.
    pub(crate) async fn dispatch_once(
        &self,
        request: RequestDescriptor,
    ) -> Result<RawResponse, AppError> {
        let outgoing = self.intercept_request(&request)?;
        let response = self.send(&outgoing).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(response.into_error())
        }
    }

    /// Send loop. At most two iterations: the original send and, after a
    /// successful refresh, one resend whose outcome is final.
    #[instrument(skip(self, request), fields(id = %request.id(), method = %request.method(), path = request.path()))]
    async fn dispatch(&self, request: RequestDescriptor) -> Result<RawResponse, AppError> {
        let mut request = request;
        let mut attempt = Attempt::Initial;

        loop {
            let outgoing = self.intercept_request(&request)?;
            let response = self.send(&outgoing).await?;

            match self.intercept_response(&request, attempt, response).await? {
                Interception::Done(response) => return Ok(response),
                Interception::Retry {
                    token,
                    attempt: next,
                } => {
                    debug!("Retrying request with refreshed token");
                    request = request.with_bearer(&token)?;
                    attempt = next;
                }
            }
        }
    }

    /// Attaches the stored access token. A missing token leaves the request
    /// as it is; an unreadable store stops the request before it is sent.
    fn intercept_request(&self, request: &RequestDescriptor) -> Result<RequestDescriptor, AppError> {
        let token = self.store.get(ACCESS_TOKEN_KEY).map_err(|e| {
            error!("Failed to read access token from session storage: {}", e);
            AppError::from(e)
        })?;

        match token.filter(|token| !token.is_empty()) {
            Some(token) => {
                debug!("Auth token: token exists");
                request.with_bearer(&token)
            }
            None => {
                debug!("Auth token: no token found");
                Ok(request.clone())
            }
        }
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, AppError> {
        let url = format!("{}{}", self.base_url, request.path());
        debug!("Sending {} request to {}", request.method(), url);

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        RawResponse::read(response).await
    }

    async fn intercept_response(
        &self,
        request: &RequestDescriptor,
        attempt: Attempt,
        response: RawResponse,
    ) -> Result<Interception, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(Interception::Done(response));
        }

        let error = response.into_error();
        if status != StatusCode::UNAUTHORIZED {
            warn!("API request failed. Status: {}", status);
            return Err(error);
        }

        if attempt.is_retried() || self.auth.is_auth_endpoint(request.path()) {
            warn!(
                "Unauthorized on {} request, not refreshing",
                if attempt.is_retried() { "retried" } else { "auth" }
            );
            self.force_logout();
            return Err(error);
        }

        let next = attempt.next();
        match self.refresh_access_token().await {
            Some(token) => Ok(Interception::Retry {
                token,
                attempt: next,
            }),
            None => {
                self.force_logout();
                Err(error)
            }
        }
    }

    fn clear_session(&self) {
        if let Err(e) = self.store.clear() {
            error!("Failed to clear session storage: {}", e);
        }
    }

    /// Clears the session, publishes one logout event and redirects to the
    /// login view unless the user is already there.
    fn force_logout(&self) {
        info!("Forcing logout");
        self.clear_session();

        let event = AuthEvent::Logout;
        if self.events.publish(event).is_err() {
            debug!("No subscribers for {}", event.name());
        }

        let location = self.navigator.current_location();
        if is_login_location(&location, &self.auth.login_path) {
            debug!("Already on the login view, not redirecting");
            return;
        }
        self.navigator
            .navigate_to(&login_redirect_url(&self.auth.login_path, &location));
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        let message = if e.is_timeout() {
            format!("timeout of {}ms exceeded", self.timeout.as_millis())
        } else {
            format!("network error: {e}")
        };
        error!("Failed to send request: {}", message);
        AppError::Network { message }
    }
}

impl fmt::Debug for AuthenticatedHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedHttpClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
