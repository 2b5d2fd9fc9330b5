/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use crate::constants::{
    ACCESS_TOKEN_KEY, CIBN_LOGIN_PATH, CURRENT_USER_PATH, FORGOT_PASSWORD_PATH, LOGIN_PATH,
    LOGOUT_PATH, REFRESH_TOKEN_KEY, REGISTER_PATH, RESET_PASSWORD_PATH, USER_KEY,
};
use crate::error::AppError;
use crate::session::events::AuthEvent;
use crate::session::interface::{
    AuthResponse, CibnLoginCredentials, ForgotPasswordRequest, LoginCredentials,
    PasswordResetRequest, RegisterData, RegisterResponse, SessionCredentials, UserRecord, UserRole,
};
use crate::session::store::{read_credentials, write_credentials, SessionStore};
use crate::transport::http_client::AuthenticatedHttpClient;
use crate::transport::request::RequestDescriptor;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Authentication endpoints of the library API plus the session helpers
/// built on top of the stored credentials.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: AuthenticatedHttpClient,
}

impl AuthService {
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthenticatedHttpClient {
        &self.client
    }

    fn store(&self) -> &Arc<dyn SessionStore> {
        self.client.store()
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, AppError> {
        debug!("Authenticating user: {}", credentials.email);
        let response: AuthResponse = self
            .client
            .post(LOGIN_PATH, credentials)
            .await
            .inspect_err(|e| error!("Login failed: {}", e))?;
        self.set_auth_data(&response)?;
        info!("Authentication successful");
        Ok(response)
    }

    #[instrument(skip(self, credentials), fields(employee = %credentials.cibn_employee_id))]
    pub async fn cibn_login(
        &self,
        credentials: &CibnLoginCredentials,
    ) -> Result<AuthResponse, AppError> {
        let response: AuthResponse = self
            .client
            .post(CIBN_LOGIN_PATH, credentials)
            .await
            .inspect_err(|e| error!("CIBN login failed: {}", e))?;
        self.set_auth_data(&response)?;
        info!("CIBN authentication successful");
        Ok(response)
    }

    /// Creates an account. Does not sign the new user in.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn register(&self, data: &RegisterData) -> Result<UserRecord, AppError> {
        let response: RegisterResponse = self
            .client
            .post(REGISTER_PATH, data)
            .await
            .inspect_err(|e| error!("Registration failed: {}", e))?;
        Ok(response.user)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        self.client
            .post::<_, Value>(FORGOT_PASSWORD_PATH, &ForgotPasswordRequest { email })
            .await
            .inspect_err(|e| error!("Password reset request failed: {}", e))?;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        self.client
            .post::<_, Value>(
                RESET_PASSWORD_PATH,
                &PasswordResetRequest {
                    token,
                    new_password,
                },
            )
            .await
            .inspect_err(|e| error!("Password reset failed: {}", e))?;
        Ok(())
    }

    /// Fetches the signed-in user and refreshes the stored record.
    pub async fn current_user(&self) -> Result<UserRecord, AppError> {
        let user: UserRecord = self
            .client
            .get(CURRENT_USER_PATH)
            .await
            .inspect_err(|e| error!("Failed to fetch user data: {}", e))?;
        self.store().set(USER_KEY, &serde_json::to_string(&user)?)?;
        Ok(user)
    }

    /// New access token, or `None` if the refresh failed (session cleared).
    pub async fn refresh_token(&self) -> Option<String> {
        self.client.refresh_access_token().await
    }

    /// Tells the backend the session ends, then clears it locally whatever the
    /// backend answered and publishes the logout event once. A rejected token
    /// on the way out does not trigger the forced-logout redirect.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AppError> {
        let request = RequestDescriptor::new(Method::POST, LOGOUT_PATH);
        if let Err(e) = self.client.dispatch_once(request).await {
            warn!("Logout error: {}", e);
        }

        let cleared = self.store().clear();
        if self.client.events().publish(AuthEvent::Logout).is_err() {
            debug!("No subscribers for {}", AuthEvent::Logout.name());
        }
        cleared?;
        info!("Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.access_token(), Some(token) if !token.is_empty())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_key(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token_value(&self) -> Option<String> {
        self.read_key(REFRESH_TOKEN_KEY)
    }

    /// Stored user record. Missing, unreadable or malformed records are `None`.
    pub fn stored_user(&self) -> Option<UserRecord> {
        let raw = self.read_key(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                error!("Failed to parse user data: {}", e);
                None
            }
        }
    }

    pub fn session(&self) -> Result<Option<SessionCredentials>, AppError> {
        Ok(read_credentials(self.store().as_ref())?)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.stored_user().is_some_and(|user| user.role == role)
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.stored_user()
            .is_some_and(|user| roles.contains(&user.role))
    }

    fn set_auth_data(&self, response: &AuthResponse) -> Result<(), AppError> {
        write_credentials(
            self.store().as_ref(),
            &SessionCredentials {
                access_token: response.access_token.clone(),
                refresh_token: response.refresh_token.clone(),
                user: response.user.clone(),
            },
        )?;
        Ok(())
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.store().get(key) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read {} from session storage: {}", key, e);
                None
            }
        }
    }
}
