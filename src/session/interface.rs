/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Subscriber,
    CibnMember,
    Admin,
}

/// User profile as returned by the auth endpoints and kept in session storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cibn_employee_id: Option<String>,
    /// Either a number or a decimal string depending on the backend version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrears: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_subscription: Option<Value>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Everything the session store holds for one signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<UserRecord>,
}

impl fmt::Display for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"access_token\":\"[REDACTED]\",\"refresh_token\":{},\"user\":{}}}",
            self.refresh_token
                .as_ref()
                .map_or("null".to_string(), |_| "\"[REDACTED]\"".to_string()),
            self.user
                .as_ref()
                .map_or("null".to_string(), |user| format!("\"{}\"", user.email))
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CibnLoginCredentials {
    pub cibn_employee_id: String,
    pub password: String,
}

impl fmt::Display for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"email\":\"{}\",\"password\":\"[REDACTED]\"}}",
            self.email
        )
    }
}

impl fmt::Display for CibnLoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"cibn_employee_id\":\"{}\",\"password\":\"[REDACTED]\"}}",
            self.cibn_employee_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cibn_employee_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub user: UserRecord,
}

/// Body returned by the login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub(crate) refresh_token: &'a str,
}

/// Body of a refresh call. The token is optional so a malformed answer is
/// reported as such instead of as a decoding failure.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordResetRequest<'a> {
    pub(crate) token: &'a str,
    pub(crate) new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub(crate) email: &'a str,
}
