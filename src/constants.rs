/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

/// Session storage key holding the current access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Session storage key holding the long lived refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Session storage key holding the serialized user record.
pub const USER_KEY: &str = "user";

/// Every key owned by the session, cleared together on logout.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

pub const LOGIN_PATH: &str = "/auth/login";
pub const CIBN_LOGIN_PATH: &str = "/auth/cibn-login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const CURRENT_USER_PATH: &str = "/auth/me";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

/// Name of the broadcast emitted on a forced logout.
pub const LOGOUT_EVENT: &str = "auth:logout";

pub(crate) const BEARER_SCHEME: &str = "Bearer";
pub(crate) const RETURN_URL_PARAM: &str = "returnUrl";

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_LOGIN_VIEW: &str = "/login";
pub(crate) const DEFAULT_EVENT_CAPACITY: usize = 16;
