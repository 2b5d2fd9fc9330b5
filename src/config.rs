/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use crate::constants::{
    CIBN_LOGIN_PATH, DEFAULT_BASE_URL, DEFAULT_LOGIN_VIEW, DEFAULT_TIMEOUT_MS, LOGIN_PATH,
    LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::error;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub rest_api: RestApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Location of the durable session file, `None` keeps the session in memory.
    #[serde(default)]
    pub session_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RestApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    #[serde(default = "default_headers")]
    pub default_headers: BTreeMap<String, String>,
    /// Keep cookies between requests.
    #[serde(default)]
    pub with_credentials: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// View the user lands on after a forced logout.
    pub login_path: String,
    pub refresh_path: String,
    /// Endpoints whose 401 never triggers a refresh.
    pub auth_endpoints: Vec<String>,
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_VIEW.to_string(),
            refresh_path: REFRESH_PATH.to_string(),
            auth_endpoints: [
                LOGIN_PATH,
                CIBN_LOGIN_PATH,
                REGISTER_PATH,
                REFRESH_PATH,
                LOGOUT_PATH,
            ]
            .iter()
            .map(|path| path.to_string())
            .collect(),
        }
    }
}

impl AuthConfig {
    /// Whether `path` targets one of the authentication endpoints.
    ///
    /// Query strings and trailing slashes are ignored.
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        self.auth_endpoints
            .iter()
            .any(|endpoint| endpoint.trim_end_matches('/') == path)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"rest_api\":{},\"auth\":{},\"session_file\":{}}}",
            self.rest_api,
            self.auth,
            self.session_file
                .as_ref()
                .map_or("null".to_string(), |path| format!("\"{}\"", path))
        )
    }
}

impl fmt::Display for RestApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers = self
            .default_headers
            .keys()
            .map(|name| format!("\"{}\":\"[REDACTED]\"", name))
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "{{\"base_url\":\"{}\",\"timeout_ms\":{},\"default_headers\":{{{}}},\"with_credentials\":{}}}",
            self.base_url, self.timeout_ms, headers, self.with_credentials
        )
    }
}

impl fmt::Display for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoints = self
            .auth_endpoints
            .iter()
            .map(|endpoint| format!("\"{}\"", endpoint))
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "{{\"login_path\":\"{}\",\"refresh_path\":\"{}\",\"auth_endpoints\":[{}]}}",
            self.login_path, self.refresh_path, endpoints
        )
    }
}

pub fn get_env_or_default<T: FromStr>(env_var: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    match env::var(env_var) {
        Ok(val) => val.parse::<T>().unwrap_or_else(|_| {
            error!("Failed to parse {}: {}, using default", env_var, val);
            default
        }),
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Config {
            rest_api: RestApiConfig {
                base_url: get_env_or_default("LIBRARY_API_BASE_URL", String::from(DEFAULT_BASE_URL)),
                timeout_ms: get_env_or_default("LIBRARY_API_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
                default_headers: default_headers(),
                with_credentials: get_env_or_default("LIBRARY_API_WITH_CREDENTIALS", true),
            },
            auth: AuthConfig {
                login_path: get_env_or_default(
                    "LIBRARY_LOGIN_PATH",
                    String::from(DEFAULT_LOGIN_VIEW),
                ),
                ..AuthConfig::default()
            },
            session_file: env::var("LIBRARY_SESSION_FILE").ok(),
        }
    }
}
