/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Where the user is, and how to send them somewhere else.

use crate::constants::RETURN_URL_PARAM;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Abstracts the application's location so the client can redirect to the
/// login view without depending on a UI framework.
pub trait Navigator: Send + Sync {
    /// Current location, path plus query string (e.g. `/content/5?tab=info`).
    fn current_location(&self) -> String;

    fn navigate_to(&self, url: &str);
}

/// Whether `location` is already the login view or one of its sub-routes.
pub fn is_login_location(location: &str, login_path: &str) -> bool {
    let path = location.split('?').next().unwrap_or(location);
    path == login_path
        || path
            .strip_prefix(login_path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Login URL that brings the user back to `return_to` after signing in.
pub fn login_redirect_url(login_path: &str, return_to: &str) -> String {
    format!(
        "{}?{}={}",
        login_path,
        RETURN_URL_PARAM,
        urlencoding::encode(return_to)
    )
}

#[derive(Debug, Default)]
struct NavigationState {
    location: String,
    history: Vec<String>,
}

/// Navigator keeping the location in memory and recording every navigation.
///
/// Suits headless tools and tests, where "changing the location" means
/// remembering it.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    state: Mutex<NavigationState>,
}

impl MemoryNavigator {
    pub fn new(location: &str) -> Self {
        Self {
            state: Mutex::new(NavigationState {
                location: location.to_string(),
                history: Vec::new(),
            }),
        }
    }

    /// Moves to `location` without recording a navigation.
    pub fn set_location(&self, location: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.location = location.to_string();
    }

    /// Every URL passed to [`Navigator::navigate_to`], oldest first.
    pub fn history(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.history.clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> String {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.location.clone()
    }

    fn navigate_to(&self, url: &str) {
        info!("Navigating to {}", url);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.location = url.to_string();
        state.history.push(url.to_string());
    }
}
