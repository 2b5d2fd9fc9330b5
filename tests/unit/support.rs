use library_client::config::{AuthConfig, Config, RestApiConfig};
use library_client::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use library_client::session::events::{AuthEvent, AuthEventBus};
use library_client::session::store::{MemorySessionStore, SessionStore};
use library_client::transport::navigator::MemoryNavigator;
use library_client::utils::logger::setup_logger;
use library_client::AuthenticatedHttpClient;
use mockito::{Server, ServerGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub const USER_JSON: &str = r#"{
    "id": 42,
    "email": "reader@library.org",
    "full_name": "Avid Reader",
    "role": "subscriber",
    "is_active": true,
    "is_verified": true,
    "created_at": "2024-05-01T08:30:00Z"
}"#;

pub fn config_for(base_url: &str) -> Config {
    Config {
        rest_api: RestApiConfig {
            base_url: base_url.to_string(),
            timeout_ms: 5_000,
            default_headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            with_credentials: true,
        },
        auth: AuthConfig::default(),
        session_file: None,
    }
}

/// Mock backend plus a client wired to in-memory collaborators.
pub struct Harness {
    pub server: ServerGuard,
    pub store: Arc<MemorySessionStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub logout_rx: broadcast::Receiver<AuthEvent>,
    pub client: AuthenticatedHttpClient,
}

impl Harness {
    pub async fn new(location: &str) -> Self {
        setup_logger();
        let server = Server::new_async().await;
        let store = Arc::new(MemorySessionStore::new());
        let navigator = Arc::new(MemoryNavigator::new(location));
        let events = AuthEventBus::default();
        let logout_rx = events.subscribe();
        let client = AuthenticatedHttpClient::new(
            &config_for(&server.url()),
            store.clone(),
            events,
            navigator.clone(),
        )
        .unwrap();

        Self {
            server,
            store,
            navigator,
            logout_rx,
            client,
        }
    }

    pub fn with_session(self, access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        if let Some(token) = access_token {
            self.store.set(ACCESS_TOKEN_KEY, token).unwrap();
        }
        if let Some(token) = refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, token).unwrap();
        }
        self.store.set(USER_KEY, USER_JSON).unwrap();
        self
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap()
    }

    pub fn session_is_empty(&self) -> bool {
        [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY]
            .iter()
            .all(|key| self.stored(key).is_none())
    }

    /// Number of logout events published so far.
    pub fn drain_logout_events(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.logout_rx.try_recv() {
                Ok(AuthEvent::Logout) => count += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return count,
                Err(TryRecvError::Lagged(missed)) => count += missed as usize,
            }
        }
    }
}
