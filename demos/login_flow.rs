/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/
use anyhow::Result;
use library_client::config::Config;
use library_client::session::auth::AuthService;
use library_client::session::events::AuthEventBus;
use library_client::session::interface::LoginCredentials;
use library_client::session::store::{FileSessionStore, MemorySessionStore, SessionStore};
use library_client::transport::navigator::{MemoryNavigator, Navigator};
use library_client::AuthenticatedHttpClient;
use serde_json::Value;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt::init();

    let config = Config::new();
    let store: Arc<dyn SessionStore> = match &config.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path)),
        None => Arc::new(MemorySessionStore::new()),
    };
    let events = AuthEventBus::default();
    let navigator = Arc::new(MemoryNavigator::new("/orders"));

    let mut logout_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = logout_rx.recv().await {
            println!("Received {}", event.name());
        }
    });

    let client = AuthenticatedHttpClient::new(&config, store, events, navigator.clone())?;
    let auth = AuthService::new(client.clone());

    if !auth.is_authenticated() {
        let credentials = LoginCredentials {
            email: env::var("LIBRARY_EMAIL").unwrap_or_else(|_| "user@demo.local".to_string()),
            password: env::var("LIBRARY_PASSWORD").unwrap_or_else(|_| "User123!".to_string()),
        };
        match auth.login(&credentials).await {
            Ok(response) => println!("Logged in, token type {}", response.token_type),
            Err(e) => {
                eprintln!("Login failed: {} (status {:?})", e, e.status());
                return Ok(());
            }
        }
    }

    match client.get::<Value>("/orders").await {
        Ok(orders) => println!("Orders: {}", orders),
        Err(e) => eprintln!("Request failed: {} (status {:?})", e, e.status()),
    }

    println!("Current location: {}", navigator.current_location());
    Ok(())
}
