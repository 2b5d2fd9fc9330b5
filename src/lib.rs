/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Authenticated REST client for the digital library API.
//!
//! [`AuthenticatedHttpClient`] attaches the stored bearer token to every
//! outgoing request, answers a `401` with a single refresh-and-retry cycle and
//! forces a clean logout when the session cannot be recovered. Session state,
//! the logout broadcast and navigation are injected collaborators, see
//! [`session::store::SessionStore`], [`session::events::AuthEventBus`] and
//! [`transport::navigator::Navigator`].

pub mod config;

pub mod constants;

pub mod error;

pub mod session;

pub mod transport;

pub mod utils;

pub use config::Config;
pub use error::AppError;
pub use transport::http_client::AuthenticatedHttpClient;
