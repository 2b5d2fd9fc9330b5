/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Publish/subscribe channel for authentication events.
//!
//! The client never calls into UI code on logout. It publishes an
//! [`AuthEvent`] here and whoever cares (navigation bar, route guards)
//! subscribes.

use crate::constants::{DEFAULT_EVENT_CAPACITY, LOGOUT_EVENT};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The session was cleared because it could not be recovered.
    Logout,
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::Logout => LOGOUT_EVENT,
        }
    }
}

/// Broadcast bus carrying [`AuthEvent`]s. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    /// Creates a bus buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Each subscriber receives every event published after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Publishes to all current subscribers.
    ///
    /// Fails only when nobody is listening, which callers may ignore.
    pub fn publish(&self, event: AuthEvent) -> Result<(), broadcast::error::SendError<AuthEvent>> {
        self.sender.send(event)?;
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
