/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Durable key/value storage for session credentials.
//!
//! The client reaches the session only through [`SessionStore`], so the
//! backing medium is chosen by whoever builds the client: memory for tests and
//! short lived tools, a JSON file for anything that must survive a restart.

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_KEY};
use crate::error::StorageError;
use crate::session::interface::{SessionCredentials, UserRecord};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Synchronous key/value store holding the session.
///
/// Every single operation is atomic. [`SessionStore::clear`] removes all
/// session keys in one step, no caller can observe a state where only some of
/// them are gone.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Removes the access token, refresh token and user record together.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Reads the full session, `None` when no access token is stored.
///
/// A user record that no longer parses is dropped with a warning rather than
/// failing the whole read.
pub fn read_credentials(store: &dyn SessionStore) -> Result<Option<SessionCredentials>, StorageError> {
    let Some(access_token) = store.get(ACCESS_TOKEN_KEY)? else {
        return Ok(None);
    };
    let refresh_token = store.get(REFRESH_TOKEN_KEY)?;
    let user = store
        .get(USER_KEY)?
        .and_then(|raw| match serde_json::from_str::<UserRecord>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Failed to parse stored user record: {}", e);
                None
            }
        });

    Ok(Some(SessionCredentials {
        access_token,
        refresh_token,
        user,
    }))
}

/// Writes every present part of `credentials`. Absent parts are left untouched.
pub fn write_credentials(
    store: &dyn SessionStore,
    credentials: &SessionCredentials,
) -> Result<(), StorageError> {
    if !credentials.access_token.is_empty() {
        store.set(ACCESS_TOKEN_KEY, &credentials.access_token)?;
    }
    if let Some(refresh_token) = credentials.refresh_token.as_deref() {
        store.set(REFRESH_TOKEN_KEY, refresh_token)?;
    }
    if let Some(user) = &credentials.user {
        store.set(USER_KEY, &serde_json::to_string(user)?)?;
    }
    Ok(())
}

fn poisoned() -> StorageError {
    StorageError::Unavailable("session lock poisoned".to_string())
}

/// Process local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        for key in SESSION_KEYS {
            entries.remove(key);
        }
        Ok(())
    }
}

/// Session store persisted as a JSON object in a single file.
///
/// Writes go to a sibling temporary file that is renamed over the original,
/// so a crash mid-write leaves the previous session intact.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Session persisted to {}", self.path.display());
        Ok(())
    }

    fn update<F>(&self, mutate: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.load()?;
        mutate(&mut entries);
        self.persist(&entries)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    /// Clearing always succeeds on an unreadable file: it is replaced by an
    /// empty session instead of locking the user in a broken one.
    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(StorageError::Serialization(e)) => {
                warn!(
                    "Discarding corrupt session file {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        for key in SESSION_KEYS {
            entries.remove(key);
        }
        self.persist(&entries)
    }
}
