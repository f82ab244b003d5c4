//! Per-user session persistence.
//!
//! Each user owns exactly one [`StoredSession`] document. The document is
//! created lazily on first read and replaced wholesale on every save.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use opticontrol_types::{StoredSession, UserId};
use opticontrol_utils::{AtomicWriteOptions, atomic_write_with_options, recover_bak_file};
use thiserror::Error;

/// Prefix of every stored session key.
pub const SESSION_KEY_PREFIX: &str = "opticontrol_session_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user id '{0}' cannot be used as a storage key")]
    InvalidUserId(String),
    #[error("session storage I/O failed at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("stored session at {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode session: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

/// Storage key for a user's session document.
#[must_use]
pub fn session_key(user_id: &UserId) -> String {
    format!("{SESSION_KEY_PREFIX}{user_id}")
}

pub trait SessionStore: Send + Sync {
    fn load(&self, user_id: &UserId) -> Result<Option<StoredSession>, StoreError>;
    fn save(&self, session: &StoredSession) -> Result<(), StoreError>;
    fn clear(&self, user_id: &UserId) -> Result<(), StoreError>;
}

/// The user's stored session.
///
/// A user without one gets a fresh first-time session, saved before it is
/// returned so later reads see the same `session_id`.
pub fn get_stored_session(
    store: &dyn SessionStore,
    user_id: &UserId,
) -> Result<StoredSession, StoreError> {
    if let Some(session) = store.load(user_id)? {
        return Ok(session);
    }
    let fresh = StoredSession::new(user_id.clone());
    store.save(&fresh)?;
    Ok(fresh)
}

pub fn save_stored_session(
    store: &dyn SessionStore,
    session: &StoredSession,
) -> Result<(), StoreError> {
    store.save(session)
}

pub fn clear_session(store: &dyn SessionStore, user_id: &UserId) -> Result<(), StoreError> {
    store.clear(user_id)
}

// ============================================================================
// File backend
// ============================================================================

/// One JSON document per user under `<data_dir>/sessions/`.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    write_options: AtomicWriteOptions,
}

impl FileSessionStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let dir = data_dir.join("sessions");
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        restrict_dir_permissions(&dir);
        tracing::debug!(path = %dir.display(), "Opened session store");
        Ok(Self {
            dir,
            write_options: AtomicWriteOptions::default(),
        })
    }

    #[must_use]
    pub fn with_write_options(mut self, options: AtomicWriteOptions) -> Self {
        self.write_options = options;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &UserId) -> Result<PathBuf, StoreError> {
        let raw = user_id.as_str();
        let file_safe = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !file_safe {
            return Err(StoreError::InvalidUserId(raw.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", session_key(user_id))))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, user_id: &UserId) -> Result<Option<StoredSession>, StoreError> {
        let path = self.path_for(user_id)?;
        recover_bak_file(&path);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        let path = self.path_for(&session.user_id)?;
        let bytes = serde_json::to_vec_pretty(session).map_err(StoreError::Encode)?;
        atomic_write_with_options(&path, &bytes, self.write_options)
            .map_err(|source| StoreError::Io { path, source })?;
        tracing::debug!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            messages = session.messages.len(),
            "Saved session"
        );
        Ok(())
    }

    fn clear(&self, user_id: &UserId) -> Result<(), StoreError> {
        let path = self.path_for(user_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
        tracing::warn!(path = %dir.display(), "Failed to restrict session dir permissions: {e}");
    }
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) {}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<UserId, StoredSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, user_id: &UserId) -> Result<Option<StoredSession>, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(user_id).cloned())
    }

    fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions.insert(session.user_id.clone(), session.clone());
        Ok(())
    }

    fn clear(&self, user_id: &UserId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions.remove(user_id);
        Ok(())
    }
}
