use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::marketplace::auth::{read_claims_unverified, AuthError, Claims};
use crate::marketplace::domain::UserType;

/// Logged-in state: the bearer token plus what it says about the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub token: String,
    #[serde(rename = "userType")]
    pub user_type: UserType,
    #[serde(rename = "userInfo")]
    pub user_info: Claims,
}

/// On-disk shape. Any missing key means there is no session.
#[derive(Debug, Default, Deserialize)]
struct StoredDocument {
    token: Option<String>,
    #[serde(rename = "userType")]
    user_type: Option<UserType>,
    #[serde(rename = "userInfo")]
    user_info: Option<Claims>,
}

impl StoredDocument {
    fn into_snapshot(self) -> Option<SessionSnapshot> {
        Some(SessionSnapshot {
            token: self.token?,
            user_type: self.user_type?,
            user_info: self.user_info?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("login token could not be read: {0}")]
    InvalidToken(#[source] AuthError),
    #[error("session state lock poisoned")]
    Poisoned,
}

/// Persistence for the session document.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionSnapshot>, SessionError>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Session document kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let document: StoredDocument = serde_json::from_str(&raw)?;
        Ok(document.into_snapshot())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(snapshot)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local store for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    document: Mutex<Option<SessionSnapshot>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, SessionError> {
        Ok(self
            .document
            .lock()
            .map_err(|_| SessionError::Poisoned)?
            .clone())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        *self.document.lock().map_err(|_| SessionError::Poisoned)? = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.document.lock().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}

/// Authentication session shared by every request a client makes.
///
/// Read on each request, written only by [`Session::establish`] and
/// [`Session::logout`]. The store always mirrors the in-memory state.
pub struct Session {
    store: Arc<dyn SessionStore>,
    state: RwLock<Option<SessionSnapshot>>,
}

impl Session {
    /// Load whatever the store holds.
    pub fn init(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let state = store.load()?;
        debug!(authenticated = state.is_some(), "session loaded");
        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    /// Session with nothing persisted, for one-off calls.
    pub fn ephemeral() -> Self {
        Self {
            store: Arc::new(MemorySessionStore::default()),
            state: RwLock::new(None),
        }
    }

    /// Record a freshly issued token. The payload is decoded for display only.
    pub fn establish(&self, token: String) -> Result<SessionSnapshot, SessionError> {
        let claims = read_claims_unverified(&token).map_err(SessionError::InvalidToken)?;
        let snapshot = SessionSnapshot {
            token,
            user_type: claims.user_type,
            user_info: claims,
        };
        self.store.save(&snapshot)?;
        *self.state.write().map_err(|_| SessionError::Poisoned)? = Some(snapshot.clone());
        info!(user_id = %snapshot.user_info.user_id, user_type = %snapshot.user_type, "session established");
        Ok(snapshot)
    }

    /// Forget the token, the user type and the user info together.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.clear()?;
        *self.state.write().map_err(|_| SessionError::Poisoned)? = None;
        info!("session cleared");
        Ok(())
    }

    pub fn current(&self) -> Option<SessionSnapshot> {
        self.state.read().ok().and_then(|state| state.clone())
    }

    pub fn bearer(&self) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.as_ref().map(|snapshot| snapshot.token.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
