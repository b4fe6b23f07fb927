//! Persisted login session: token, user and expiry on disk.

use crate::api::models::auth::{LoginResponse, SessionUser};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// What survives between invocations after a successful login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl From<LoginResponse> for StoredSession {
    fn from(response: LoginResponse) -> Self {
        Self {
            token: response.token,
            user: response.user,
            expires_at: response.expires_at,
        }
    }
}

/// File-backed session storage. The file is removed on logout and whenever an expired session
/// is found.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, discarding it if it has expired.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<Option<StoredSession>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, e)),
        };

        let session: StoredSession = match serde_json::from_str(&contents) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Discarding unreadable session file: {}", e);
                self.clear()?;
                return Ok(None);
            }
        };

        if session.is_expired_at(now) {
            tracing::info!(username = %session.user.username, "Stored session expired, clearing");
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))?;
        }

        let contents = serde_json::to_string_pretty(session).map_err(|e| Error::Storage { message: e.to_string() })?;
        write_private(&self.path, &contents).map_err(|e| storage_error(&self.path, e))
    }

    /// Remove the stored session. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }
}

/// Write a file readable by its owner only.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // `mode` only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}

fn storage_error(path: &Path, e: std::io::Error) -> Error {
    Error::Storage {
        message: format!("{}: {e}", path.display()),
    }
}
