//! Bearer credential providers
//!
//! The backend session token is injected into the API client through
//! [`CredentialProvider`] instead of being read from ambient storage.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session filename in the Unibox config directory
const SESSION_FILE: &str = "session.json";

/// Supplies the bearer token attached to every backend request
pub trait CredentialProvider: Send + Sync {
    /// Current token, or None when signed out
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, e.g. from the environment or a test
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider with no token; every request fails as unauthorized
    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Stored session data
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// Session token persisted as JSON in the config directory
///
/// The file is re-read on every request so a login performed by another
/// process is picked up without restarting.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// Use the session file at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use ~/.config/unibox/session.json
    pub fn open_default() -> Result<Self> {
        let path = config::config_path(SESSION_FILE).context("Could not determine config directory")?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a token obtained from a login
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        config::save_json_file(
            &self.path,
            &StoredSession {
                token: token.to_string(),
            },
        )
    }

    /// Forget the stored session (logout or rejected token)
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    fn load(&self) -> Result<StoredSession> {
        config::load_json_file(&self.path)
    }
}

impl CredentialProvider for SessionFile {
    fn bearer_token(&self) -> Option<String> {
        match self.load() {
            Ok(session) if !session.token.is_empty() => Some(session.token),
            Ok(_) => None,
            Err(e) => {
                debug!("No usable session at {}: {:#}", self.path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        assert_eq!(StaticCredentials::new("abc").bearer_token().as_deref(), Some("abc"));
        assert!(StaticCredentials::signed_out().bearer_token().is_none());
    }

    #[test]
    fn test_session_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("nested").join("session.json"));

        assert!(session.bearer_token().is_none());

        session.save("tok-1").unwrap();
        assert_eq!(session.bearer_token().as_deref(), Some("tok-1"));

        session.clear().unwrap();
        assert!(session.bearer_token().is_none());
        // Clearing twice is fine
        session.clear().unwrap();
    }

    #[test]
    fn test_empty_token_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"token": ""}"#).unwrap();
        assert!(SessionFile::new(path).bearer_token().is_none());
    }
}
