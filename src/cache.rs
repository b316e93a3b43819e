//! Cached result of the most recent sign-in.
//!
//! Other commands read the token and registry from here instead of parsing
//! `.npmrc` files.

use std::{io, path::Path};

use serde::{Deserialize, Serialize};

use crate::{npmrc::write_file_atomic, signin::SessionResult};

/// File name of the cache inside the config directory.
pub const CACHE_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to access session cache: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse session cache: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCache {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("registry", &self.registry)
            .finish()
    }
}

impl SessionCache {
    /// Load the cache, treating a missing file as empty.
    pub async fn load(path: &Path) -> Result<Self, CacheError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a completed sign-in.
    pub fn record(&mut self, session: &SessionResult) {
        self.token = Some(session.token.clone());
        self.registry = Some(session.registry.clone());
    }

    /// Write the cache readable only by the owner.
    pub async fn store(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        write_file_atomic(path, data.as_bytes(), Some(0o600)).await?;

        tracing::debug!(path = %path.display(), "Session cache stored");
        Ok(())
    }
}
