use super::types::AUTH_TOKEN_KEY;
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Persistent storage for the session token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, token: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

pub struct InMemoryTokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// Token persisted as a small JSON key/value file, so it survives restarts
/// the way browser local storage does.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/voicetask-console/session.json`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("voicetask-console").join("session.json"))
            .ok_or_else(|| ConsoleError::Storage("Could not determine data directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed entries, or `None` when the file exists but is not a JSON map.
    /// A missing file reads as empty.
    async fn read_entries(&self) -> Result<Option<HashMap<String, String>>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Some(HashMap::new())),
            Err(e) => {
                return Err(ConsoleError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(Some(entries)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    async fn write_entries(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConsoleError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ConsoleError::Storage(format!("Failed to serialize session: {}", e)))?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ConsoleError::Storage(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        let entries = self.read_entries().await?.unwrap_or_default();
        Ok(entries.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty()).cloned())
    }

    async fn save(&self, token: &str) -> Result<()> {
        // An unreadable file is replaced rather than merged into.
        let mut entries = self.read_entries().await?.unwrap_or_default();
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries).await
    }

    async fn clear(&self) -> Result<()> {
        match self.read_entries().await? {
            Some(mut entries) => {
                if entries.remove(AUTH_TOKEN_KEY).is_some() {
                    self.write_entries(&entries).await?;
                }
                Ok(())
            }
            None => match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ConsoleError::Storage(format!(
                    "Failed to remove {}: {}",
                    self.path.display(),
                    e
                ))),
            },
        }
    }
}
