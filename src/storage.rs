//! Persistent key-value storage
//!
//! String get/set/delete over a pluggable backend, plus the credential pair
//! (auth token + serialized user) that makes up a stored session.
//! The file backend lives at ~/.local/share/cinemate/session.json

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::User;

/// Key holding the opaque auth token
pub const TOKEN_KEY: &str = "auth_token";
/// Key holding the serialized user
pub const USER_KEY: &str = "user_data";

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage data is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Async string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// In-memory backend
// =============================================================================

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

// =============================================================================
// File backend
// =============================================================================

/// JSON-object file store
///
/// Every operation re-reads the file so several processes sharing the same
/// path see each other's writes. A missing or unreadable file is an empty
/// store; the next write replaces it.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default location (~/.local/share/cinemate/session.json)
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("cinemate").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => match serde_json::from_str(&text) {
                Ok(items) => Ok(items),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Session file is corrupt, starting empty"
                    );
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, items: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(items)?;
        // Replace atomically so an interrupted write never truncates the store
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Credential pair
// =============================================================================

/// Token and user restored from storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredential {
    pub token: String,
    pub user: User,
}

/// Reads and writes the token/user pair as one unit
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn token(&self) -> Result<Option<String>, StorageError> {
        self.store.get_item(TOKEN_KEY).await
    }

    pub async fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set_item(TOKEN_KEY, token).await
    }

    pub async fn remove_token(&self) -> Result<(), StorageError> {
        self.store.remove_item(TOKEN_KEY).await
    }

    /// Both halves of the session, or `None` when either is missing or unreadable
    pub async fn load(&self) -> Result<Option<StoredCredential>, StorageError> {
        let token = self.store.get_item(TOKEN_KEY).await?;
        let user_json = self.store.get_item(USER_KEY).await?;

        let (Some(token), Some(user_json)) = (token, user_json) else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some(StoredCredential { token, user })),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user data is unreadable, ignoring session");
                Ok(None)
            }
        }
    }

    /// Write both keys; a failed user write removes the token again
    pub async fn save(&self, token: &str, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.store.set_item(TOKEN_KEY, token).await?;
        if let Err(e) = self.store.set_item(USER_KEY, &user_json).await {
            if let Err(cleanup) = self.store.remove_item(TOKEN_KEY).await {
                tracing::warn!(error = %cleanup, "Could not roll back stored token");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Replace the stored user without touching the token
    pub async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.store.set_item(USER_KEY, &user_json).await
    }

    /// Remove both keys; attempts both even if the first fails
    pub async fn clear(&self) -> Result<(), StorageError> {
        let token = self.store.remove_item(TOKEN_KEY).await;
        let user = self.store.remove_item(USER_KEY).await;
        token.and(user)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
