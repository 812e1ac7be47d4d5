use async_trait::async_trait;
use progress_core::codec::PROGRESS_STORAGE_KEY;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the single progress slot.
///
/// Adapters move the serialized payload verbatim; decoding and defaulting
/// belong to the layers above.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Key of the slot this repository reads and writes.
    fn key(&self) -> &str;

    /// Read the raw payload, or `None` if the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the slot's payload.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be stored.
    async fn save(&self, payload: &str) -> Result<(), StorageError>;

    /// Remove the slot entirely. Clearing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Clones share the same slots, so several services built from clones see
/// each other's writes.
#[derive(Clone)]
pub struct InMemoryRepository {
    key: String,
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(PROGRESS_STORAGE_KEY)
    }

    #[must_use]
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A repository over the same slots but a different key.
    #[must_use]
    pub fn scoped(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slots: Arc::clone(&self.slots),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&self.key).cloned())
    }

    async fn save(&self, payload: &str) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(self.key.clone(), payload.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&self.key);
        Ok(())
    }
}

/// Stand-in for environments with no persistent backend at all.
///
/// Every call fails with `StorageError::Unavailable`.
#[derive(Clone, Debug)]
pub struct UnavailableRepository {
    key: String,
}

impl UnavailableRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: PROGRESS_STORAGE_KEY.to_owned(),
        }
    }
}

impl Default for UnavailableRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressRepository for UnavailableRepository {
    fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("no persistent backend".into()))
    }

    async fn save(&self, _payload: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no persistent backend".into()))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no persistent backend".into()))
    }
}

/// Holds the progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn in_memory_with_key(key: impl Into<String>) -> Self {
        Self::from_repository(InMemoryRepository::with_key(key))
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::from_repository(UnavailableRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: impl ProgressRepository + 'static) -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { progress }
    }
}
