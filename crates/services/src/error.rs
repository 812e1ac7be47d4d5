//! Shared error types for the services crate.

use std::sync::Arc;

use thiserror::Error;

use progress_core::codec::CodecError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors raised inside `ProgressService`.
///
/// The store operations never return these; they are turned into a
/// [`ProgressFailure`] and the call degrades. Only `export` and `import`
/// hand them to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A degraded path taken by the progress store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProgressFailure {
    #[error("failed to load progress slot `{key}`: {reason}")]
    LoadFailed { key: String, reason: String },
    #[error("progress slot `{key}` is malformed, using defaults: {reason}")]
    Malformed { key: String, reason: String },
    #[error("progress slot `{key}` had unreadable fields {fields:?}, using defaults for them")]
    PartiallyRead {
        key: String,
        fields: Vec<&'static str>,
    },
    #[error("failed to save progress slot `{key}`: {reason}")]
    SaveFailed { key: String, reason: String },
    #[error("failed to clear progress slot `{key}`: {reason}")]
    ClearFailed { key: String, reason: String },
}

/// Observer for degraded paths, injected into `ProgressService`.
pub type FailureHook = Arc<dyn Fn(&ProgressFailure) + Send + Sync>;

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
