use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::changes::ChangeFeed;
use crate::error::{AppServicesError, FailureHook};
use crate::progress_binding::ProgressBinding;
use crate::progress_service::ProgressService;

/// Assembles app-facing services over one storage backend and change feed.
#[derive(Clone)]
pub struct AppServices {
    changes: ChangeFeed,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        key: &str,
        clock: Clock,
        on_failure: Option<FailureHook>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, key).await?;
        Ok(Self::from_storage(&storage, clock, on_failure))
    }

    /// Build services over a process-local in-memory slot.
    #[must_use]
    pub fn in_memory(key: &str, clock: Clock, on_failure: Option<FailureHook>) -> Self {
        Self::from_storage(&Storage::in_memory_with_key(key), clock, on_failure)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, on_failure: Option<FailureHook>) -> Self {
        let changes = ChangeFeed::new();
        let mut progress =
            ProgressService::new(clock, Arc::clone(&storage.progress), changes.clone());
        if let Some(hook) = on_failure {
            progress = progress.with_failure_hook(hook);
        }
        Self {
            changes,
            progress: Arc::new(progress),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// Open a new view bound to the shared store.
    pub async fn bind(&self) -> ProgressBinding {
        ProgressBinding::attach(self.progress.as_ref().clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use progress_core::time::fixed_clock;

    #[tokio::test]
    async fn views_from_one_app_share_store_and_feed() {
        let app = AppServices::in_memory("test-progress", fixed_clock(), None);
        let mut first = app.bind().await;
        let mut second = app.bind().await;
        assert_eq!(app.changes().subscriber_count(), 2);

        first.add_time_spent(2).await;
        assert!(second.sync().await);
        assert_eq!(second.progress().time_spent(), 2);
        assert_eq!(app.progress().key(), "test-progress");
    }
}
