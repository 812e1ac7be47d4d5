use std::sync::Arc;

use progress_core::model::{
    LearningPath, PathProgress, ProgressRecord, ProgressSummary, achievements,
};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::changes::StorageChange;
use crate::progress_service::ProgressService;

/// One view's observable copy of the progress record.
///
/// Each refresh or mutation swaps in a new `Arc`, so callers comparing by
/// pointer identity (`Arc::ptr_eq`) can detect updates. Changes published by
/// other views on the same [`crate::ChangeFeed`] are picked up by [`Self::sync`]
/// or [`Self::changed`].
pub struct ProgressBinding {
    service: ProgressService,
    current: Arc<ProgressRecord>,
    updates: broadcast::Receiver<StorageChange>,
}

impl ProgressBinding {
    /// Subscribe to changes, then load the current record.
    pub async fn attach(service: ProgressService) -> Self {
        let updates = service.changes().subscribe();
        let current = Arc::new(service.get_progress().await);
        Self {
            service,
            current,
            updates,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressRecord> {
        Arc::clone(&self.current)
    }

    #[must_use]
    pub fn is_topic_completed(&self, topic_id: &str) -> bool {
        self.current.is_topic_completed(topic_id)
    }

    #[must_use]
    pub fn is_case_study_completed(&self, case_study_id: &str) -> bool {
        self.current.is_case_study_completed(case_study_id)
    }

    /// Completed topics and case studies as a percentage of `total`.
    #[must_use]
    pub fn overall_progress(&self, total: usize) -> u8 {
        self.current.overall_progress(total)
    }

    #[must_use]
    pub fn topics_progress(&self, total_topics: usize) -> u8 {
        self.current.topics_progress(total_topics)
    }

    #[must_use]
    pub fn case_studies_progress(&self, total_case_studies: usize) -> u8 {
        self.current.case_studies_progress(total_case_studies)
    }

    #[must_use]
    pub fn path_progress(&self, path: &LearningPath) -> PathProgress {
        self.current.path_progress(path)
    }

    #[must_use]
    pub fn achievements(&self) -> Vec<String> {
        achievements(&self.current)
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.service.summary(&self.current)
    }

    pub async fn mark_topic_completed(&mut self, topic_id: &str) {
        let record = self.service.mark_topic_completed(topic_id).await;
        self.replace(record);
    }

    pub async fn mark_case_study_completed(&mut self, case_study_id: &str) {
        let record = self.service.mark_case_study_completed(case_study_id).await;
        self.replace(record);
    }

    pub async fn add_time_spent(&mut self, minutes: u32) {
        let record = self.service.add_time_spent(minutes).await;
        self.replace(record);
    }

    pub async fn reset_progress(&mut self) {
        self.service.reset_progress().await;
        self.refresh().await;
    }

    /// Re-read the record from storage.
    pub async fn refresh(&mut self) {
        let record = self.service.get_progress().await;
        self.replace(record);
    }

    /// Apply pending notifications for this store's key without waiting.
    ///
    /// Returns whether the record was refreshed.
    pub async fn sync(&mut self) -> bool {
        let mut stale = false;
        loop {
            match self.updates.try_recv() {
                Ok(change) => stale |= change.key == self.service.key(),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress binding lagged behind change feed");
                    stale = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if stale {
            self.refresh().await;
        }
        stale
    }

    /// Wait for the next notification for this store's key, then refresh.
    ///
    /// Returns `false` if the feed has shut down.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.updates.recv().await {
                Ok(change) if change.key == self.service.key() => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress binding lagged behind change feed");
                    break;
                }
                Err(RecvError::Closed) => return false,
            }
        }
        self.refresh().await;
        true
    }

    fn replace(&mut self, record: ProgressRecord) {
        self.current = Arc::new(record);
    }
}
