use std::sync::Arc;

use progress_core::codec;
use progress_core::model::{ItemKind, ProgressRecord, ProgressSummary, achievements};
use storage::repository::ProgressRepository;
use tokio::sync::Mutex;

use crate::Clock;
use crate::changes::{ChangeFeed, StorageChange};
use crate::error::{FailureHook, ProgressFailure, ProgressServiceError};

/// The learner's progress store.
///
/// Every public operation completes without surfacing an error: storage and
/// decoding problems are logged, handed to the failure hook, and the call
/// falls back to defaults or to an unpersisted in-memory result.
///
/// Writes through one service (and its clones) run one at a time.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    changes: ChangeFeed,
    on_failure: Option<FailureHook>,
    write_lock: Arc<Mutex<()>>,
}

/// Outcome of reading the slot for a write.
struct Loaded {
    record: ProgressRecord,
    /// False when storage could not be read; saving would clobber the slot.
    writable: bool,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>, changes: ChangeFeed) -> Self {
        Self {
            clock,
            repo,
            changes,
            on_failure: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Observe degraded paths (failed loads, saves, malformed payloads).
    #[must_use]
    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Key of the persisted slot.
    #[must_use]
    pub fn key(&self) -> &str {
        self.repo.key()
    }

    #[must_use]
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// Read the persisted record, or defaults if absent or unreadable.
    ///
    /// Never writes: defaults are not persisted until the first mutation.
    pub async fn get_progress(&self) -> ProgressRecord {
        self.load().await.record
    }

    async fn load(&self) -> Loaded {
        let now = self.clock.now();
        let raw = match self.repo.load().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return Loaded {
                    record: ProgressRecord::new(now),
                    writable: true,
                };
            }
            Err(err) => {
                self.report(ProgressFailure::LoadFailed {
                    key: self.key().to_owned(),
                    reason: err.to_string(),
                });
                return Loaded {
                    record: ProgressRecord::new(now),
                    writable: false,
                };
            }
        };

        let record = match codec::decode(&raw, now) {
            Ok(decoded) => {
                if !decoded.skipped_fields.is_empty() {
                    self.report(ProgressFailure::PartiallyRead {
                        key: self.key().to_owned(),
                        fields: decoded.skipped_fields,
                    });
                }
                decoded.record
            }
            Err(err) => {
                self.report(ProgressFailure::Malformed {
                    key: self.key().to_owned(),
                    reason: err.to_string(),
                });
                ProgressRecord::new(now)
            }
        };
        Loaded {
            record,
            writable: true,
        }
    }

    /// Mark a topic complete. Completing it again changes nothing.
    pub async fn mark_topic_completed(&self, topic_id: &str) -> ProgressRecord {
        self.mark_completed(ItemKind::Topic, topic_id).await
    }

    /// Mark a case study complete. Completing it again changes nothing.
    pub async fn mark_case_study_completed(&self, case_study_id: &str) -> ProgressRecord {
        self.mark_completed(ItemKind::CaseStudy, case_study_id).await
    }

    pub async fn mark_completed(&self, kind: ItemKind, id: &str) -> ProgressRecord {
        let clock = self.clock;
        self.mutate("mark_completed", |record| record.complete(kind, id, &clock))
            .await
    }

    /// Accrue whole study minutes. Not idempotent: every call adds.
    ///
    /// Callers holding fractional time round it before calling; the stored
    /// total is an integer count of minutes.
    pub async fn add_time_spent(&self, minutes: u32) -> ProgressRecord {
        let clock = self.clock;
        self.mutate("add_time_spent", |record| {
            record.add_time_spent(minutes, &clock);
            true
        })
        .await
    }

    /// Delete the persisted record. The next read returns fresh defaults.
    pub async fn reset_progress(&self) {
        let _guard = self.write_lock.lock().await;
        match self.repo.clear().await {
            Ok(()) => {
                tracing::info!(key = self.key(), "progress reset");
                self.changes.publish(StorageChange::cleared(self.key()));
            }
            Err(err) => self.report(ProgressFailure::ClearFailed {
                key: self.key().to_owned(),
                reason: err.to_string(),
            }),
        }
    }

    /// Logged achievements plus reached milestones, most recent ten.
    #[must_use]
    pub fn achievements(&self, record: &ProgressRecord) -> Vec<String> {
        achievements(record)
    }

    #[must_use]
    pub fn summary(&self, record: &ProgressRecord) -> ProgressSummary {
        ProgressSummary::from_record(
            record,
            self.clock.calendar_date(record.start_date()),
            self.clock.today(),
        )
    }

    /// Serialized form of the stored record. An empty slot exports defaults.
    ///
    /// Strict like [`Self::import`]: an unreadable slot is an error rather
    /// than an empty backup.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the slot cannot be read and
    /// `ProgressServiceError::Codec` if it cannot be decoded or encoded.
    pub async fn export(&self) -> Result<String, ProgressServiceError> {
        let now = self.clock.now();
        let record = match self.repo.load().await? {
            Some(raw) => {
                let decoded = codec::decode(&raw, now)?;
                if !decoded.skipped_fields.is_empty() {
                    tracing::warn!(
                        key = self.key(),
                        fields = ?decoded.skipped_fields,
                        "exported progress had unreadable fields"
                    );
                }
                decoded.record
            }
            None => ProgressRecord::new(now),
        };
        Ok(codec::encode(&record)?)
    }

    /// Replace the stored record with an exported payload.
    ///
    /// Unlike the store operations this is strict: a payload that cannot be
    /// decoded, or a failed write, is returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Codec` for malformed input and
    /// `ProgressServiceError::Storage` if persisting fails.
    pub async fn import(&self, raw: &str) -> Result<ProgressRecord, ProgressServiceError> {
        let decoded = codec::decode(raw, self.clock.now())?;
        if !decoded.skipped_fields.is_empty() {
            tracing::warn!(
                key = self.key(),
                fields = ?decoded.skipped_fields,
                "imported progress had unreadable fields"
            );
        }
        let _guard = self.write_lock.lock().await;
        self.persist(&decoded.record).await?;
        Ok(decoded.record)
    }

    async fn mutate<F>(&self, op: &'static str, apply: F) -> ProgressRecord
    where
        F: FnOnce(&mut ProgressRecord) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let Loaded { mut record, writable } = self.load().await;
        if !apply(&mut record) {
            tracing::debug!(key = self.key(), op, "no change");
            return record;
        }
        if !writable {
            self.report(ProgressFailure::SaveFailed {
                key: self.key().to_owned(),
                reason: "stored progress could not be read, change kept in memory only".into(),
            });
            return record;
        }
        match self.persist(&record).await {
            Ok(()) => tracing::debug!(key = self.key(), op, "progress saved"),
            Err(err) => self.report(ProgressFailure::SaveFailed {
                key: self.key().to_owned(),
                reason: err.to_string(),
            }),
        }
        record
    }

    async fn persist(&self, record: &ProgressRecord) -> Result<(), ProgressServiceError> {
        let payload = codec::encode(record)?;
        self.repo.save(&payload).await?;
        self.changes
            .publish(StorageChange::updated(self.key(), payload));
        Ok(())
    }

    fn report(&self, failure: ProgressFailure) {
        tracing::warn!(key = self.key(), "{failure}");
        if let Some(hook) = &self.on_failure {
            hook(&failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use progress_core::model::{Milestone, ProgressDraft};
    use progress_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, UnavailableRepository};

    fn service_over(repo: InMemoryRepository) -> ProgressService {
        ProgressService::new(fixed_clock(), Arc::new(repo), ChangeFeed::new())
    }

    fn recording_hook() -> (FailureHook, Arc<Mutex<Vec<ProgressFailure>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: FailureHook = Arc::new(move |failure: &ProgressFailure| {
            sink.lock().unwrap().push(failure.clone());
        });
        (hook, seen)
    }

    #[tokio::test]
    async fn fresh_state_marks_topic_and_starts_streak() {
        let service = service_over(InMemoryRepository::new());

        let record = service.mark_topic_completed("caching").await;
        assert!(record.is_topic_completed("caching"));
        assert_eq!(record.current_streak(), 1);
        assert!(
            service
                .achievements(&record)
                .contains(&"Completed topic: caching".to_string())
        );

        let reloaded = service.get_progress().await;
        assert_eq!(reloaded, record);
    }

    #[tokio::test]
    async fn second_completion_leaves_state_unchanged() {
        let service = service_over(InMemoryRepository::new());
        let first = service.mark_topic_completed("caching").await;
        let second = service.mark_topic_completed("caching").await;

        assert_eq!(first, second);
        assert_eq!(second.completed_topics().len(), 1);
        assert_eq!(second.achievements().len(), 1);
    }

    #[tokio::test]
    async fn get_progress_does_not_persist_defaults() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo.clone());

        let record = service.get_progress().await;
        assert_eq!(record, ProgressRecord::new(fixed_now()));
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_returns_to_defaults() {
        let service = service_over(InMemoryRepository::new());
        service.mark_topic_completed("caching").await;
        service.add_time_spent(30).await;

        service.reset_progress().await;
        let record = service.get_progress().await;
        assert!(record.completed_topics().is_empty());
        assert_eq!(record.current_streak(), 0);
        assert_eq!(record.time_spent(), 0);
        assert_eq!(record.last_active_date(), None);
    }

    #[tokio::test]
    async fn five_hours_of_time_unlocks_milestone() {
        let service = service_over(InMemoryRepository::new());
        for _ in 0..3 {
            service.add_time_spent(100).await;
        }
        let record = service.get_progress().await;
        assert_eq!(record.time_spent(), 300);
        assert!(
            service
                .achievements(&record)
                .contains(&Milestone::FiveHours.message().to_string())
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_reported_and_treated_as_absent() {
        let repo = InMemoryRepository::new();
        repo.save("{definitely not json").await.unwrap();
        let (hook, seen) = recording_hook();
        let service = service_over(repo).with_failure_hook(hook);

        let record = service.get_progress().await;
        assert_eq!(record, ProgressRecord::new(fixed_now()));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], ProgressFailure::Malformed { .. }));
    }

    #[tokio::test]
    async fn partial_payload_keeps_readable_fields() {
        let repo = InMemoryRepository::new();
        repo.save(r#"{"completedTopics":["dns"],"currentStreak":"lots"}"#)
            .await
            .unwrap();
        let (hook, seen) = recording_hook();
        let service = service_over(repo).with_failure_hook(hook);

        let record = service.get_progress().await;
        assert!(record.is_topic_completed("dns"));
        assert_eq!(record.current_streak(), 0);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            [ProgressFailure::PartiallyRead {
                key: service.key().to_owned(),
                fields: vec!["currentStreak"],
            }]
        );
    }

    #[tokio::test]
    async fn unavailable_storage_degrades_to_in_memory_result() {
        let (hook, seen) = recording_hook();
        let service = ProgressService::new(
            fixed_clock(),
            Arc::new(UnavailableRepository::new()),
            ChangeFeed::new(),
        )
        .with_failure_hook(hook);

        let record = service.mark_case_study_completed("netflix").await;
        assert!(record.is_case_study_completed("netflix"));
        assert_eq!(record.current_streak(), 1);

        service.reset_progress().await;

        let seen = seen.lock().unwrap();
        assert!(matches!(seen[0], ProgressFailure::LoadFailed { .. }));
        assert!(matches!(seen[1], ProgressFailure::SaveFailed { .. }));
        assert!(matches!(seen[2], ProgressFailure::ClearFailed { .. }));
    }

    #[tokio::test]
    async fn mutations_publish_changes_but_no_ops_do_not() {
        let service = service_over(InMemoryRepository::new());
        let mut rx = service.changes().subscribe();

        service.mark_topic_completed("caching").await;
        let change = rx.try_recv().unwrap();
        assert_eq!(change.key, service.key());
        assert!(change.new_value.unwrap().contains("caching"));

        service.mark_topic_completed("caching").await;
        assert!(rx.try_recv().is_err());

        service.reset_progress().await;
        assert_eq!(rx.try_recv().unwrap().new_value, None);
    }

    #[tokio::test]
    async fn streak_extends_across_days() {
        let repo = InMemoryRepository::new();
        let mut draft = ProgressDraft::new();
        draft.current_streak = 3;
        draft.last_active_date = Some(fixed_now() - chrono::Duration::days(1));
        repo.save(&codec::encode(&draft.into_record(fixed_now())).unwrap())
            .await
            .unwrap();
        let service = service_over(repo);

        let record = service.add_time_spent(1).await;
        assert_eq!(record.current_streak(), 4);
        let again = service.add_time_spent(1).await;
        assert_eq!(again.current_streak(), 4);
    }

    #[tokio::test]
    async fn import_rejects_garbage_and_accepts_exports() {
        let source = service_over(InMemoryRepository::new());
        source.mark_topic_completed("queues").await;
        let exported = source.export().await.unwrap();

        let target = service_over(InMemoryRepository::new());
        assert!(matches!(
            target.import("nope").await,
            Err(ProgressServiceError::Codec(_))
        ));
        let imported = target.import(&exported).await.unwrap();
        assert!(imported.is_topic_completed("queues"));
        assert_eq!(target.get_progress().await, imported);
    }

    #[tokio::test]
    async fn export_surfaces_unreadable_storage() {
        let unavailable = ProgressService::new(
            fixed_clock(),
            Arc::new(UnavailableRepository::new()),
            ChangeFeed::new(),
        );
        assert!(matches!(
            unavailable.export().await,
            Err(ProgressServiceError::Storage(_))
        ));

        let repo = InMemoryRepository::new();
        repo.save("[1, 2, 3]").await.unwrap();
        assert!(matches!(
            service_over(repo).export().await,
            Err(ProgressServiceError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn export_of_empty_slot_is_defaults() {
        let service = service_over(InMemoryRepository::new());
        let exported = service.export().await.unwrap();
        assert_eq!(exported, codec::encode(&ProgressRecord::new(fixed_now())).unwrap());
    }

    #[tokio::test]
    async fn summary_reports_totals() {
        let service = service_over(InMemoryRepository::new());
        service.mark_topic_completed("a").await;
        service.mark_case_study_completed("b").await;
        let record = service.add_time_spent(75).await;

        let summary = service.summary(&record);
        assert_eq!(summary.total_completed, 2);
        assert_eq!(summary.hours, 1);
        assert_eq!(summary.minutes, 15);
        assert_eq!(summary.days_since_start, 0);
    }
}
