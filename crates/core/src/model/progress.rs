use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::StreakUpdate;
use crate::time::Clock;

/// Kind of content item a learner can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Topic,
    CaseStudy,
}

impl ItemKind {
    /// Achievement message logged when an item of this kind is completed.
    #[must_use]
    pub fn completion_message(self, id: &str) -> String {
        let label = id.replace('-', " ");
        match self {
            ItemKind::Topic => format!("Completed topic: {label}"),
            ItemKind::CaseStudy => format!("Completed case study: {label}"),
        }
    }
}

/// The learner's persisted progress.
///
/// Serializes to the camelCase JSON object stored in the progress slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    completed_topics: Vec<String>,
    completed_case_studies: Vec<String>,
    time_spent: u64,
    current_streak: u32,
    #[serde(serialize_with = "serialize_last_active")]
    last_active_date: Option<DateTime<Utc>>,
    achievements: Vec<String>,
    start_date: DateTime<Utc>,
}

/// Loose field bag used to rebuild a record from storage or fixtures.
#[derive(Debug, Clone, Default)]
pub struct ProgressDraft {
    pub completed_topics: Vec<String>,
    pub completed_case_studies: Vec<String>,
    pub time_spent: u64,
    pub current_streak: u32,
    pub last_active_date: Option<DateTime<Utc>>,
    pub achievements: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
}

impl ProgressDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize into a record. Duplicate IDs keep their first occurrence;
    /// a missing start date falls back to `started_at`.
    #[must_use]
    pub fn into_record(self, started_at: DateTime<Utc>) -> ProgressRecord {
        ProgressRecord {
            completed_topics: dedup_preserving_order(self.completed_topics),
            completed_case_studies: dedup_preserving_order(self.completed_case_studies),
            time_spent: self.time_spent,
            current_streak: self.current_streak,
            last_active_date: self.last_active_date,
            achievements: self.achievements,
            start_date: self.start_date.unwrap_or(started_at),
        }
    }
}

impl ProgressRecord {
    /// Fresh record: nothing completed, zero counters, never active.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        ProgressDraft::new().into_record(started_at)
    }

    #[must_use]
    pub fn completed_topics(&self) -> &[String] {
        &self.completed_topics
    }

    #[must_use]
    pub fn completed_case_studies(&self) -> &[String] {
        &self.completed_case_studies
    }

    /// Cumulative study time in minutes.
    #[must_use]
    pub fn time_spent(&self) -> u64 {
        self.time_spent
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    #[must_use]
    pub fn last_active_date(&self) -> Option<DateTime<Utc>> {
        self.last_active_date
    }

    /// Raw achievement log, oldest first.
    #[must_use]
    pub fn achievements(&self) -> &[String] {
        &self.achievements
    }

    #[must_use]
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    #[must_use]
    pub fn completed(&self, kind: ItemKind) -> &[String] {
        match kind {
            ItemKind::Topic => &self.completed_topics,
            ItemKind::CaseStudy => &self.completed_case_studies,
        }
    }

    #[must_use]
    pub fn is_completed(&self, kind: ItemKind, id: &str) -> bool {
        self.completed(kind).iter().any(|done| done == id)
    }

    #[must_use]
    pub fn is_topic_completed(&self, id: &str) -> bool {
        self.is_completed(ItemKind::Topic, id)
    }

    #[must_use]
    pub fn is_case_study_completed(&self, id: &str) -> bool {
        self.is_completed(ItemKind::CaseStudy, id)
    }

    /// Topics plus case studies.
    #[must_use]
    pub fn total_completed(&self) -> usize {
        self.completed_topics.len() + self.completed_case_studies.len()
    }

    /// Mark an item complete, log the completion and count the day's activity.
    ///
    /// Returns `false` and leaves the record untouched if the item was
    /// already complete.
    pub fn complete(&mut self, kind: ItemKind, id: &str, clock: &Clock) -> bool {
        if self.is_completed(kind, id) {
            return false;
        }
        let list = match kind {
            ItemKind::Topic => &mut self.completed_topics,
            ItemKind::CaseStudy => &mut self.completed_case_studies,
        };
        list.push(id.to_owned());
        self.achievements.push(kind.completion_message(id));
        self.record_activity(clock);
        true
    }

    /// Accrue study time. Always counts as activity, even for zero minutes.
    pub fn add_time_spent(&mut self, minutes: u32, clock: &Clock) {
        self.time_spent = self.time_spent.saturating_add(u64::from(minutes));
        self.record_activity(clock);
    }

    /// Apply the calendar-day streak rule for activity happening now.
    pub fn record_activity(&mut self, clock: &Clock) -> StreakUpdate {
        let last_day = self.last_active_date.map(|ts| clock.calendar_date(ts));
        let update = StreakUpdate::evaluate(last_day, clock.today());
        self.current_streak = update.apply(self.current_streak);
        if update.touches_last_active() {
            self.last_active_date = Some(clock.now());
        }
        update
    }
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

fn serialize_last_active<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
        None => serializer.serialize_str(""),
    }
}
