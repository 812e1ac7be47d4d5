use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{ProgressRecord, achievements};

/// Rounded completion percentage, `round(100 * completed / total)`.
///
/// A zero total yields 0 and the result never exceeds 100.
#[must_use]
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    // Integer round-half-up.
    let pct = (200 * completed + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearningPathError {
    #[error("learning path name cannot be empty")]
    EmptyName,
}

/// A named, externally curated subset of topics and case studies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningPath {
    name: String,
    topics: Vec<String>,
    case_studies: Vec<String>,
}

impl LearningPath {
    /// # Errors
    ///
    /// Returns `LearningPathError::EmptyName` if the name is blank.
    pub fn new(
        name: impl Into<String>,
        topics: Vec<String>,
        case_studies: Vec<String>,
    ) -> Result<Self, LearningPathError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(LearningPathError::EmptyName);
        }
        Ok(Self {
            name,
            topics,
            case_studies,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn case_studies(&self) -> &[String] {
        &self.case_studies
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len() + self.case_studies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl ProgressRecord {
    /// `percent_complete` over topics plus case studies.
    #[must_use]
    pub fn overall_progress(&self, total: usize) -> u8 {
        percent_complete(self.total_completed(), total)
    }

    #[must_use]
    pub fn topics_progress(&self, total_topics: usize) -> u8 {
        percent_complete(self.completed_topics().len(), total_topics)
    }

    #[must_use]
    pub fn case_studies_progress(&self, total_case_studies: usize) -> u8 {
        percent_complete(self.completed_case_studies().len(), total_case_studies)
    }

    /// Count the path's items this learner has completed.
    #[must_use]
    pub fn path_progress(&self, path: &LearningPath) -> PathProgress {
        let topics = path
            .topics()
            .iter()
            .filter(|id| self.is_topic_completed(id))
            .count();
        let case_studies = path
            .case_studies()
            .iter()
            .filter(|id| self.is_case_study_completed(id))
            .count();
        let completed = topics + case_studies;
        PathProgress {
            completed,
            total: path.len(),
            percent: percent_complete(completed, path.len()),
        }
    }
}

/// Display-ready snapshot of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub topics_completed: usize,
    pub case_studies_completed: usize,
    pub total_completed: usize,
    pub hours: u64,
    pub minutes: u64,
    pub current_streak: u32,
    pub days_since_start: i64,
    pub achievements: Vec<String>,
}

impl ProgressSummary {
    #[must_use]
    pub fn from_record(record: &ProgressRecord, start_day: NaiveDate, today: NaiveDate) -> Self {
        Self {
            topics_completed: record.completed_topics().len(),
            case_studies_completed: record.completed_case_studies().len(),
            total_completed: record.total_completed(),
            hours: record.time_spent() / 60,
            minutes: record.time_spent() % 60,
            current_streak: record.current_streak(),
            days_since_start: (today - start_day).num_days().max(0),
            achievements: achievements(record),
        }
    }
}
