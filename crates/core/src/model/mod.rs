mod achievement;
mod progress;
mod stats;
mod streak;

pub use achievement::{ACHIEVEMENT_WINDOW, Milestone, achievements, reached_milestones};
pub use progress::{ItemKind, ProgressDraft, ProgressRecord};
pub use stats::{LearningPath, LearningPathError, PathProgress, ProgressSummary, percent_complete};
pub use streak::StreakUpdate;
