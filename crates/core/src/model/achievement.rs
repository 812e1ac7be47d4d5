use crate::model::ProgressRecord;

/// How many achievements readers are guaranteed to see.
pub const ACHIEVEMENT_WINDOW: usize = 10;

/// Aggregate thresholds that unlock a synthesized achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    FirstFive,
    FirstTen,
    QuarterCentury,
    TopicMaster,
    CaseStudyExpert,
    WeekStreak,
    FiveHours,
}

impl Milestone {
    /// Evaluation order, which is also the order of synthesized messages.
    pub const ALL: [Milestone; 7] = [
        Milestone::FirstFive,
        Milestone::FirstTen,
        Milestone::QuarterCentury,
        Milestone::TopicMaster,
        Milestone::CaseStudyExpert,
        Milestone::WeekStreak,
        Milestone::FiveHours,
    ];

    /// Stable identifier, independent of the display text.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Milestone::FirstFive => "first-5",
            Milestone::FirstTen => "first-10",
            Milestone::QuarterCentury => "quarter-century",
            Milestone::TopicMaster => "topic-master",
            Milestone::CaseStudyExpert => "case-study-expert",
            Milestone::WeekStreak => "week-streak",
            Milestone::FiveHours => "five-hours",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Milestone::FirstFive => "Milestone: completed your first 5 items",
            Milestone::FirstTen => "Milestone: completed your first 10 items",
            Milestone::QuarterCentury => "Milestone: a quarter century of 25 items completed",
            Milestone::TopicMaster => "Topic master: 10 topics completed",
            Milestone::CaseStudyExpert => "Case study expert: 5 case studies completed",
            Milestone::WeekStreak => "Week streak: 7 days of learning in a row",
            Milestone::FiveHours => "Dedicated learner: 5 hours of study",
        }
    }

    #[must_use]
    pub fn is_reached(self, record: &ProgressRecord) -> bool {
        let total = record.total_completed();
        match self {
            Milestone::FirstFive => total >= 5,
            Milestone::FirstTen => total >= 10,
            Milestone::QuarterCentury => total >= 25,
            Milestone::TopicMaster => record.completed_topics().len() >= 10,
            Milestone::CaseStudyExpert => record.completed_case_studies().len() >= 5,
            Milestone::WeekStreak => record.current_streak() >= 7,
            Milestone::FiveHours => record.time_spent() >= 300,
        }
    }

    /// Recognize a logged entry that already announces this milestone.
    #[must_use]
    pub fn from_message(message: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.message() == message)
    }
}

/// Milestones whose thresholds the record currently meets.
#[must_use]
pub fn reached_milestones(record: &ProgressRecord) -> Vec<Milestone> {
    Milestone::ALL
        .into_iter()
        .filter(|m| m.is_reached(record))
        .collect()
}

/// The logged achievements followed by any reached milestone not yet logged,
/// trimmed to the most recent [`ACHIEVEMENT_WINDOW`] entries.
#[must_use]
pub fn achievements(record: &ProgressRecord) -> Vec<String> {
    let logged = record.achievements();
    let mut all = logged.to_vec();
    for milestone in reached_milestones(record) {
        let already_logged = logged
            .iter()
            .any(|entry| Milestone::from_message(entry) == Some(milestone));
        if !already_logged {
            all.push(milestone.message().to_owned());
        }
    }
    let skip = all.len().saturating_sub(ACHIEVEMENT_WINDOW);
    all.split_off(skip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemKind, ProgressDraft};
    use crate::time::{fixed_clock, fixed_now};

    fn with_topics(n: usize) -> ProgressRecord {
        let clock = fixed_clock();
        let mut record = ProgressRecord::new(clock.now());
        for i in 0..n {
            record.complete(ItemKind::Topic, &format!("topic-{i}"), &clock);
        }
        record
    }

    #[test]
    fn fresh_record_has_no_achievements() {
        assert!(achievements(&ProgressRecord::new(fixed_now())).is_empty());
    }

    #[test]
    fn five_items_unlock_first_five() {
        let record = with_topics(5);
        let list = achievements(&record);
        assert!(list.contains(&Milestone::FirstFive.message().to_string()));
        assert!(!list.contains(&Milestone::FirstTen.message().to_string()));
    }

    #[test]
    fn window_keeps_most_recent_ten() {
        let record = with_topics(12);
        let list = achievements(&record);
        assert_eq!(list.len(), ACHIEVEMENT_WINDOW);
        // 12 completions + first-5, first-10 and topic-master = 15 entries.
        assert_eq!(list[0], "Completed topic: topic 5");
        assert_eq!(list.last().unwrap(), Milestone::TopicMaster.message());
    }

    #[test]
    fn milestone_already_logged_is_not_repeated() {
        let mut draft = ProgressDraft::new();
        draft.time_spent = 400;
        draft.achievements = vec![Milestone::FiveHours.message().to_string()];
        let record = draft.into_record(fixed_now());

        let list = achievements(&record);
        assert_eq!(list, vec![Milestone::FiveHours.message().to_string()]);
    }

    #[test]
    fn independent_thresholds_can_all_fire() {
        let mut draft = ProgressDraft::new();
        draft.completed_topics = (0..20).map(|i| format!("t{i}")).collect();
        draft.completed_case_studies = (0..5).map(|i| format!("c{i}")).collect();
        draft.current_streak = 7;
        draft.time_spent = 300;
        let record = draft.into_record(fixed_now());

        assert_eq!(reached_milestones(&record), Milestone::ALL.to_vec());
        assert_eq!(achievements(&record).len(), Milestone::ALL.len());
    }

    #[test]
    fn ids_are_stable_and_unique() {
        let mut ids: Vec<&str> = Milestone::ALL.iter().map(|m| m.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), Milestone::ALL.len());
        for milestone in Milestone::ALL {
            assert_eq!(Milestone::from_message(milestone.message()), Some(milestone));
        }
    }
}
