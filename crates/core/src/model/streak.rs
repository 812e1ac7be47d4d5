use chrono::NaiveDate;

/// Outcome of evaluating the daily streak for one piece of activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// Activity already happened today.
    Unchanged,
    /// The previous activity was yesterday.
    Extended,
    /// First activity ever, or the streak was broken by a gap.
    Restarted,
}

impl StreakUpdate {
    /// Compare the last active calendar day with today.
    ///
    /// A last-active date later than today (clock skew between views) counts
    /// as today.
    #[must_use]
    pub fn evaluate(last_active: Option<NaiveDate>, today: NaiveDate) -> Self {
        match last_active {
            None => Self::Restarted,
            Some(last) if last >= today => Self::Unchanged,
            Some(last) if today.pred_opt() == Some(last) => Self::Extended,
            Some(_) => Self::Restarted,
        }
    }

    /// Streak value after this update.
    #[must_use]
    pub fn apply(self, current: u32) -> u32 {
        match self {
            Self::Unchanged => current,
            Self::Extended => current.saturating_add(1),
            Self::Restarted => 1,
        }
    }

    /// Whether `lastActiveDate` should move to now.
    #[must_use]
    pub fn touches_last_active(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}
