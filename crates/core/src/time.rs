use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
///
/// Besides the current instant, a clock knows which UTC offset counts as
/// "local" so that calendar-day comparisons (streaks) do not depend on the
/// machine running the tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<FixedOffset>),
}

impl Clock {
    /// Returns a clock that uses the current system time and local offset.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp, with UTC as local time.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at.fixed_offset())
    }

    /// Returns a clock fixed at the given timestamp, observed from `offset`.
    #[must_use]
    pub fn fixed_in(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::Fixed(at.with_timezone(&offset))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => t.with_timezone(&Utc),
        }
    }

    /// Local calendar date of `ts` as seen by this clock.
    #[must_use]
    pub fn calendar_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            Clock::Default => ts.with_timezone(&Local).date_naive(),
            Clock::Fixed(t) => ts.with_timezone(t.offset()).date_naive(),
        }
    }

    /// Today's local calendar date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.calendar_date(self.now())
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
