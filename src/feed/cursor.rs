//! Per-feed recency watermark

use chrono::{DateTime, Duration, Utc};

/// Oldest publish time still eligible for a feed's next poll
///
/// Only entries published strictly after `filter_date` pass. The watermark
/// never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    filter_date: DateTime<Utc>,
}

impl FeedCursor {
    /// Starts the window `backdate` before `now`
    ///
    /// A window reaching past the earliest representable time starts there.
    pub fn new(now: DateTime<Utc>, backdate: Duration) -> Self {
        Self {
            filter_date: now
                .checked_sub_signed(backdate)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Starts the window at an explicit timestamp
    pub fn starting_at(filter_date: DateTime<Utc>) -> Self {
        Self { filter_date }
    }

    pub fn filter_date(&self) -> DateTime<Utc> {
        self.filter_date
    }

    /// Whether an entry with this publish time is recent enough
    ///
    /// Entries without a publish time are never admitted.
    pub fn admits(&self, published_at: Option<DateTime<Utc>>) -> bool {
        matches!(published_at, Some(published) if published > self.filter_date)
    }

    /// Moves the watermark forward to `now`; earlier values are ignored
    pub fn advance_to(&mut self, now: DateTime<Utc>) {
        if now > self.filter_date {
            self.filter_date = now;
        }
    }
}
