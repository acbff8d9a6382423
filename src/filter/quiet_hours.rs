//! Quiet-hours window.
//!
//! Two times of day bound the quiet period. When `quiet_before <= quiet_after`
//! the window wraps midnight: it is quiet before `quiet_before` in the morning
//! and after `quiet_after` in the evening. Otherwise it is quiet strictly
//! between `quiet_after` and `quiet_before`.

use chrono::{NaiveTime, Timelike};

/// Time-of-day window during which nothing is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub quiet_before: NaiveTime,
    pub quiet_after: NaiveTime,
}

impl QuietHours {
    pub fn new(quiet_before: NaiveTime, quiet_after: NaiveTime) -> Self {
        Self {
            quiet_before: truncate_to_minute(quiet_before),
            quiet_after: truncate_to_minute(quiet_after),
        }
    }

    /// Parse `"HH:MM"` bounds.
    pub fn parse(quiet_before: &str, quiet_after: &str) -> Result<Self, chrono::ParseError> {
        let before = NaiveTime::parse_from_str(quiet_before.trim(), "%H:%M")?;
        let after = NaiveTime::parse_from_str(quiet_after.trim(), "%H:%M")?;
        Ok(Self::new(before, after))
    }

    /// Whether `now` falls inside the window. Compared at minute resolution.
    pub fn contains(&self, now: NaiveTime) -> bool {
        let now = truncate_to_minute(now);
        if self.quiet_before > self.quiet_after {
            now > self.quiet_after && now < self.quiet_before
        } else {
            now < self.quiet_before || now > self.quiet_after
        }
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}
