//! Timestamp and id utilities

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way poem records store it
///
/// RFC 3339, UTC, millisecond precision, `Z` suffix
/// (e.g. `2024-01-01T00:00:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted as a record timestamp
pub fn timestamp_now() -> String {
    format_timestamp(now())
}

/// Parse a stored record timestamp
///
/// Accepts any RFC 3339 string, with or without fractional seconds.
/// Returns `None` for anything else rather than failing: a record with a
/// garbled timestamp is still displayable.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Monotonic record id source
///
/// Ids are wall-clock milliseconds since the Unix epoch. Two ids issued
/// within the same millisecond (or after the clock steps backwards) are
/// bumped past the previous one so the sequence never repeats.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the generator so it never issues an id at or below `floor`
    pub fn observe(&mut self, floor: i64) {
        self.last = self.last.max(floor);
    }

    /// Issue the next id
    ///
    /// Fails once an observed id leaves no larger `i64` to hand out.
    pub fn next_id(&mut self) -> Result<String> {
        self.next_at(now())
    }

    fn next_at(&mut self, at: DateTime<Utc>) -> Result<String> {
        let candidate = at.timestamp_millis();
        let id = if candidate > self.last {
            candidate
        } else {
            self.last.checked_add(1).ok_or_else(|| {
                Error::InvalidInput(format!("no record id above {} is available", self.last))
            })?
        };
        self.last = id;
        Ok(id.to_string())
    }
}
