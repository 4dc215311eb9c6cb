use chrono::{DateTime, Duration, Utc};

/// Whole seconds from `start` to `end`, never negative, saturating at `i32::MAX`.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    let secs = (end - start).num_seconds().max(0);
    i32::try_from(secs).unwrap_or(i32::MAX)
}

/// Seconds left before `started_at + limit_minutes`, `None` when there is no limit.
pub fn remaining_seconds(
    started_at: DateTime<Utc>,
    limit_minutes: Option<i32>,
    now: DateTime<Utc>,
) -> Option<i64> {
    let limit = limit_minutes?;
    let deadline = started_at + Duration::minutes(i64::from(limit));
    Some((deadline - now).num_seconds().max(0))
}
