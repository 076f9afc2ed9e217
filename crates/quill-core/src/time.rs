use std::time::Duration;
use time::OffsetDateTime;

/// Current wall-clock time as unix milliseconds.
pub fn unix_now_millis() -> i64 {
    to_unix_millis(OffsetDateTime::now_utc())
}

/// Absolute expiry, in unix milliseconds, for an entry written now with `ttl`.
///
/// Returns `None` when the expiry falls outside the representable date range.
pub fn expiry_after(ttl: Duration) -> Option<i64> {
    expiry_from(OffsetDateTime::now_utc(), ttl)
}

/// Expiry for an entry written at `now`.
///
/// Truncates to whole milliseconds. Readers compare `expiry > unix_now_millis()`,
/// so an entry is never visible past `now + ttl`.
pub fn expiry_from(now: OffsetDateTime, ttl: Duration) -> Option<i64> {
    let ttl = time::Duration::try_from(ttl).ok()?;
    now.checked_add(ttl).map(to_unix_millis)
}

fn to_unix_millis(at: OffsetDateTime) -> i64 {
    // Years -9999..=9999 stay far inside i64 milliseconds.
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}
