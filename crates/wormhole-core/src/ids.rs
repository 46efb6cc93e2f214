//! Command id generation
//!
//! A command id is the nanosecond wall-clock timestamp of its creation,
//! rendered as a decimal string. The timestamp doubles as the age source for
//! the expiry sweeper, so the id must stay parseable as an integer. A plain
//! wall-clock read is not collision-free under contention; the generator
//! bumps past the last issued value so ids are strictly increasing within
//! the process.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::time::current_time_nanos;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Generate the next command id.
///
/// Strictly greater than every id previously returned by this process, and
/// equal to the current nanosecond timestamp except under contention, where
/// it may run at most a few nanoseconds ahead.
pub fn next_id() -> String {
    let now = current_time_nanos();
    let mut prev = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST_ID.compare_exchange_weak(prev, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(observed) => prev = observed,
        }
    }
}

/// Recover the creation timestamp (nanoseconds since the Unix epoch) from a
/// command id. Returns `None` for ids that are not decimal integers.
pub fn creation_nanos(id: &str) -> Option<i64> {
    id.parse::<i64>().ok()
}
