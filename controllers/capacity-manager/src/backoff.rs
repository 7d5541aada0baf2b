//! Fibonacci requeue schedule.
//!
//! Failed reconciles are requeued on a fibonacci curve rather than a doubling
//! one: capacity frees up in bursts when jobs finish, so the early retries
//! stay close together while repeat offenders settle at the cap.
//! Sequence in seconds for consecutive errors: 5, 5, 10, 15, 25, 40, 65,
//! capped at 120.

use std::time::Duration;

const MIN_SECONDS: u64 = 5;
const MAX_SECONDS: u64 = 120;

/// Requeue delay for the nth consecutive error on the same key (0-indexed).
pub fn requeue_after(error_count: u32) -> Duration {
    if error_count <= 1 {
        return Duration::from_secs(MIN_SECONDS);
    }

    let mut prev = MIN_SECONDS;
    let mut current = MIN_SECONDS;
    for _ in 2..=error_count {
        let next = prev + current;
        prev = current;
        current = next.min(MAX_SECONDS);
        if current >= MAX_SECONDS {
            break;
        }
    }
    Duration::from_secs(current)
}
