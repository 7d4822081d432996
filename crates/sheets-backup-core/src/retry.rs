//! Backoff policy shared by the Drive client and the bucket uploaders.

use std::time::{Duration, SystemTime};

/// Maximum retries for transient errors (429 / 5xx).
pub const MAX_RETRIES: u32 = 5;
/// Base delay for exponential backoff.
const BASE_DELAY_MS: u64 = 200;

/// Sleep with exponential backoff + jitter.
pub async fn backoff_sleep(attempt: u32) {
    tokio::time::sleep(backoff_delay(attempt)).await;
}

/// `200ms * 2^attempt` plus up to 50ms of jitter.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt) + rand_jitter())
}

/// Whether an HTTP status is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=504).contains(&status)
}

fn rand_jitter() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 % 50)
        .unwrap_or(0)
}
