//! Correlation ids for reflected calls and unique bridge names.
//!
//! Ids combine a millisecond timestamp, a per-generator counter and a random
//! alphanumeric suffix. The counter makes ids from one generator unique even
//! within the same millisecond; the suffix keeps independent generators from
//! colliding. Only characters valid in host event names are produced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 8;

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// Thread-safe correlation id generator.
#[derive(Debug, Clone, Default)]
pub struct CorrelationIdGenerator {
    counter: Arc<AtomicU64>,
}

impl CorrelationIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next id, formatted `{millis}-{counter}-{suffix}`.
    pub fn next_id(&self) -> String {
        let counter = self.counter.fetch_add(1, Ordering::SeqCst);
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            counter,
            random_suffix()
        )
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Derive a bridge name that will not collide with other live bridges of the
/// same logical kind, e.g. `loaded-extensions-1718000000000-Ab3dE9xQ`.
pub fn unique_bridge_name(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        random_suffix()
    )
}
