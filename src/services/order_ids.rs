use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues `<prefix><epoch millis>` order ids.
///
/// Ids are strictly increasing within a process: when two requests land in
/// the same millisecond (or the clock steps backwards) the later one gets
/// `last + 1` instead of a duplicate.
#[derive(Debug)]
pub struct OrderIdGenerator {
    prefix: String,
    last: AtomicU64,
}

impl OrderIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_id_at(now)
    }

    /// Same as [`next_id`](Self::next_id) with an explicit clock reading.
    pub fn next_id_at(&self, now_millis: u64) -> String {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now_millis.max(last.saturating_add(1));
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return format!("{}{}", self.prefix, candidate),
                Err(actual) => last = actual,
            }
        }
    }
}
