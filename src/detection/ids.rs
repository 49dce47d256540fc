//! Collision-free detection id generation

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Per-producer id source.
///
/// Ids look like `tag_<unix-millis>_<seq>_<suffix>`. The sequence number is
/// monotonic per generator, so two ids from one generator never collide even
/// when they share a millisecond.
#[derive(Debug)]
pub struct IdGenerator {
    tag: String,
    seq: AtomicU64,
}

impl IdGenerator {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn next_id(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}_{}",
            self.tag,
            Utc::now().timestamp_millis(),
            seq,
            &suffix[..9]
        )
    }
}
