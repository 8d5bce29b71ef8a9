//! Size and queue limits for published events.
//!
//! `MAX_MESSAGE_SIZE` is part of the wire contract with existing subscribers
//! and is not configurable. The queue capacity only affects how many framed
//! messages may wait for the publish worker.

use serde::Deserialize;

/// Upper bound on event text length in bytes. Text must be strictly shorter.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Default number of framed messages that may wait for the publish worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Resource limits for the publish path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Publish queue capacity.
    ///
    /// Default: 1,024. When the queue is full, `announce` fails with a send
    /// error instead of blocking the caller.
    pub queue_capacity: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ResourceLimits {
    /// Maximum event text length, exclusive.
    pub fn max_message_size(&self) -> usize {
        MAX_MESSAGE_SIZE
    }

    /// Queue capacity clamped to at least one slot.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}
