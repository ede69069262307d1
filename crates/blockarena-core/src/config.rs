//! Arena configuration.

use serde::{Deserialize, Serialize};

/// Default block capacity in bytes.
pub const DEFAULT_BLOCK_CAPACITY: usize = 2048;

/// What `clear()` does with the original (oldest) block of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetentionPolicy {
    /// Keep the original block with its cursor reset, so the next `create`
    /// does not go back to the system allocator.
    #[default]
    RetainOriginal,
    /// Return every block to the system allocator.
    ReleaseAll,
}

/// Configuration shared by both arena kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Usable bytes per block. Bounds the largest object an arena accepts.
    pub block_capacity: usize,
    /// Block retention on `clear()`.
    pub retention: RetentionPolicy,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            retention: RetentionPolicy::RetainOriginal,
        }
    }
}

impl ArenaConfig {
    /// Config with the given block capacity and the default retention.
    #[must_use]
    pub fn with_capacity(block_capacity: usize) -> Self {
        Self {
            block_capacity,
            ..Self::default()
        }
    }

    /// Set the retention policy.
    #[must_use]
    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Normalize the config, applying defaults where values are zero.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.block_capacity == 0 {
            self.block_capacity = DEFAULT_BLOCK_CAPACITY;
        }
        self
    }

    /// Whether `clear()` keeps the original block.
    #[must_use]
    pub fn retains_original(&self) -> bool {
        self.retention == RetentionPolicy::RetainOriginal
    }
}
