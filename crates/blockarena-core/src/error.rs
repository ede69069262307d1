//! Arena error types.

/// Errors returned by arena construction and object creation.
///
/// A failed `create` never mutates the arena: either the object is fully
/// constructed and the cursor advanced, or nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The object's footprint exceeds the configured block capacity.
    #[error("object needs {required} bytes but blocks hold {capacity} bytes")]
    ObjectTooLarge {
        /// Bytes the object (and its header, if any) would occupy.
        required: usize,
        /// Configured block capacity.
        capacity: usize,
    },

    /// The system allocator could not provide a new block.
    #[error("out of memory allocating a {requested}-byte block")]
    OutOfMemory {
        /// Size of the block that was requested.
        requested: usize,
    },

    /// The block capacity cannot describe a valid allocation.
    #[error("invalid block capacity: {capacity} bytes")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },
}

impl ArenaError {
    /// Whether this error reflects a configuration mistake rather than a
    /// runtime resource shortage.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ObjectTooLarge { .. } | Self::InvalidCapacity { .. })
    }
}
