//! Error handling and exit codes.

use blockarena_core::ArenaError;

/// Process exit codes.
pub mod exit_codes {
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// The system allocator refused a block.
    pub const ERROR_OUT_OF_MEMORY: i32 = 3;
    /// Invalid configuration: bad block size or an object that can never fit.
    pub const ERROR_CONFIG: i32 = 4;
}

/// Map an arena error to its exit code.
pub fn handle_error(err: &ArenaError) -> i32 {
    match err {
        ArenaError::ObjectTooLarge { .. } | ArenaError::InvalidCapacity { .. } => {
            exit_codes::ERROR_CONFIG
        }
        ArenaError::OutOfMemory { .. } => exit_codes::ERROR_OUT_OF_MEMORY,
    }
}

/// Exit code for any error surfacing from [`crate::app::run`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ArenaError>()
        .map_or(exit_codes::ERROR_GENERIC, handle_error)
}
