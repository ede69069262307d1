//! # blockarena-core
//!
//! Chained-block bump arenas for workloads that create many small,
//! short-lived objects and release them all at once.
//!
//! - [`UniformArena<T>`] packs values of one type at a fixed stride.
//! - [`HeterogeneousArena`] stores values of any type, each behind an
//!   [`ObjectHeader`] carrying a destructor trampoline for its type.
//!
//! Both grow by chaining fixed-capacity [`MemoryBlock`]s and release in bulk
//! through [`Arena::clear`]. References returned by `create` borrow the arena,
//! so they cannot outlive the next `clear()` or the arena itself. Arenas are
//! single-threaded.
#![warn(missing_docs)]
#![allow(unsafe_code)]

pub mod arena;
pub mod block;
mod chain;
pub mod config;
pub mod error;
pub mod header;
pub mod hetero;
pub mod stats;
pub mod uniform;

pub use arena::{Arena, ArenaCreate};
pub use block::MemoryBlock;
pub use config::{ArenaConfig, RetentionPolicy, DEFAULT_BLOCK_CAPACITY};
pub use error::ArenaError;
pub use header::{ObjectHeader, HEADER_STRIDE};
pub use hetero::HeterogeneousArena;
pub use stats::ArenaStats;
pub use uniform::UniformArena;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
