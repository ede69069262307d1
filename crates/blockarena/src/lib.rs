//! blockarena library: scenario driver for the arena allocators.

pub mod app;
pub mod config;
pub mod errors;
pub mod presenter;
pub mod version;
