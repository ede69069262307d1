//! Version information.

/// Get the version string.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get the full version string with the core library version.
#[must_use]
pub fn full_version() -> String {
    format!("blockarena {} (core {})", version(), core_version())
}

fn core_version() -> &'static str {
    blockarena_core::VERSION
}
