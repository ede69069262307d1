//! Application configuration from CLI flags and environment.

use blockarena_core::{ArenaConfig, RetentionPolicy, DEFAULT_BLOCK_CAPACITY};
use clap::{Parser, ValueEnum};

/// Demo workload to run against the arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Create 1, 2, 5 in a uniform arena and overwrite the third with the sum.
    Sum,
    /// Track live instances of a counted type across clear.
    Counted,
    /// Mix types with destructors and plain values in one arena.
    Mixed,
    /// Fill both arenas with `--count` objects and clear them.
    Stress,
}

impl Scenario {
    /// Lowercase name as accepted on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Counted => "counted",
            Self::Mixed => "mixed",
            Self::Stress => "stress",
        }
    }
}

/// blockarena: chained-block arena allocator driver.
#[derive(Parser, Debug)]
#[command(name = "blockarena", version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    /// Block capacity in bytes (0 selects the default).
    #[arg(long, default_value_t = DEFAULT_BLOCK_CAPACITY, env = "BLOCKARENA_BLOCK_SIZE")]
    pub block_size: usize,

    /// Release every block on clear instead of keeping the first one.
    #[arg(long)]
    pub release_all: bool,

    /// Scenario to run.
    #[arg(long, value_enum, default_value_t = Scenario::Sum)]
    pub scenario: Scenario,

    /// Number of objects created by the stress scenario.
    #[arg(long, default_value = "10000", env = "BLOCKARENA_COUNT")]
    pub count: usize,

    /// Print the arena statistics as JSON.
    #[arg(long)]
    pub json: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (only scenario results).
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate shell completion.
    #[arg(long, value_enum)]
    pub completion: Option<clap_complete::Shell>,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Arena configuration selected by the flags.
    #[must_use]
    pub fn arena_config(&self) -> ArenaConfig {
        let retention = if self.release_all {
            RetentionPolicy::ReleaseAll
        } else {
            RetentionPolicy::RetainOriginal
        };
        ArenaConfig::with_capacity(self.block_size)
            .retention(retention)
            .normalize()
    }
}
