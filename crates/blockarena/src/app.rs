//! Application entry point and scenario dispatch.

use std::cell::Cell;
use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use blockarena_core::{ArenaConfig, ArenaStats, HeterogeneousArena, UniformArena};

use crate::config::{AppConfig, Scenario};
use crate::presenter::CliPresenter;

/// What one arena looked like over a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ArenaSummary {
    /// `uniform` or `heterogeneous`.
    pub kind: &'static str,
    /// Blocks chained just before the final clear.
    pub peak_blocks: usize,
    /// Bytes reserved just before the final clear.
    pub peak_bytes: usize,
    /// Blocks still held after the final clear.
    pub blocks_after_clear: usize,
    /// Lifetime counters.
    pub stats: ArenaStats,
}

impl ArenaSummary {
    fn uniform<T>(arena: &UniformArena<T>, peak_blocks: usize, peak_bytes: usize) -> Self {
        Self {
            kind: "uniform",
            peak_blocks,
            peak_bytes,
            blocks_after_clear: arena.block_count(),
            stats: arena.stats(),
        }
    }

    fn hetero(arena: &HeterogeneousArena<'_>, peak_blocks: usize, peak_bytes: usize) -> Self {
        Self {
            kind: "heterogeneous",
            peak_blocks,
            peak_bytes,
            blocks_after_clear: arena.block_count(),
            stats: arena.stats(),
        }
    }
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: &'static str,
    /// Block capacity the arenas ran with.
    pub block_capacity: usize,
    /// Human-readable result lines.
    pub lines: Vec<String>,
    /// Per-arena summaries.
    pub arenas: Vec<ArenaSummary>,
    /// Wall time of the scenario.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    if let Some(shell) = config.completion {
        let mut cmd = <AppConfig as clap::CommandFactory>::command();
        clap_complete::generate(shell, &mut cmd, "blockarena", &mut io::stdout());
        return Ok(());
    }

    let report = run_scenario(config.scenario, config.arena_config(), config.count)?;
    tracing::info!(
        scenario = report.scenario,
        elapsed_us = u64::try_from(report.elapsed.as_micros()).unwrap_or(u64::MAX),
        "scenario finished"
    );

    let presenter = CliPresenter::new(config.verbose, config.quiet, config.json);
    presenter.present(&report, &mut io::stdout().lock())?;
    Ok(())
}

/// Run one scenario against freshly configured arenas.
pub fn run_scenario(scenario: Scenario, arena: ArenaConfig, count: usize) -> Result<ScenarioReport> {
    let start = Instant::now();
    let (lines, arenas) = match scenario {
        Scenario::Sum => run_sum(arena)?,
        Scenario::Counted => run_counted(arena)?,
        Scenario::Mixed => run_mixed(arena)?,
        Scenario::Stress => run_stress(arena, count)?,
    };
    Ok(ScenarioReport {
        scenario: scenario.name(),
        block_capacity: arena.normalize().block_capacity,
        lines,
        arenas,
        elapsed: start.elapsed(),
    })
}

type Outcome = (Vec<String>, Vec<ArenaSummary>);

fn run_sum(config: ArenaConfig) -> Result<Outcome> {
    let mut arena = UniformArena::<i32>::with_config(config);
    let a = arena.create(1)?;
    let b = arena.create(2)?;
    let c = arena.create(5)?;
    *c = *a + *b;
    let lines = vec![format!("{a} + {b} = {c}")];

    let (blocks, bytes) = (arena.block_count(), arena.allocated_bytes());
    arena.clear();
    Ok((lines, vec![ArenaSummary::uniform(&arena, blocks, bytes)]))
}

/// Instance that tracks how many of its kind are alive.
struct Counted<'a> {
    live: &'a Cell<usize>,
}

impl<'a> Counted<'a> {
    fn new(live: &'a Cell<usize>) -> Self {
        live.set(live.get() + 1);
        Self { live }
    }
}

impl Drop for Counted<'_> {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

fn run_counted(config: ArenaConfig) -> Result<Outcome> {
    let live = Cell::new(0);
    let mut arena = UniformArena::with_config(config);
    arena.create(Counted::new(&live))?;
    arena.create_with(|| Counted::new(&live))?;
    let mut lines = vec![format!("live after create: {}", live.get())];

    let (blocks, bytes) = (arena.block_count(), arena.allocated_bytes());
    arena.clear();
    lines.push(format!("live after clear: {}", live.get()));
    Ok((lines, vec![ArenaSummary::uniform(&arena, blocks, bytes)]))
}

/// Object with an id drawn from a shared counter; dropping it gives the id back.
struct Tagged<'a> {
    id: u32,
    counter: &'a Cell<u32>,
}

impl<'a> Tagged<'a> {
    fn new(counter: &'a Cell<u32>) -> Self {
        let id = counter.get() + 1;
        counter.set(id);
        Self { id, counter }
    }
}

impl Drop for Tagged<'_> {
    fn drop(&mut self) {
        self.counter.set(self.counter.get() - 1);
    }
}

fn run_mixed(config: ArenaConfig) -> Result<Outcome> {
    let counter = Cell::new(0);
    let mut arena = HeterogeneousArena::with_config(config);
    let first = arena.create(Tagged::new(&counter))?;
    let value = arena.create(213_123_i32)?;
    let second = arena.create(Tagged::new(&counter))?;
    let mut lines = vec![
        format!("tagged #{}", first.id),
        format!("i32 {value}"),
        format!("tagged #{}", second.id),
    ];

    let (blocks, bytes) = (arena.block_count(), arena.allocated_bytes());
    arena.clear();
    lines.push(format!("counter after clear: {}", counter.get()));
    Ok((lines, vec![ArenaSummary::hetero(&arena, blocks, bytes)]))
}

fn run_stress(config: ArenaConfig, count: usize) -> Result<Outcome> {
    let mut uniform = UniformArena::<u64>::with_config(config);
    let mut total = 0u64;
    for i in 0..count as u64 {
        total = total.wrapping_add(*uniform.create(i)?);
    }
    let (u_blocks, u_bytes) = (uniform.block_count(), uniform.allocated_bytes());
    uniform.clear();

    let mut hetero = HeterogeneousArena::with_config(config);
    let mut text_bytes = 0usize;
    for i in 0..count {
        if i % 2 == 0 {
            hetero.create(i as u64)?;
        } else {
            text_bytes += hetero.create(i.to_string())?.len();
        }
    }
    let (h_blocks, h_bytes) = (hetero.block_count(), hetero.allocated_bytes());
    hetero.clear();

    let lines = vec![
        format!("uniform: {count} objects in {u_blocks} blocks, sum {total}"),
        format!("heterogeneous: {count} objects in {h_blocks} blocks, {text_bytes} text bytes"),
    ];
    Ok((
        lines,
        vec![
            ArenaSummary::uniform(&uniform, u_blocks, u_bytes),
            ArenaSummary::hetero(&hetero, h_blocks, h_bytes),
        ],
    ))
}
