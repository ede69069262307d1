//! Scenario report presentation for the CLI.

use std::io::{self, Write};
use std::time::Duration;

use crate::app::{ArenaSummary, ScenarioReport};
use crate::version::full_version;

/// Writes scenario reports as text or JSON.
pub struct CliPresenter {
    verbose: bool,
    quiet: bool,
    json: bool,
}

impl CliPresenter {
    /// Create a new presenter.
    #[must_use]
    pub fn new(verbose: bool, quiet: bool, json: bool) -> Self {
        Self {
            verbose,
            quiet,
            json,
        }
    }

    /// Write `report` to `out`.
    pub fn present(&self, report: &ScenarioReport, out: &mut impl Write) -> io::Result<()> {
        if self.json {
            serde_json::to_writer_pretty(&mut *out, report)?;
            return writeln!(out);
        }

        if self.verbose {
            writeln!(out, "{}", full_version())?;
            writeln!(
                out,
                "Scenario: {} (block capacity {} bytes)",
                report.scenario,
                format_number(report.block_capacity as u64)
            )?;
        }

        for line in &report.lines {
            writeln!(out, "{line}")?;
        }
        if self.quiet {
            return Ok(());
        }

        for arena in &report.arenas {
            self.present_arena(arena, out)?;
        }
        if self.verbose {
            writeln!(out, "Elapsed: {}", format_duration(report.elapsed))?;
        }
        Ok(())
    }

    fn present_arena(&self, arena: &ArenaSummary, out: &mut impl Write) -> io::Result<()> {
        let stats = &arena.stats;
        writeln!(
            out,
            "{} arena: {} objects in {} block(s), {} block(s) kept after clear",
            arena.kind,
            format_number(stats.objects_created),
            arena.peak_blocks,
            arena.blocks_after_clear
        )?;
        if self.verbose {
            writeln!(
                out,
                "  reserved {} bytes, {} destroyed, {} blocks allocated, {} released, {} clear(s)",
                format_number(arena.peak_bytes as u64),
                format_number(stats.objects_destroyed),
                stats.blocks_allocated,
                stats.blocks_released,
                stats.clears
            )?;
        }
        Ok(())
    }
}

/// Format a duration for display.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 0.001 {
        format!("{:.2}µs", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.2}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.3}s")
    } else {
        let mins = (secs / 60.0).floor() as u64;
        let remaining = secs - (mins as f64 * 60.0);
        format!("{mins}m{remaining:.1}s")
    }
}

/// Format a number with thousand separators.
#[must_use]
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
