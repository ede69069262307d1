//! Arena usage statistics.

use std::cell::Cell;

use serde::Serialize;

/// Snapshot of arena activity since creation or the last `reset_stats()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    /// Blocks obtained from the system allocator.
    pub blocks_allocated: u64,
    /// Blocks returned to the system allocator.
    pub blocks_released: u64,
    /// Objects constructed in the arena.
    pub objects_created: u64,
    /// Objects whose destructor ran (or would have, for types without drop).
    pub objects_destroyed: u64,
    /// Number of `clear()` calls.
    pub clears: u64,
}

impl ArenaStats {
    /// Objects currently alive in the arena.
    #[must_use]
    pub fn live_objects(&self) -> u64 {
        self.objects_created.saturating_sub(self.objects_destroyed)
    }
}

/// Interior-mutable counters backing [`ArenaStats`].
///
/// Arenas are single-threaded, so plain `Cell`s are enough.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    blocks_allocated: Cell<u64>,
    blocks_released: Cell<u64>,
    objects_created: Cell<u64>,
    objects_destroyed: Cell<u64>,
    clears: Cell<u64>,
}

fn bump(cell: &Cell<u64>, by: u64) {
    cell.set(cell.get().wrapping_add(by));
}

impl StatCounters {
    pub(crate) fn snapshot(&self) -> ArenaStats {
        ArenaStats {
            blocks_allocated: self.blocks_allocated.get(),
            blocks_released: self.blocks_released.get(),
            objects_created: self.objects_created.get(),
            objects_destroyed: self.objects_destroyed.get(),
            clears: self.clears.get(),
        }
    }

    pub(crate) fn reset(&self) {
        self.blocks_allocated.set(0);
        self.blocks_released.set(0);
        self.objects_created.set(0);
        self.objects_destroyed.set(0);
        self.clears.set(0);
    }

    pub(crate) fn record_block_allocated(&self) {
        bump(&self.blocks_allocated, 1);
    }

    pub(crate) fn record_blocks_released(&self, count: u64) {
        bump(&self.blocks_released, count);
    }

    pub(crate) fn record_created(&self) {
        bump(&self.objects_created, 1);
    }

    pub(crate) fn record_destroyed(&self, count: u64) {
        bump(&self.objects_destroyed, count);
    }

    pub(crate) fn record_clear(&self) {
        bump(&self.clears, 1);
    }
}
