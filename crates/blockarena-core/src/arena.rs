//! The release contract shared by both arena kinds.
//!
//! [`Arena`] covers what every arena can do regardless of what it stores;
//! [`ArenaCreate`] adds construction of a particular `T`. A
//! [`UniformArena<T>`](crate::UniformArena) creates only `T`, while a
//! [`HeterogeneousArena`](crate::HeterogeneousArena) creates any type.

use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::stats::ArenaStats;

/// Bulk-release operations common to all arenas.
pub trait Arena {
    /// Destroy every object and release all blocks except the retained one.
    ///
    /// Safe to call on an empty arena and any number of times in a row.
    fn clear(&mut self);

    /// Number of live objects.
    fn len(&self) -> usize;

    /// Whether the arena holds no live objects.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of blocks currently owned.
    fn block_count(&self) -> usize;

    /// Bytes reserved from the system allocator.
    fn allocated_bytes(&self) -> usize;

    /// Activity counters.
    fn stats(&self) -> ArenaStats;

    /// The arena's configuration.
    fn config(&self) -> &ArenaConfig;
}

/// Construction of `T` values inside an arena.
pub trait ArenaCreate<T>: Arena {
    /// Move `value` into the arena and return a reference valid until the
    /// next [`Arena::clear`].
    fn create(&self, value: T) -> Result<&mut T, ArenaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeterogeneousArena, UniformArena};

    fn fill<A: ArenaCreate<u64>>(arena: &A, count: u64) -> u64 {
        let mut sum = 0;
        for i in 0..count {
            sum += *arena.create(i).unwrap();
        }
        sum
    }

    fn reset(arena: &mut dyn Arena) -> usize {
        let before = arena.len();
        arena.clear();
        before
    }

    #[test]
    fn generic_creation_over_both_kinds() {
        let uniform = UniformArena::<u64>::with_capacity(64);
        let mixed = HeterogeneousArena::with_capacity(64);
        assert_eq!(fill(&uniform, 20), 190);
        assert_eq!(fill(&mixed, 20), 190);
        assert_eq!(uniform.len(), 20);
        assert_eq!(mixed.len(), 20);
    }

    #[test]
    fn clear_through_trait_object() {
        let mut uniform = UniformArena::<u64>::new();
        let mut mixed = HeterogeneousArena::new();
        fill(&uniform, 3);
        fill(&mixed, 5);

        let arenas: [&mut dyn Arena; 2] = [&mut uniform, &mut mixed];
        let cleared: Vec<usize> = arenas.into_iter().map(reset).collect();
        assert_eq!(cleared, vec![3, 5]);
        assert!(uniform.is_empty());
        assert!(mixed.is_empty());
    }
}
