//! Block-chain bookkeeping shared by both arena kinds.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::block::MemoryBlock;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::stats::{ArenaStats, StatCounters};

/// Collects the outcome of a clear walk.
///
/// A panicking destructor is caught so the walk can finish every remaining
/// destruction and release; the first payload is resumed once it is done.
#[derive(Default)]
pub(crate) struct Teardown {
    destroyed: usize,
    released: usize,
    panic: Option<Box<dyn Any + Send + 'static>>,
}

impl Teardown {
    /// Run one destructor, catching any panic.
    pub(crate) fn destroy(&mut self, destructor: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(destructor)) {
            self.panic.get_or_insert(payload);
        }
        self.destroyed += 1;
    }

    /// Count objects that need no destructor.
    pub(crate) fn skip(&mut self, count: usize) {
        self.destroyed += count;
    }
}

/// The chain of blocks owned by an arena, newest block first.
pub(crate) struct BlockChain {
    current: RefCell<Option<Box<MemoryBlock>>>,
    config: ArenaConfig,
    align: usize,
    blocks: Cell<usize>,
    live: Cell<usize>,
    stats: StatCounters,
}

impl BlockChain {
    /// A chain that owns its original block from the start.
    pub(crate) fn with_original(config: ArenaConfig, align: usize) -> Result<Self, ArenaError> {
        let chain = Self::new(config, align);
        let block = chain.allocate_block()?;
        *chain.current.borrow_mut() = Some(Box::new(block));
        Ok(chain)
    }

    /// Like [`BlockChain::with_original`], panicking if the original block
    /// cannot be reserved.
    pub(crate) fn reserve(config: ArenaConfig, align: usize) -> Self {
        match Self::with_original(config, align) {
            Ok(chain) => chain,
            Err(err) => panic!("cannot reserve the original arena block: {err}"),
        }
    }

    /// A chain with no blocks, whose blocks will be aligned to `align`.
    pub(crate) fn new(config: ArenaConfig, align: usize) -> Self {
        Self {
            current: RefCell::new(None),
            config: config.normalize(),
            align,
            blocks: Cell::new(0),
            live: Cell::new(0),
            stats: StatCounters::default(),
        }
    }

    pub(crate) fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub(crate) fn capacity(&self) -> usize {
        self.config.block_capacity
    }

    /// Fail with `ObjectTooLarge` if `required` bytes can never fit a block.
    pub(crate) fn check_fits(&self, required: usize) -> Result<(), ArenaError> {
        if required > self.capacity() {
            return Err(ArenaError::ObjectTooLarge {
                required,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    pub(crate) fn block_count(&self) -> usize {
        self.blocks.get()
    }

    pub(crate) fn len(&self) -> usize {
        self.live.get()
    }

    pub(crate) fn allocated_bytes(&self) -> usize {
        self.block_count() * self.capacity()
    }

    pub(crate) fn used_bytes(&self) -> usize {
        let current = self.current.borrow();
        std::iter::successors(current.as_deref(), |block| block.previous())
            .map(MemoryBlock::used)
            .sum()
    }

    pub(crate) fn stats(&self) -> ArenaStats {
        self.stats.snapshot()
    }

    pub(crate) fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Run `place` on a block with room for the next object, growing the
    /// chain when the current block fails `fits`.
    ///
    /// A newly allocated block links back to the previous head and becomes
    /// the head. If the allocation fails the chain is left untouched.
    pub(crate) fn with_room<R>(
        &self,
        fits: impl Fn(&MemoryBlock) -> bool,
        place: impl FnOnce(&mut MemoryBlock) -> R,
    ) -> Result<R, ArenaError> {
        let mut current = self.current.borrow_mut();
        let block = match &mut *current {
            Some(block) if fits(&**block) => &mut **block,
            head => {
                let mut block = self.allocate_block()?;
                block.link(head.take());
                &mut **head.insert(Box::new(block))
            }
        };
        let placed = place(block);
        self.live.set(self.live.get() + 1);
        self.stats.record_created();
        Ok(placed)
    }

    /// Allocate one block and count it; the caller links it into the chain.
    fn allocate_block(&self) -> Result<MemoryBlock, ArenaError> {
        let block = MemoryBlock::allocate(self.capacity(), self.align).map_err(|err| {
            warn!(capacity = self.capacity(), error = %err, "block allocation failed");
            err
        })?;
        self.blocks.set(self.blocks.get() + 1);
        self.stats.record_block_allocated();
        debug!(
            capacity = self.capacity(),
            blocks = self.blocks.get(),
            "arena grew a new block"
        );
        Ok(block)
    }

    /// Destroy every object and release blocks.
    ///
    /// Blocks are visited newest first; `destroy_block` handles the objects
    /// inside one block. Every block that has a predecessor is released. The
    /// original block is kept with its cursor rewound when `retain_original`
    /// is set, and released otherwise.
    pub(crate) fn clear(
        &mut self,
        retain_original: bool,
        mut destroy_block: impl FnMut(&MemoryBlock, &mut Teardown),
    ) {
        let mut teardown = Teardown::default();
        let current = self.current.get_mut();

        while let Some(mut block) = current.take() {
            destroy_block(&*block, &mut teardown);
            match block.take_previous() {
                Some(previous) => {
                    drop(block);
                    teardown.released += 1;
                    *current = Some(previous);
                }
                None => {
                    if retain_original {
                        block.reset();
                        *current = Some(block);
                    } else {
                        drop(block);
                        teardown.released += 1;
                    }
                    break;
                }
            }
        }

        self.blocks.set(self.blocks.get() - teardown.released);
        self.live.set(0);
        self.stats.record_destroyed(teardown.destroyed as u64);
        self.stats.record_blocks_released(teardown.released as u64);
        self.stats.record_clear();
        debug!(
            destroyed = teardown.destroyed,
            released = teardown.released,
            retained = self.blocks.get(),
            "arena cleared"
        );

        if let Some(payload) = teardown.panic {
            panic::resume_unwind(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetentionPolicy;

    fn chain(capacity: usize) -> BlockChain {
        BlockChain::new(ArenaConfig::with_capacity(capacity), 8)
    }

    fn push(chain: &BlockChain, len: usize) {
        chain
            .with_room(|block| block.remaining() >= len, |block| block.advance(len))
            .unwrap();
    }

    #[test]
    fn empty_chain_has_no_blocks() {
        let chain = chain(64);
        assert_eq!(chain.block_count(), 0);
        assert_eq!(chain.allocated_bytes(), 0);
        assert_eq!(chain.used_bytes(), 0);
    }

    #[test]
    fn grows_when_block_is_full() {
        let chain = chain(64);
        push(&chain, 40);
        assert_eq!(chain.block_count(), 1);
        push(&chain, 24);
        assert_eq!(chain.block_count(), 1);
        push(&chain, 8);
        assert_eq!(chain.block_count(), 2);
        assert_eq!(chain.used_bytes(), 72);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn clear_retains_original_block() {
        let mut chain = chain(32);
        for _ in 0..5 {
            push(&chain, 32);
        }
        assert_eq!(chain.block_count(), 5);

        let mut visited = 0;
        chain.clear(true, |_, _| visited += 1);
        assert_eq!(visited, 5);
        assert_eq!(chain.block_count(), 1);
        assert_eq!(chain.used_bytes(), 0);
        assert_eq!(chain.stats().blocks_released, 4);
    }

    #[test]
    fn clear_can_release_everything() {
        let config = ArenaConfig::with_capacity(32).retention(RetentionPolicy::ReleaseAll);
        let mut chain = BlockChain::new(config, 8);
        push(&chain, 32);
        push(&chain, 32);
        chain.clear(config.retains_original(), |_, _| {});
        assert_eq!(chain.block_count(), 0);
        assert_eq!(chain.stats().blocks_released, 2);
    }

    #[test]
    fn clear_on_empty_chain_is_noop() {
        let mut chain = chain(32);
        chain.clear(true, |_, _| panic!("no blocks to visit"));
        chain.clear(true, |_, _| panic!("no blocks to visit"));
        assert_eq!(chain.stats().clears, 2);
        assert_eq!(chain.block_count(), 0);
    }

    #[test]
    fn failed_growth_leaves_chain_untouched() {
        let chain = BlockChain::new(ArenaConfig::with_capacity(usize::MAX), 8);
        let result = chain.with_room(|_| false, |_| ());
        assert_eq!(
            result.err(),
            Some(ArenaError::InvalidCapacity {
                capacity: usize::MAX
            })
        );
        assert_eq!(chain.block_count(), 0);
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn original_block_is_reserved_up_front() {
        let mut chain = BlockChain::with_original(ArenaConfig::with_capacity(64), 8).unwrap();
        assert_eq!(chain.block_count(), 1);
        assert_eq!(chain.allocated_bytes(), 64);
        assert_eq!(chain.stats().blocks_allocated, 1);
        assert_eq!(chain.len(), 0);

        chain.clear(true, |block, _| assert_eq!(block.used(), 0));
        assert_eq!(chain.block_count(), 1);
        push(&chain, 64);
        assert_eq!(chain.block_count(), 1);
    }

    #[test]
    fn original_block_failure_is_reported() {
        let result = BlockChain::with_original(ArenaConfig::with_capacity(usize::MAX), 8);
        assert_eq!(
            result.err(),
            Some(ArenaError::InvalidCapacity {
                capacity: usize::MAX
            })
        );
    }

    #[test]
    #[should_panic(expected = "cannot reserve the original arena block")]
    fn reserve_panics_on_invalid_capacity() {
        let _ = BlockChain::reserve(ArenaConfig::with_capacity(usize::MAX), 8);
    }

    #[test]
    fn teardown_keeps_first_panic() {
        let mut teardown = Teardown::default();
        teardown.destroy(|| panic!("first"));
        teardown.destroy(|| {});
        teardown.destroy(|| panic!("second"));
        assert_eq!(teardown.destroyed, 3);
        let payload = teardown.panic.unwrap();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"first"));
    }
}
