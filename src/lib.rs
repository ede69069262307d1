//! Shared fixtures for the cross-crate integration tests.

use std::cell::RefCell;
use std::rc::Rc;

/// Records the ids of dropped [`Logged`] values in drop order.
#[derive(Debug, Clone, Default)]
pub struct DropLog(Rc<RefCell<Vec<u32>>>);

impl DropLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value that appends `id` to this log when dropped.
    pub fn track(&self, id: u32) -> Logged {
        Logged {
            id,
            log: self.clone(),
            panic_on_drop: false,
        }
    }

    /// Like [`DropLog::track`], but the destructor panics after logging.
    pub fn bomb(&self, id: u32) -> Logged {
        Logged {
            id,
            log: self.clone(),
            panic_on_drop: true,
        }
    }

    /// Ids dropped so far.
    pub fn dropped(&self) -> Vec<u32> {
        self.0.borrow().clone()
    }

    /// Number of live values still pointing at this log.
    pub fn live(&self) -> usize {
        Rc::strong_count(&self.0) - 1
    }
}

/// Value tracked by a [`DropLog`].
#[derive(Debug)]
pub struct Logged {
    /// Identifier recorded on drop.
    pub id: u32,
    log: DropLog,
    panic_on_drop: bool,
}

impl Drop for Logged {
    fn drop(&mut self) {
        self.log.0.borrow_mut().push(self.id);
        if self.panic_on_drop {
            panic!("destructor of {} failed", self.id);
        }
    }
}
