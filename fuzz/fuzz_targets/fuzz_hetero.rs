#![no_main]

use std::cell::Cell;

use libfuzzer_sys::fuzz_target;

use blockarena_core::{ArenaError, HeterogeneousArena};

struct Live<'a>(&'a Cell<usize>);

impl<'a> Live<'a> {
    fn new(count: &'a Cell<usize>) -> Self {
        count.set(count.get() + 1);
        Self(count)
    }
}

impl Drop for Live<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[repr(align(32))]
struct Wide(#[allow(dead_code)] [u8; 40]);

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let capacity = 64 + usize::from(data[0]) * 8;
    let live = Cell::new(0);
    {
        let mut arena = HeterogeneousArena::with_capacity(capacity);
        for &byte in &data[1..] {
            // Oversized records are expected; anything else must succeed
            let result = match byte % 6 {
                0 => arena.create(byte).map(|v| assert_eq!(*v, byte)),
                1 => arena.create(u64::from(byte) << 32).map(drop),
                2 => arena.create(Live::new(&live)).map(drop),
                3 => arena.create(vec![byte; usize::from(byte % 16)]).map(drop),
                4 => arena
                    .create(Wide([byte; 40]))
                    .map(|w| assert_eq!(std::ptr::from_mut(w) as usize % 32, 0)),
                _ => {
                    arena.clear();
                    assert_eq!(live.get(), 0);
                    Ok(())
                }
            };
            if let Err(err) = result {
                assert!(matches!(err, ArenaError::ObjectTooLarge { .. }));
            }
        }
    }
    assert_eq!(live.get(), 0);
});
