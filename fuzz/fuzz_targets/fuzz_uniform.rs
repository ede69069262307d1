#![no_main]

use libfuzzer_sys::fuzz_target;

use blockarena_core::{ArenaConfig, RetentionPolicy, UniformArena};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // First two bytes pick the block capacity and retention policy
    let capacity = usize::from(u16::from_le_bytes([data[0], data[1]]) % 4096);
    let retention = if capacity % 2 == 0 {
        RetentionPolicy::RetainOriginal
    } else {
        RetentionPolicy::ReleaseAll
    };
    let mut arena = UniformArena::<u64>::with_config(
        ArenaConfig::with_capacity(capacity).retention(retention),
    );

    let mut expected = Vec::new();
    for &byte in &data[2..] {
        if byte == 0xFF {
            arena.clear();
            expected.clear();
            if retention == RetentionPolicy::RetainOriginal {
                assert_eq!(arena.block_count(), 1);
            } else {
                assert_eq!(arena.block_count(), 0);
            }
            continue;
        }
        let value = u64::from(byte);
        let Ok(slot) = arena.create(value) else {
            // Capacity below one stride: nothing is ever stored
            assert_eq!(arena.used_bytes(), 0);
            return;
        };
        assert_eq!(*slot, value);
        expected.push(value);
        assert_eq!(arena.len(), expected.len());
    }
});
