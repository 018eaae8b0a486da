#![no_main]
use libfuzzer_sys::fuzz_target;
use tsbridge_membrane::{ReleaseResult, ResultArena, SafetyLevel};

// Drive an arena with an op stream: allocate, release, release-again and
// release-foreign, checking every classification against a model.
fuzz_target!(|data: &[u8]| {
    let arena = ResultArena::with_level(SafetyLevel::Hardened);
    let mut live: Vec<*mut u8> = Vec::new();
    let mut released: Vec<*mut u8> = Vec::new();
    let mut foreign = [0u8; 16];

    for chunk in data.chunks(2) {
        let op = chunk[0] % 4;
        let arg = chunk.get(1).copied().unwrap_or(0) as usize;
        match op {
            0 => {
                let len = arg + 1;
                let ptr = arena.allocate_with(len, |buf| buf.fill(0xAB)).expect("allocation");
                live.push(ptr.as_ptr());
            }
            1 if !live.is_empty() => {
                let ptr = live.swap_remove(arg % live.len());
                assert_eq!(arena.release(ptr), ReleaseResult::Released);
                released.push(ptr);
            }
            2 if !released.is_empty() => {
                // Quarantine holds far more than this loop can release.
                let ptr = released[arg % released.len()];
                assert_eq!(arena.release(ptr), ReleaseResult::DoubleRelease);
            }
            3 => {
                let ptr = foreign.as_mut_ptr().wrapping_add(arg % 16);
                assert_eq!(arena.release(ptr), ReleaseResult::ForeignPointer);
            }
            _ => {}
        }
        assert_eq!(arena.live_count(), live.len());
    }

    for ptr in live {
        assert!(arena.release(ptr).accepted());
    }
    assert_eq!(arena.live_count(), 0);
    arena.flush_quarantine();
});
