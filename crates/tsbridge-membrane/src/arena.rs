//! Generational result arena with a release quarantine.
//!
//! Every buffer the boundary hands to a host is allocated here, tagged with a
//! fingerprint header and trailing canary, and registered under its
//! host-visible address. Release goes through [`ResultArena::release`], which
//! classifies the pointer *before* touching any memory:
//!
//! - unknown addresses are refused (`ForeignPointer`) and never dereferenced
//! - a second release of a quarantined buffer is refused (`DoubleRelease`)
//! - a live buffer is verified, optionally poisoned, and quarantined; memory
//!   only returns to the allocator once the bounded quarantine overflows
//!
//! Detection of a double release is exact while the buffer sits in
//! quarantine. Once drained, its address is forgotten and may be reissued by
//! the allocator; a stale release after that point is indistinguishable from
//! a release of the new buffer.
//!
//! Thread-safe via sharded `parking_lot::Mutex`.

#![allow(unsafe_code)]

use parking_lot::Mutex;
use std::alloc::Layout;
use std::collections::{HashMap, VecDeque};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::config::{SafetyLevel, safety_level};
use crate::fingerprint::{BufferFingerprint, CANARY_SIZE, FINGERPRINT_SIZE};
use crate::metrics::{ArenaMetrics, ArenaSnapshot};
use crate::state::BufferState;

/// Maximum bytes held in quarantine per shard.
const QUARANTINE_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Maximum quarantined buffers per shard.
const QUARANTINE_MAX_ENTRIES: usize = 1024;

/// Number of shards (power of 2).
const NUM_SHARDS: usize = 16;

/// Allocation alignment; equal to the header size so the user pointer stays aligned.
const ALIGN: usize = 16;

/// Byte written over released payloads in hardened mode.
pub const POISON_BYTE: u8 = 0xDB;

/// Metadata for one issued buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSlot {
    /// Start of the underlying allocation (the fingerprint header).
    pub raw_base: usize,
    /// Host-visible pointer.
    pub user_base: usize,
    /// Payload length in bytes, terminator included.
    pub user_size: usize,
    /// Generation counter, advanced on release.
    pub generation: u32,
    pub state: BufferState,
}

#[derive(Debug, Clone, Copy)]
struct QuarantineEntry {
    user_base: usize,
    raw_base: usize,
    user_size: usize,
}

struct ArenaShard {
    slots: Vec<ArenaSlot>,
    addr_to_slot: HashMap<usize, usize>,
    free_list: Vec<usize>,
    quarantine: VecDeque<QuarantineEntry>,
    quarantine_bytes: usize,
}

impl ArenaShard {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            addr_to_slot: HashMap::new(),
            free_list: Vec::new(),
            quarantine: VecDeque::new(),
            quarantine_bytes: 0,
        }
    }

    fn insert(&mut self, slot: ArenaSlot) {
        let idx = if let Some(free_idx) = self.free_list.pop() {
            self.slots[free_idx] = slot;
            free_idx
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        };
        self.addr_to_slot.insert(slot.user_base, idx);
    }

    fn forget(&mut self, user_base: usize) {
        if let Some(idx) = self.addr_to_slot.remove(&user_base) {
            self.slots[idx].state = BufferState::Released;
            self.free_list.push(idx);
        }
    }
}

/// Result of a release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseResult {
    /// Accepted; the buffer is no longer owned by the host.
    Released,
    /// Accepted, but the header or trailing canary had been overwritten.
    ReleasedWithCorruption,
    /// The buffer had already been released.
    DoubleRelease,
    /// The pointer was not issued by this arena.
    ForeignPointer,
    /// Null handle; nothing to do.
    Null,
}

impl ReleaseResult {
    /// The release was accepted and ownership returned to the arena.
    #[must_use]
    pub const fn accepted(self) -> bool {
        matches!(self, Self::Released | Self::ReleasedWithCorruption)
    }
}

/// Owns the boundary-side allocator for result buffers.
pub struct ResultArena {
    shards: Box<[Mutex<ArenaShard>]>,
    next_generation: AtomicU32,
    live: AtomicUsize,
    live_bytes: AtomicUsize,
    level: SafetyLevel,
    metrics: ArenaMetrics,
}

impl ResultArena {
    /// Arena running under the process-wide mode (`TSBRIDGE_MODE`).
    #[must_use]
    pub fn new() -> Self {
        Self::with_level(safety_level())
    }

    /// Arena running under an explicit mode.
    #[must_use]
    pub fn with_level(level: SafetyLevel) -> Self {
        let shards: Vec<Mutex<ArenaShard>> = (0..NUM_SHARDS)
            .map(|_| Mutex::new(ArenaShard::new()))
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
            next_generation: AtomicU32::new(1),
            live: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
            level,
            metrics: ArenaMetrics::new(),
        }
    }

    #[must_use]
    pub fn level(&self) -> SafetyLevel {
        self.level
    }

    /// Allocate a zero-filled buffer of `len` bytes.
    pub fn allocate(&self, len: usize) -> Option<NonNull<u8>> {
        self.allocate_with(len, |_| {})
    }

    /// Allocate `len` bytes and initialize them through `fill`.
    ///
    /// The buffer is registered only after `fill` returns, so no other thread
    /// can observe (or release) a half-written result. Returns `None` if the
    /// size overflows or the allocator refuses.
    pub fn allocate_with<F>(&self, len: usize, fill: F) -> Option<NonNull<u8>>
    where
        F: FnOnce(&mut [u8]),
    {
        let Some(layout) = layout_for(len) else {
            ArenaMetrics::inc(&self.metrics.allocation_failures);
            return None;
        };

        // SAFETY: layout has non-zero size (header and canary are always present).
        let raw = unsafe { std::alloc::alloc_zeroed(layout) };
        let Some(raw) = NonNull::new(raw) else {
            ArenaMetrics::inc(&self.metrics.allocation_failures);
            return None;
        };
        let block = RawBlock { raw, layout };

        // SAFETY: the header occupies the first FINGERPRINT_SIZE bytes of the block.
        let user = unsafe { raw.add(FINGERPRINT_SIZE) };
        {
            // SAFETY: [user, user + len) lies inside the zero-initialized block.
            let payload = unsafe { std::slice::from_raw_parts_mut(user.as_ptr(), len) };
            fill(payload);
        }

        let user_base = user.as_ptr() as usize;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let fp = BufferFingerprint::compute(user_base, len, generation);
        // SAFETY: header sits at raw_base, canary right after the payload; both
        // ranges are inside the block by construction of `layout_for`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                fp.to_bytes().as_ptr(),
                raw.as_ptr(),
                FINGERPRINT_SIZE,
            );
            std::ptr::copy_nonoverlapping(
                fp.canary().to_bytes().as_ptr(),
                user.as_ptr().add(len),
                CANARY_SIZE,
            );
        }
        let raw = block.into_raw();

        let slot = ArenaSlot {
            raw_base: raw.as_ptr() as usize,
            user_base,
            user_size: len,
            generation,
            state: BufferState::Live,
        };
        self.shards[shard_for(user_base)].lock().insert(slot);

        self.live.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(len, Ordering::Relaxed);
        ArenaMetrics::inc(&self.metrics.allocations);
        Some(user)
    }

    /// Release a buffer previously returned by this arena.
    pub fn release(&self, user_ptr: *mut u8) -> ReleaseResult {
        if user_ptr.is_null() {
            ArenaMetrics::inc(&self.metrics.null_releases);
            return ReleaseResult::Null;
        }

        let user_base = user_ptr as usize;
        let mut shard = self.shards[shard_for(user_base)].lock();

        let Some(&slot_idx) = shard.addr_to_slot.get(&user_base) else {
            ArenaMetrics::inc(&self.metrics.foreign_releases);
            return ReleaseResult::ForeignPointer;
        };

        let slot = shard.slots[slot_idx];
        if slot.state.is_released() {
            ArenaMetrics::inc(&self.metrics.double_releases);
            return ReleaseResult::DoubleRelease;
        }
        if !slot.state.is_live() {
            ArenaMetrics::inc(&self.metrics.foreign_releases);
            return ReleaseResult::ForeignPointer;
        }

        let intact = !self.level.validation_enabled() || verify_slot(&slot);

        if self.level.poisons_on_release() {
            // SAFETY: the slot is live, so its payload is still allocated.
            unsafe {
                std::ptr::write_bytes(slot.user_base as *mut u8, POISON_BYTE, slot.user_size);
            }
        }

        self.live.fetch_sub(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(slot.user_size, Ordering::Relaxed);
        ArenaMetrics::inc(&self.metrics.releases);
        if !intact {
            ArenaMetrics::inc(&self.metrics.canary_failures);
        }

        if self.level.validation_enabled() {
            let entry = &mut shard.slots[slot_idx];
            entry.state = BufferState::Quarantined;
            entry.generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            shard.quarantine.push_back(QuarantineEntry {
                user_base,
                raw_base: slot.raw_base,
                user_size: slot.user_size,
            });
            shard.quarantine_bytes += slot.user_size;
            let drained = drain_quarantine(&mut shard, QUARANTINE_MAX_BYTES, QUARANTINE_MAX_ENTRIES);
            self.metrics
                .drained
                .fetch_add(drained as u64, Ordering::Relaxed);
        } else {
            shard.forget(user_base);
            free_block(slot.raw_base, slot.user_size);
        }

        if intact {
            ReleaseResult::Released
        } else {
            ReleaseResult::ReleasedWithCorruption
        }
    }

    /// Slot metadata for an exact host-visible address.
    #[must_use]
    pub fn lookup(&self, user_ptr: usize) -> Option<ArenaSlot> {
        let shard = self.shards[shard_for(user_ptr)].lock();
        let &idx = shard.addr_to_slot.get(&user_ptr)?;
        Some(shard.slots[idx])
    }

    /// Payload length of a live buffer.
    #[must_use]
    pub fn payload_len(&self, user_ptr: usize) -> Option<usize> {
        self.lookup(user_ptr)
            .filter(|slot| slot.state.is_live())
            .map(|slot| slot.user_size)
    }

    /// Buffers currently owned by the host.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Payload bytes currently owned by the host.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// Buffers released but not yet returned to the allocator.
    #[must_use]
    pub fn quarantined_count(&self) -> usize {
        self.shards.iter().map(|s| s.lock().quarantine.len()).sum()
    }

    /// Return every quarantined buffer to the allocator.
    pub fn flush_quarantine(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += drain_quarantine(&mut shard.lock(), 0, 0);
        }
        self.metrics
            .drained
            .fetch_add(total as u64, Ordering::Relaxed);
        total
    }

    #[must_use]
    pub fn metrics(&self) -> ArenaSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for ResultArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResultArena {
    /// Dropping an arena frees everything it still tracks, live buffers included.
    fn drop(&mut self) {
        for shard in self.shards.iter_mut() {
            let shard = shard.get_mut();
            for (_, idx) in shard.addr_to_slot.drain() {
                let slot = shard.slots[idx];
                free_block(slot.raw_base, slot.user_size);
            }
            shard.quarantine.clear();
        }
    }
}

/// Owns a fresh allocation until it is registered.
struct RawBlock {
    raw: NonNull<u8>,
    layout: Layout,
}

impl RawBlock {
    fn into_raw(self) -> NonNull<u8> {
        let raw = self.raw;
        std::mem::forget(self);
        raw
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        // SAFETY: raw was allocated with exactly this layout and never registered.
        unsafe { std::alloc::dealloc(self.raw.as_ptr(), self.layout) };
    }
}

fn layout_for(len: usize) -> Option<Layout> {
    let total = FINGERPRINT_SIZE.checked_add(len)?.checked_add(CANARY_SIZE)?;
    Layout::from_size_align(total, ALIGN).ok()
}

fn shard_for(addr: usize) -> usize {
    ((addr >> 4) ^ (addr >> 12)) % NUM_SHARDS
}

fn verify_slot(slot: &ArenaSlot) -> bool {
    let mut header = [0u8; FINGERPRINT_SIZE];
    let mut canary = [0u8; CANARY_SIZE];
    // SAFETY: the slot is live; header and canary lie inside its allocation.
    unsafe {
        std::ptr::copy_nonoverlapping(
            slot.raw_base as *const u8,
            header.as_mut_ptr(),
            FINGERPRINT_SIZE,
        );
        std::ptr::copy_nonoverlapping(
            (slot.user_base + slot.user_size) as *const u8,
            canary.as_mut_ptr(),
            CANARY_SIZE,
        );
    }
    let fp = BufferFingerprint::from_bytes(&header);
    fp.verify(slot.user_base, slot.user_size) && fp.canary().verify(&canary)
}

fn free_block(raw_base: usize, user_size: usize) {
    let Some(layout) = layout_for(user_size) else {
        return;
    };
    // SAFETY: raw_base was allocated by `allocate_with` with this same layout
    // and callers remove it from the index before freeing.
    unsafe { std::alloc::dealloc(raw_base as *mut u8, layout) };
}

fn drain_quarantine(shard: &mut ArenaShard, max_bytes: usize, max_entries: usize) -> usize {
    let mut drained = 0;
    while shard.quarantine_bytes > max_bytes || shard.quarantine.len() > max_entries {
        let Some(entry) = shard.quarantine.pop_front() else {
            break;
        };
        shard.forget(entry.user_base);
        free_block(entry.raw_base, entry.user_size);
        shard.quarantine_bytes -= entry.user_size;
        drained += 1;
    }
    drained
}
