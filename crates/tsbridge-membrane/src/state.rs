//! Lifecycle state of an issued result buffer.

/// Where a tracked buffer is in its ownership lifecycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferState {
    /// Not tracked by the arena.
    #[default]
    Unknown,
    /// Owned by the host; awaiting exactly one release.
    Live,
    /// Released by the host, memory held back from the allocator.
    Quarantined,
    /// Memory returned to the allocator.
    Released,
}

impl BufferState {
    /// The host still owns the buffer.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }

    /// A release has already been accepted for this buffer.
    #[must_use]
    pub const fn is_released(self) -> bool {
        matches!(self, Self::Quarantined | Self::Released)
    }
}
