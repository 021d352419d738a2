//! Opaque entity handle. Allocation, generation counting and use-after-free
//! detection live a layer above this crate (see spec Non-goals); the core
//! only ever consumes the stable index half of the handle.

/// Opaque handle carried verbatim in an archetype's dense `entity_ids`
/// column. The core never interprets `generation` — it exists only so the
/// embedding layer can round-trip full handles through the storage core.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub const fn new(index: u32, generation: u32) -> Self {
        EntityId { index, generation }
    }

    /// The stable, sparse-map-addressable half of this handle.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}
