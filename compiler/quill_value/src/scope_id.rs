//! Handles to runtime variable frames.

use std::fmt;

/// Generational handle to a frame in a render's scope arena.
///
/// A handle outlives its frame only as a value; using it after the frame is
/// destroyed fails with a stale-scope error instead of reading a reused slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: u32,
    generation: u32,
}

impl ScopeId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        ScopeId { index, generation }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({}v{})", self.index, self.generation)
    }
}
