//! Vtable deduplication
//!
//! Objects with the same field layout can share one vtable. The builder
//! asks a [`VtableCache`] for a match before emitting a new vtable and
//! registers every vtable it does emit.
//!
//! Two vtables match when they describe the same number of fields with
//! identical per-field offsets. The object size stored in the vtable is
//! not compared: it includes alignment padding that differs between
//! otherwise identical objects, and readers never depend on it.

use std::collections::HashMap;

use crate::arena::Arena;
use crate::{AbsOffset, VOffset};

/// Size of the vtable header: `[u16 vtable size][u16 object size]`
pub(crate) const VTABLE_HEADER_SIZE: usize = 4;

/// Lookup strategy for previously emitted vtables
pub trait VtableCache {
    /// Find an emitted vtable whose field offsets equal `fields`
    fn find(&self, arena: &Arena, fields: &[VOffset]) -> Option<AbsOffset>;

    /// Record a vtable just written at `at`
    fn insert(&mut self, fields: &[VOffset], at: AbsOffset);

    /// Number of distinct vtables emitted so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all vtables (the buffer they lived in is gone)
    fn clear(&mut self);
}

/// Default strategy: scan the history newest-first
///
/// Structurally similar objects tend to be built next to each other, so
/// the most recent vtables are the most likely hits.
#[derive(Debug, Clone, Default)]
pub struct LinearScan {
    history: Vec<AbsOffset>,
}

impl LinearScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets of every emitted vtable, oldest first
    pub fn history(&self) -> &[AbsOffset] {
        &self.history
    }
}

impl VtableCache for LinearScan {
    fn find(&self, arena: &Arena, fields: &[VOffset]) -> Option<AbsOffset> {
        self.history
            .iter()
            .rev()
            .copied()
            .find(|&at| vtable_matches(arena, at, fields))
    }

    fn insert(&mut self, _fields: &[VOffset], at: AbsOffset) {
        self.history.push(at);
    }

    fn len(&self) -> usize {
        self.history.len()
    }

    fn clear(&mut self) {
        self.history.clear();
    }
}

/// Hash-keyed strategy for messages with many distinct object shapes
#[derive(Debug, Clone, Default)]
pub struct HashedVtables {
    by_layout: HashMap<Vec<VOffset>, AbsOffset>,
}

impl HashedVtables {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VtableCache for HashedVtables {
    fn find(&self, _arena: &Arena, fields: &[VOffset]) -> Option<AbsOffset> {
        self.by_layout.get(fields).copied()
    }

    fn insert(&mut self, fields: &[VOffset], at: AbsOffset) {
        self.by_layout.insert(fields.to_vec(), at);
    }

    fn len(&self) -> usize {
        self.by_layout.len()
    }

    fn clear(&mut self) {
        self.by_layout.clear();
    }
}

/// Compare the vtable written at `at` against a candidate field list
fn vtable_matches(arena: &Arena, at: AbsOffset, fields: &[VOffset]) -> bool {
    let Some(vsize) = arena.scalar_at::<u16>(at) else {
        return false;
    };
    let vsize = vsize as usize;
    if vsize != VTABLE_HEADER_SIZE + fields.len() * 2 {
        return false;
    }

    let Some(raw) = arena.bytes_at(at, vsize) else {
        return false;
    };

    raw[VTABLE_HEADER_SIZE..]
        .chunks_exact(2)
        .zip(fields)
        .all(|(slot, field)| u16::from_le_bytes([slot[0], slot[1]]) == field.get())
}

#[cfg(test)]
#[path = "vtable_test.rs"]
mod vtable_test;
