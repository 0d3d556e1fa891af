//! Offset newtypes
//!
//! The wire format uses three kinds of offsets. Keeping them as distinct
//! types means relative and absolute arithmetic cannot be mixed silently:
//!
//! - [`AbsOffset`] - a position in the builder, counted from the back of
//!   the buffer. This is the builder length at the moment a value was
//!   written, so it stays valid when the buffer grows.
//! - [`RelOffset`] - the signed object -> vtable distance (`soffset`).
//! - [`VOffset`] - a field position inside an object, relative to the
//!   object start, as stored in a vtable. Zero means "absent".

use crate::{CodecError, Result};

/// Back-relative position of a value inside a [`Builder`](crate::Builder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AbsOffset(u32);

impl AbsOffset {
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Convert a builder length into an offset
    #[inline]
    pub(crate) fn from_len(len: usize) -> Result<Self> {
        u32::try_from(len)
            .map(Self)
            .map_err(|_| CodecError::buffer_overflow(len, crate::MAX_BUFFER_SIZE))
    }

    /// Distance from `self` back to an earlier (smaller) offset, as stored in a vtable
    ///
    /// Fails when `earlier` lies after `self` or the distance does not fit 16 bits.
    #[inline]
    pub(crate) fn voffset_from(self, earlier: AbsOffset) -> Result<VOffset> {
        let delta = self
            .0
            .checked_sub(earlier.0)
            .ok_or_else(|| CodecError::invalid_flatbuffer("field written after its object"))?;
        u16::try_from(delta)
            .map(VOffset)
            .map_err(|_| CodecError::ObjectTooLarge {
                size: delta as usize,
            })
    }

    /// Signed distance stored at an object so that `object - soffset == vtable`
    #[inline]
    pub(crate) fn soffset_to(self, vtable: AbsOffset) -> RelOffset {
        RelOffset(vtable.0 as i32 - self.0 as i32)
    }
}

impl From<AbsOffset> for u32 {
    fn from(off: AbsOffset) -> Self {
        off.0
    }
}

/// Signed object -> vtable offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RelOffset(i32);

impl RelOffset {
    #[inline]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Resolve the vtable position for a table at `table` (forward index into a finished buffer)
    #[inline]
    pub(crate) fn resolve_from(self, table: usize) -> Option<usize> {
        let pos = table as i64 - self.0 as i64;
        usize::try_from(pos).ok()
    }
}

/// Field offset within an object, as stored in a vtable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VOffset(u16);

impl VOffset {
    /// Marker for an absent (or defaulted) field
    pub const ABSENT: VOffset = VOffset(0);

    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_absent(self) -> bool {
        self.0 == 0
    }

    /// Forward position of the field for a table starting at `table`
    #[inline]
    pub(crate) fn resolve_from(self, table: usize) -> Option<usize> {
        if self.is_absent() {
            None
        } else {
            Some(table + self.0 as usize)
        }
    }
}
