//! Back-to-front write buffer
//!
//! FlatBuffers are built from the leaves up: children are written before
//! the parents that reference them, and every write lands directly in front
//! of the previous one. [`Arena`] owns one byte vector and a `head` cursor:
//!
//! ```text
//! 0            head                     buf.len()
//! [ free space | used bytes ........... ]
//!               ^ next write ends here
//! ```
//!
//! Growing allocates a region twice as large and copies the used bytes to
//! its end, so positions measured from the back ([`AbsOffset`]) never move.
//! Nothing here hands out references into the free region that could outlive
//! a growth step.

use crate::scalar::Scalar;
use crate::{AbsOffset, CodecError, Result};

/// Growable byte region written back-to-front
#[derive(Debug, Clone, Default)]
pub struct Arena {
    buf: Vec<u8>,
    head: usize,
}

impl Arena {
    /// Allocate an arena with `capacity` bytes of free space (0 is allowed)
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| CodecError::OutOfMemory {
                requested: capacity,
            })?;
        buf.resize(capacity, 0);
        Ok(Self {
            buf,
            head: capacity,
        })
    }

    /// Number of bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total allocated bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The used region, front to back
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf[self.head..]
    }

    /// `len` bytes starting at a previously returned offset
    pub fn bytes_at(&self, offset: AbsOffset, len: usize) -> Option<&[u8]> {
        let start = self.index_of(offset)?;
        self.buf.get(start..start.checked_add(len)?)
    }

    /// Read a scalar stored at a previously returned offset
    pub fn scalar_at<T: Scalar>(&self, offset: AbsOffset) -> Option<T> {
        self.bytes_at(offset, T::SIZE).map(T::read_le)
    }

    /// Forward index of a back-relative offset, if it lies inside the used region
    #[inline]
    fn index_of(&self, offset: AbsOffset) -> Option<usize> {
        let off = offset.get() as usize;
        if off > self.len() {
            return None;
        }
        Some(self.buf.len() - off)
    }

    /// Double the capacity (at least 1 byte), keeping used bytes at the back
    ///
    /// Growth is clamped to `limit`; once the arena is at the limit this
    /// fails with `BufferOverflow` and leaves the contents untouched.
    pub(crate) fn grow(&mut self, limit: usize) -> Result<()> {
        let old_cap = self.buf.len();
        let used = self.len();
        let new_cap = old_cap.saturating_mul(2).max(1).min(limit);
        if new_cap <= old_cap {
            return Err(CodecError::buffer_overflow(old_cap.saturating_add(1), limit));
        }

        let mut grown = Vec::new();
        grown
            .try_reserve_exact(new_cap)
            .map_err(|_| CodecError::OutOfMemory { requested: new_cap })?;
        grown.resize(new_cap - used, 0);
        grown.extend_from_slice(&self.buf[self.head..]);

        self.buf = grown;
        self.head = new_cap - used;

        tracing::trace!(old_cap, new_cap, used, "flatbuffer arena grown");
        Ok(())
    }

    /// Make room for a `size`-byte value followed (in front) by `additional` bytes
    ///
    /// Grows as needed, then pads with zeros so that once `additional` more
    /// bytes are written the value lands on a `size`-aligned offset.
    pub(crate) fn prep(&mut self, size: usize, additional: usize, limit: usize) -> Result<()> {
        let pad = pad_for(self.len(), size, additional);
        let needed = pad
            .checked_add(size)
            .and_then(|n| n.checked_add(additional))
            .ok_or_else(|| CodecError::buffer_overflow(usize::MAX, limit))?;

        self.reserve(needed, limit)?;
        self.pad(pad);
        Ok(())
    }

    /// Grow until at least `needed` bytes of free space remain
    ///
    /// Nothing is written, so a failure leaves the used region as it was.
    pub(crate) fn reserve(&mut self, needed: usize, limit: usize) -> Result<()> {
        while self.head < needed {
            self.grow(limit)?;
        }
        Ok(())
    }

    /// Write `n` zero bytes. Caller guarantees the space (via `prep`).
    #[inline]
    pub(crate) fn pad(&mut self, n: usize) {
        let start = self.head - n;
        self.buf[start..self.head].fill(0);
        self.head = start;
    }

    /// Claim `n` bytes in front of the used region and return them for filling
    ///
    /// The borrow ends before any further write, so growth can never
    /// invalidate it. Caller guarantees the space (via `prep`).
    #[inline]
    pub(crate) fn claim(&mut self, n: usize) -> &mut [u8] {
        let start = self.head - n;
        self.head = start;
        &mut self.buf[start..start + n]
    }

    /// Write raw bytes in front of the used region
    #[inline]
    pub(crate) fn place(&mut self, bytes: &[u8]) {
        self.claim(bytes.len()).copy_from_slice(bytes);
    }

    /// Write a scalar in front of the used region
    #[inline]
    pub(crate) fn place_scalar<T: Scalar>(&mut self, value: T) {
        value.write_le(self.claim(T::SIZE));
    }

    /// Overwrite an already-written scalar
    pub(crate) fn patch_scalar<T: Scalar>(&mut self, offset: AbsOffset, value: T) -> Result<()> {
        let len = self.len();
        let start = self.index_of(offset).ok_or(CodecError::InvalidOffset {
            offset: offset.get(),
            len,
        })?;
        let slot = self
            .buf
            .get_mut(start..start + T::SIZE)
            .ok_or(CodecError::InvalidOffset {
                offset: offset.get(),
                len,
            })?;
        value.write_le(slot);
        Ok(())
    }

    /// Drop all written bytes, keeping the allocation
    pub(crate) fn clear(&mut self) {
        self.head = self.buf.len();
    }

    /// Consume the arena, returning the backing vector and the start of the used region
    pub(crate) fn into_parts(self) -> (Vec<u8>, usize) {
        (self.buf, self.head)
    }
}

/// Zero bytes needed at length `len` so that a `size`-byte value lands
/// aligned once `additional` more bytes are written in front of it
#[inline]
pub(crate) fn pad_for(len: usize, size: usize, additional: usize) -> usize {
    let align = size.max(1);
    (align - (len % align + additional % align) % align) % align
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
