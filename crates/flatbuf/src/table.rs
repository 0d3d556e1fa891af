//! Zero-copy table reader
//!
//! Resolves fields of a finished FlatBuffer without unpacking it.
//!
//! # Wire Format
//!
//! ```text
//! [4 bytes: root offset] -> [table]
//!                              |
//!                              v
//!                           [vtable offset (i32): vtable = table - soffset]
//!                           [field data...]
//!                              |
//!                              v
//!                           [vtable]
//!                           [vtable size (u16)]
//!                           [table size (u16)]
//!                           [field offsets (u16 each, 0 = absent)]
//! ```
//!
//! # Safety
//!
//! Every access is bounds checked. Scalar readers fall back to the
//! caller's default for absent or unreadable fields; vector, string and
//! table readers return an error for offsets that point outside the buffer.

use crate::offset::{RelOffset, VOffset};
use crate::scalar::{Scalar, read_i32, read_scalar, read_u16, read_u32};
use crate::vtable::VTABLE_HEADER_SIZE;
use crate::{CodecError, Result};

/// Read-only view of one table inside a finished buffer
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    buf: &'a [u8],
    /// Position of the table's soffset
    offset: usize,
    /// Position of the table's vtable
    vtable: usize,
    /// Declared vtable size in bytes
    vsize: u16,
}

impl<'a> Table<'a> {
    /// Open the root table of a finished message
    pub fn root(buf: &'a [u8]) -> Result<Self> {
        let root = read_u32(buf, 0)? as usize;
        Self::new(buf, root)
    }

    /// Open the table whose soffset sits at `offset`
    pub fn new(buf: &'a [u8], offset: usize) -> Result<Self> {
        if offset.checked_add(4).is_none_or(|end| end > buf.len()) {
            return Err(CodecError::invalid_flatbuffer(format!(
                "table offset {} exceeds buffer length {}",
                offset,
                buf.len()
            )));
        }

        // vtable = table - soffset, whatever the sign
        let soffset = RelOffset::new(read_i32(buf, offset)?);
        let vtable = soffset
            .resolve_from(offset)
            .ok_or_else(|| CodecError::invalid_flatbuffer("vtable offset underflow"))?;

        if vtable.checked_add(VTABLE_HEADER_SIZE).is_none_or(|end| end > buf.len()) {
            return Err(CodecError::invalid_flatbuffer(format!(
                "vtable offset {} exceeds buffer length {}",
                vtable,
                buf.len()
            )));
        }

        let vsize = read_u16(buf, vtable)?;
        if (vsize as usize) < VTABLE_HEADER_SIZE || vtable + vsize as usize > buf.len() {
            return Err(CodecError::invalid_flatbuffer(format!(
                "invalid vtable size {} at offset {}",
                vsize, vtable
            )));
        }

        Ok(Self {
            buf,
            offset,
            vtable,
            vsize,
        })
    }

    /// Get the raw buffer
    #[inline]
    pub fn raw_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Position of this table in the buffer
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared vtable size in bytes
    #[inline]
    pub fn vtable_size(&self) -> u16 {
        self.vsize
    }

    /// Number of field slots the vtable declares
    #[inline]
    pub fn field_count(&self) -> usize {
        (self.vsize as usize - VTABLE_HEADER_SIZE) / 2
    }

    /// Absolute position of a field, or None if absent
    ///
    /// Fields past the end of an older, shorter vtable are absent too.
    pub fn lookup(&self, field: usize) -> Option<usize> {
        let slot = field.checked_mul(2)?.checked_add(VTABLE_HEADER_SIZE)?;
        if slot + 2 > self.vsize as usize {
            return None;
        }

        let voffset = VOffset::new(read_u16(self.buf, self.vtable + slot).ok()?);
        voffset.resolve_from(self.offset)
    }

    /// Read a scalar field, or `default` when absent
    pub fn read<T: Scalar>(&self, field: usize, default: T) -> T {
        self.lookup(field)
            .and_then(|pos| read_scalar(self.buf, pos).ok())
            .unwrap_or(default)
    }

    /// Follow the uoffset stored in a field
    fn follow(&self, field: usize) -> Result<Option<usize>> {
        let Some(pos) = self.lookup(field) else {
            return Ok(None);
        };
        follow_uoffset(self.buf, pos).map(Some)
    }

    /// Read a vector field
    pub fn read_vector(&self, field: usize) -> Result<Option<Vector<'a>>> {
        match self.follow(field)? {
            Some(pos) => Vector::parse(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }

    /// Element count of a vector field (0 when absent or malformed)
    pub fn read_vector_len(&self, field: usize) -> usize {
        self.read_vector(field)
            .ok()
            .flatten()
            .map_or(0, |vector| vector.len())
    }

    /// Read a byte vector field
    ///
    /// An empty vector reads as `None`, the same as an absent one.
    pub fn read_bytes(&self, field: usize) -> Result<Option<&'a [u8]>> {
        let Some(vector) = self.read_vector(field)? else {
            return Ok(None);
        };
        let bytes = vector.as_bytes()?;
        Ok((!bytes.is_empty()).then_some(bytes))
    }

    /// Read a string field (the NUL terminator is not included)
    pub fn read_str(&self, field: usize) -> Result<Option<&'a str>> {
        let Some(bytes) = self.read_bytes(field)? else {
            return Ok(None);
        };
        std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a nested table field
    pub fn read_table(&self, field: usize) -> Result<Option<Table<'a>>> {
        match self.follow(field)? {
            Some(pos) => Table::new(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }

    /// Read a union member
    ///
    /// The concrete table type comes from a sibling discriminant field the
    /// caller has already read; the reader only resolves the table.
    pub fn read_union(&self, field: usize) -> Result<Option<Table<'a>>> {
        self.read_table(field)
    }
}

macro_rules! typed_reads {
    ($($ty:ty => $read:ident;)*) => {
        impl<'a> Table<'a> {
            $(
                #[doc = concat!("Read a `", stringify!($ty), "` field, or `default` when absent")]
                #[inline]
                pub fn $read(&self, field: usize, default: $ty) -> $ty {
                    self.read(field, default)
                }
            )*
        }
    };
}

typed_reads! {
    bool => read_bool;
    i8 => read_i8;
    i16 => read_i16;
    i32 => read_i32;
    i64 => read_i64;
    u8 => read_u8;
    u16 => read_u16;
    u32 => read_u32;
    u64 => read_u64;
    f32 => read_f32;
    f64 => read_f64;
}

/// Read-only view of a vector inside a finished buffer
#[derive(Debug, Clone, Copy)]
pub struct Vector<'a> {
    buf: &'a [u8],
    /// Position of the first element
    start: usize,
    len: usize,
}

impl<'a> Vector<'a> {
    /// Parse the vector whose length prefix sits at `pos`
    fn parse(buf: &'a [u8], pos: usize) -> Result<Self> {
        let len = read_u32(buf, pos)? as usize;
        Ok(Self {
            buf,
            start: pos + 4,
            len,
        })
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the first element
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Scalar element at `index`, or None past the end
    pub fn get<T: Scalar>(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let pos = index.checked_mul(T::SIZE)?.checked_add(self.start)?;
        read_scalar(self.buf, pos).ok()
    }

    /// Elements as raw bytes (for byte vectors and strings)
    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        self.buf
            .get(self.start..self.start.saturating_add(self.len))
            .ok_or_else(|| {
                CodecError::invalid_flatbuffer(format!(
                    "vector data extends past buffer: {} + {} > {}",
                    self.start,
                    self.len,
                    self.buf.len()
                ))
            })
    }

    /// Table referenced by the element at `index` (vector of tables)
    pub fn table(&self, index: usize) -> Result<Option<Table<'a>>> {
        match self.element_target(index)? {
            Some(pos) => Table::new(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }

    /// String referenced by the element at `index` (vector of strings)
    pub fn str(&self, index: usize) -> Result<Option<&'a str>> {
        let Some(pos) = self.element_target(index)? else {
            return Ok(None);
        };
        let bytes = Vector::parse(self.buf, pos)?.as_bytes()?;
        std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Iterate a vector of tables
    pub fn tables(&self) -> impl Iterator<Item = Result<Table<'a>>> + '_ {
        (0..self.len).filter_map(|index| self.table(index).transpose())
    }

    fn element_target(&self, index: usize) -> Result<Option<usize>> {
        if index >= self.len {
            return Ok(None);
        }
        let pos = index
            .checked_mul(4)
            .and_then(|off| off.checked_add(self.start))
            .ok_or_else(|| CodecError::invalid_flatbuffer("vector element offset overflow"))?;
        follow_uoffset(self.buf, pos).map(Some)
    }
}

/// Resolve the uoffset stored at `pos` (relative to `pos` itself)
fn follow_uoffset(buf: &[u8], pos: usize) -> Result<usize> {
    let rel = read_u32(buf, pos)? as usize;
    let target = pos
        .checked_add(rel)
        .ok_or_else(|| CodecError::invalid_flatbuffer("offset overflow"))?;
    if target >= buf.len() {
        return Err(CodecError::invalid_flatbuffer(format!(
            "offset {} exceeds buffer length {}",
            target,
            buf.len()
        )));
    }
    Ok(target)
}

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;
