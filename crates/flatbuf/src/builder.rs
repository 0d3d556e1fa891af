//! FlatBuffer message builder
//!
//! Encodes scalars, vectors, strings and tables into a single buffer,
//! written back-to-front so that every reference points at data that
//! already exists.
//!
//! # Producer contract
//!
//! ```ignore
//! use agent_flatbuf::Builder;
//!
//! let mut fb = Builder::new();
//!
//! // children first: strings, vectors and nested tables
//! let name = fb.prepend_string("WebTransaction/Uri/index")?;
//!
//! fb.object_begin(3)?;
//! fb.object_prepend_u32(0, 42, 0)?;
//! fb.object_prepend_uoffset(1, name)?;
//! fb.object_prepend_bool(2, true, false)?;
//! let root = fb.object_end()?;
//!
//! fb.finish(root)?;
//! send(fb.finished_data()?);
//! ```
//!
//! Only one object may be open at a time. Nest by finishing the child
//! (keeping its offset) before opening the parent.

use bytes::Bytes;

use crate::arena::{Arena, pad_for};
use crate::config::BuilderConfig;
use crate::scalar::Scalar;
use crate::vtable::{LinearScan, VTABLE_HEADER_SIZE, VtableCache};
use crate::{AbsOffset, CodecError, MAX_BUFFER_SIZE, RelOffset, Result, VOffset};

/// Size of a `uoffset` / `soffset` on the wire
const OFFSET_SIZE: usize = 4;

/// Largest field count whose vtable size still fits a u16
const MAX_FIELDS: usize = (u16::MAX as usize - VTABLE_HEADER_SIZE) / 2;

/// Single-owner builder for one FlatBuffer message
///
/// The type parameter selects the vtable deduplication strategy;
/// [`LinearScan`] is right for messages built from a handful of
/// repeated object shapes.
#[derive(Debug)]
pub struct Builder<C: VtableCache = LinearScan> {
    arena: Arena,
    /// Largest alignment seen since the last reset
    min_align: usize,
    inside_object: bool,
    /// Builder length when the open object began
    object_end: AbsOffset,
    /// Per-field write positions of the open object (None = omitted)
    vtable: Vec<Option<AbsOffset>>,
    vtables: C,
    max_size: usize,
    finished: bool,
}

impl Builder<LinearScan> {
    /// Create an empty builder; the buffer is allocated on first write
    pub fn new() -> Self {
        Self::from_parts(Arena::default(), LinearScan::new(), MAX_BUFFER_SIZE)
    }

    /// Create a builder with `capacity` bytes preallocated
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_cache(LinearScan::new(), capacity)
    }

    /// Create a builder from validated configuration
    pub fn from_config(config: &BuilderConfig) -> Result<Self> {
        config.validate()?;
        let arena = Arena::with_capacity(config.initial_capacity)?;
        Ok(Self::from_parts(arena, LinearScan::new(), config.max_buffer_size))
    }
}

impl Default for Builder<LinearScan> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: VtableCache> Builder<C> {
    /// Create a builder with a custom vtable deduplication strategy
    pub fn with_cache(cache: C, capacity: usize) -> Result<Self> {
        if capacity > MAX_BUFFER_SIZE {
            return Err(CodecError::buffer_overflow(capacity, MAX_BUFFER_SIZE));
        }
        let arena = Arena::with_capacity(capacity)?;
        Ok(Self::from_parts(arena, cache, MAX_BUFFER_SIZE))
    }

    fn from_parts(arena: Arena, vtables: C, max_size: usize) -> Self {
        Self {
            arena,
            min_align: 1,
            inside_object: false,
            object_end: AbsOffset::default(),
            vtable: Vec::new(),
            vtables,
            max_size: max_size.min(MAX_BUFFER_SIZE),
            finished: false,
        }
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Bytes currently allocated
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Largest alignment requirement seen so far
    #[inline]
    pub fn min_align(&self) -> usize {
        self.min_align
    }

    /// Number of distinct vtables emitted
    #[inline]
    pub fn vtable_count(&self) -> usize {
        self.vtables.len()
    }

    #[inline]
    pub fn is_inside_object(&self) -> bool {
        self.inside_object
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The used region, finished or not
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.arena.data()
    }

    /// Current length as an offset; a value written last is found here
    #[inline]
    pub fn offset(&self) -> Result<AbsOffset> {
        AbsOffset::from_len(self.arena.len())
    }

    /// Discard everything written, keeping the allocation for reuse
    pub fn reset(&mut self) {
        self.arena.clear();
        self.min_align = 1;
        self.inside_object = false;
        self.object_end = AbsOffset::default();
        self.vtable.clear();
        self.vtables.clear();
        self.finished = false;
    }

    // =========================================================================
    // Alignment and primitives
    // =========================================================================

    /// Reserve and pad so a `size`-byte value lands aligned once
    /// `additional` more bytes are written in front of it
    pub fn prep(&mut self, size: usize, additional: usize) -> Result<()> {
        if self.finished {
            return Err(CodecError::AlreadyFinished);
        }
        self.arena.prep(size, additional, self.max_size)?;
        self.min_align = self.min_align.max(size);
        Ok(())
    }

    /// Write an aligned scalar
    pub fn prepend<T: Scalar>(&mut self, value: T) -> Result<()> {
        self.prep(T::SIZE, 0)?;
        self.arena.place_scalar(value);
        Ok(())
    }

    /// Write a reference to already-written data
    ///
    /// The stored value is relative to the position just after the
    /// offset field itself.
    pub fn prepend_uoffset(&mut self, target: AbsOffset) -> Result<()> {
        if target.get() as usize > self.len() {
            return Err(CodecError::InvalidOffset {
                offset: target.get(),
                len: self.len(),
            });
        }
        self.prep(OFFSET_SIZE, 0)?;
        let relative = self.len() - target.get() as usize + OFFSET_SIZE;
        let relative = u32::try_from(relative)
            .map_err(|_| CodecError::buffer_overflow(relative, self.max_size))?;
        self.arena.place_scalar(relative);
        Ok(())
    }

    /// Write a signed object -> vtable offset
    pub fn prepend_soffset(&mut self, value: RelOffset) -> Result<()> {
        self.prepend(value.get())
    }

    // =========================================================================
    // Vectors and strings
    // =========================================================================

    /// Start a vector of `num_elems` elements of `elem_size` bytes each
    ///
    /// Elements are then prepended last-first, and the vector closed with
    /// [`vector_end`](Self::vector_end). Space for both alignment steps is
    /// reserved up front, so a failure writes no padding.
    pub fn vector_begin(&mut self, elem_size: usize, num_elems: usize, alignment: usize) -> Result<()> {
        if self.finished {
            return Err(CodecError::AlreadyFinished);
        }
        let max_size = self.max_size;
        let overflow = || CodecError::buffer_overflow(usize::MAX, max_size);
        let body = elem_size.checked_mul(num_elems).ok_or_else(overflow)?;

        let outer_pad = pad_for(self.len(), OFFSET_SIZE, body);
        let inner_pad = pad_for(self.len() + outer_pad, alignment, body);
        let needed = (outer_pad + inner_pad)
            .checked_add(alignment.max(OFFSET_SIZE))
            .and_then(|n| n.checked_add(body))
            .ok_or_else(overflow)?;
        self.arena.reserve(needed, self.max_size)?;

        self.prep(OFFSET_SIZE, body)?;
        self.prep(alignment, body)
    }

    /// Write the element count and return the vector's offset
    pub fn vector_end(&mut self, num_elems: usize) -> Result<AbsOffset> {
        let count = u32::try_from(num_elems)
            .map_err(|_| CodecError::buffer_overflow(num_elems, self.max_size))?;
        self.prepend(count)?;
        self.offset()
    }

    /// Write a string as a byte vector followed by a NUL terminator
    ///
    /// The terminator is not counted in the stored length.
    pub fn prepend_string(&mut self, s: &str) -> Result<AbsOffset> {
        self.prepend_bytes(s.as_bytes())
    }

    /// Write an opaque byte vector (NUL-terminated on the wire like strings)
    pub fn prepend_bytes(&mut self, src: &[u8]) -> Result<AbsOffset> {
        self.prepend_bytes_with(src.len(), |dst| dst.copy_from_slice(src))
    }

    /// Write a `len`-byte vector whose contents are produced in place by `fill`
    ///
    /// Capacity is ensured before `fill` runs, so the slice it receives stays
    /// valid for the whole call.
    pub fn prepend_bytes_with<F>(&mut self, len: usize, fill: F) -> Result<AbsOffset>
    where
        F: FnOnce(&mut [u8]),
    {
        let with_nul = len
            .checked_add(1)
            .ok_or_else(|| CodecError::buffer_overflow(usize::MAX, self.max_size))?;
        self.prep(OFFSET_SIZE, with_nul)?;
        self.arena.place(&[0]);
        fill(self.arena.claim(len));
        self.vector_end(len)
    }

    /// Write a vector of scalars
    pub fn prepend_vector<T: Scalar>(&mut self, items: &[T]) -> Result<AbsOffset> {
        self.vector_begin(T::SIZE, items.len(), T::SIZE)?;
        for &item in items.iter().rev() {
            self.prepend(item)?;
        }
        self.vector_end(items.len())
    }

    /// Write a vector of references (e.g. to tables or strings)
    pub fn prepend_offset_vector(&mut self, items: &[AbsOffset]) -> Result<AbsOffset> {
        self.vector_begin(OFFSET_SIZE, items.len(), OFFSET_SIZE)?;
        for &item in items.iter().rev() {
            self.prepend_uoffset(item)?;
        }
        self.vector_end(items.len())
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Open an object with `num_fields` field slots
    ///
    /// Fails without side effects if another object is open.
    pub fn object_begin(&mut self, num_fields: usize) -> Result<()> {
        if self.inside_object {
            tracing::debug!(num_fields, "object_begin rejected: object already open");
            return Err(CodecError::NestedObject);
        }
        if self.finished {
            return Err(CodecError::AlreadyFinished);
        }
        if num_fields > MAX_FIELDS {
            return Err(CodecError::TooManyFields(num_fields));
        }

        self.object_end = self.offset()?;
        self.vtable.clear();
        self.vtable.resize(num_fields, None);
        self.inside_object = true;
        Ok(())
    }

    fn check_field(&self, field: usize) -> Result<()> {
        if !self.inside_object {
            return Err(CodecError::NotInObject);
        }
        if field >= self.vtable.len() {
            tracing::debug!(field, num_fields = self.vtable.len(), "field index rejected");
            return Err(CodecError::field_out_of_range(field, self.vtable.len()));
        }
        Ok(())
    }

    /// Write a scalar field; values equal to `default` are omitted entirely
    pub fn object_prepend<T: Scalar>(&mut self, field: usize, value: T, default: T) -> Result<()> {
        self.check_field(field)?;
        if value == default {
            return Ok(());
        }
        self.prepend(value)?;
        let written_at = self.offset()?;
        self.vtable[field] = Some(written_at);
        Ok(())
    }

    /// Write a reference field pointing at a string, vector or table
    pub fn object_prepend_uoffset(&mut self, field: usize, target: AbsOffset) -> Result<()> {
        self.check_field(field)?;
        self.prepend_uoffset(target)?;
        let written_at = self.offset()?;
        self.vtable[field] = Some(written_at);
        Ok(())
    }

    /// Close the open object and return its offset
    ///
    /// Emits the object's vtable, or points the object at an identical
    /// vtable emitted earlier.
    ///
    /// On error nothing is written and the object stays open; an object
    /// rejected as too large can only be discarded with [`reset`](Self::reset).
    pub fn object_end(&mut self) -> Result<AbsOffset> {
        if !self.inside_object {
            return Err(CodecError::NotInObject);
        }

        // where the soffset slot will land once aligned
        let pad = pad_for(self.len(), OFFSET_SIZE, 0);
        let object_offset = AbsOffset::from_len(self.len() + pad + OFFSET_SIZE)?;

        let fields = self
            .vtable
            .iter()
            .map(|slot| match slot {
                Some(written_at) => object_offset.voffset_from(*written_at),
                None => Ok(VOffset::ABSENT),
            })
            .collect::<Result<Vec<_>>>()?;

        let object_size = (object_offset.get() - self.object_end.get()) as usize;
        let object_size = u16::try_from(object_size)
            .map_err(|_| CodecError::ObjectTooLarge { size: object_size })?;

        let existing = self.vtables.find(&self.arena, &fields);
        let vtable_bytes = match existing {
            Some(_) => 0,
            None => VTABLE_HEADER_SIZE + fields.len() * 2,
        };
        self.arena
            .reserve(pad + OFFSET_SIZE + vtable_bytes, self.max_size)?;

        // soffset placeholder; patched once the vtable position is known
        self.prepend(0i32)?;
        let vtable_at = match existing {
            Some(at) => at,
            None => self.emit_vtable(object_size, &fields)?,
        };

        self.arena
            .patch_scalar(object_offset, object_offset.soffset_to(vtable_at).get())?;

        self.vtable.clear();
        self.inside_object = false;
        Ok(object_offset)
    }

    /// Write `[vtable size][object size][field N-1]..[field 0]`, back to front
    fn emit_vtable(&mut self, object_size: u16, fields: &[VOffset]) -> Result<AbsOffset> {
        // bounded by MAX_FIELDS in object_begin
        let vtable_size = (VTABLE_HEADER_SIZE + fields.len() * 2) as u16;

        for field in fields.iter().rev() {
            self.prepend(field.get())?;
        }
        self.prepend(object_size)?;
        self.prepend(vtable_size)?;

        let at = self.offset()?;
        self.vtables.insert(fields, at);
        Ok(at)
    }

    // =========================================================================
    // Finishing
    // =========================================================================

    /// Write the root offset, completing the message
    ///
    /// The root slot is aligned to the largest alignment used anywhere in
    /// the message.
    pub fn finish(&mut self, root: AbsOffset) -> Result<()> {
        if self.finished {
            return Err(CodecError::AlreadyFinished);
        }
        if self.inside_object {
            return Err(CodecError::ObjectOpen);
        }
        if root.get() as usize > self.len() {
            return Err(CodecError::InvalidOffset {
                offset: root.get(),
                len: self.len(),
            });
        }

        // reserves the root slot too, so the uoffset write never grows
        self.prep(self.min_align.max(OFFSET_SIZE), OFFSET_SIZE)?;
        self.prepend_uoffset(root)?;
        self.finished = true;

        tracing::debug!(
            size = self.len(),
            vtables = self.vtables.len(),
            "flatbuffer message finished"
        );
        Ok(())
    }

    /// The complete message, starting with the root offset
    pub fn finished_data(&self) -> Result<&[u8]> {
        if !self.finished {
            return Err(CodecError::NotFinished);
        }
        Ok(self.arena.data())
    }

    /// Copy the complete message out, leaving the builder reusable
    pub fn finished_bytes(&self) -> Result<Bytes> {
        self.finished_data().map(Bytes::copy_from_slice)
    }

    /// Take ownership of the complete message without copying
    pub fn into_bytes(self) -> Result<Bytes> {
        if !self.finished {
            return Err(CodecError::NotFinished);
        }
        let (buf, head) = self.arena.into_parts();
        Ok(Bytes::from(buf).slice(head..))
    }
}

macro_rules! typed_prepends {
    ($($ty:ty => $prepend:ident, $object_prepend:ident;)*) => {
        impl<C: VtableCache> Builder<C> {
            $(
                #[doc = concat!("Write an aligned `", stringify!($ty), "`")]
                #[inline]
                pub fn $prepend(&mut self, value: $ty) -> Result<()> {
                    self.prepend(value)
                }

                #[doc = concat!("Write a `", stringify!($ty), "` field, omitted when equal to `default`")]
                #[inline]
                pub fn $object_prepend(&mut self, field: usize, value: $ty, default: $ty) -> Result<()> {
                    self.object_prepend(field, value, default)
                }
            )*
        }
    };
}

typed_prepends! {
    bool => prepend_bool, object_prepend_bool;
    i8 => prepend_i8, object_prepend_i8;
    i16 => prepend_i16, object_prepend_i16;
    i32 => prepend_i32, object_prepend_i32;
    i64 => prepend_i64, object_prepend_i64;
    u8 => prepend_u8, object_prepend_u8;
    u16 => prepend_u16, object_prepend_u16;
    u32 => prepend_u32, object_prepend_u32;
    u64 => prepend_u64, object_prepend_u64;
    f32 => prepend_f32, object_prepend_f32;
    f64 => prepend_f64, object_prepend_f64;
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
