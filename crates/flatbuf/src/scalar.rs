//! Fixed-width little-endian scalars
//!
//! Every value the codec puts on the wire goes through [`Scalar`]: the
//! builder uses `SIZE` for alignment and `write_le` to place the bytes,
//! the reader uses `read_le` to decode them in place.

use crate::{CodecError, Result};

/// A fixed-width value with a little-endian wire encoding
pub trait Scalar: Copy + PartialEq + Sized {
    /// Encoded size in bytes (also the alignment requirement)
    const SIZE: usize;

    /// Write the little-endian bytes into `dst` (exactly `SIZE` long)
    fn write_le(self, dst: &mut [u8]);

    /// Decode from `src` (exactly `SIZE` long)
    fn read_le(src: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_le(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(src: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(src);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Booleans travel as a single 0/1 byte; any non-zero byte reads as true.
impl Scalar for bool {
    const SIZE: usize = 1;

    #[inline]
    fn write_le(self, dst: &mut [u8]) {
        dst[0] = u8::from(self);
    }

    #[inline]
    fn read_le(src: &[u8]) -> Self {
        src[0] != 0
    }
}

// =============================================================================
// Bounds-checked slice readers
// =============================================================================

/// Read a scalar at `offset`, failing if it would run past the end of `buf`
#[inline]
pub(crate) fn read_scalar<T: Scalar>(buf: &[u8], offset: usize) -> Result<T> {
    let end = offset
        .checked_add(T::SIZE)
        .ok_or_else(|| CodecError::invalid_flatbuffer("offset overflow"))?;
    if end > buf.len() {
        return Err(CodecError::too_short(end, buf.len()));
    }
    Ok(T::read_le(&buf[offset..end]))
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    read_scalar(buf, offset)
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    read_scalar(buf, offset)
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    read_scalar(buf, offset)
}
