//! Codec error types
//!
//! Errors that can occur when building or reading FlatBuffer messages.

use thiserror::Error;

/// Errors that can occur during codec operations
#[derive(Debug, Error)]
pub enum CodecError {
    /// `object_begin` called while another object is still open
    #[error("an object is already being built")]
    NestedObject,

    /// Field write or `object_end` without a matching `object_begin`
    #[error("no object is being built")]
    NotInObject,

    /// `finish` called while an object is still open
    #[error("cannot finish while an object is open")]
    ObjectOpen,

    /// Field index outside the range declared in `object_begin`
    #[error("field index {field} out of range: object declares {num_fields} fields")]
    FieldOutOfRange { field: usize, num_fields: usize },

    /// Vtable for this many fields would not fit a 16-bit size
    #[error("too many fields for one object: {0}")]
    TooManyFields(usize),

    /// Offset refers to data that has not been written yet
    #[error("invalid offset {offset}: buffer length is {len}")]
    InvalidOffset { offset: u32, len: usize },

    /// Builder already produced its root offset
    #[error("builder already finished")]
    AlreadyFinished,

    /// Finished data requested before `finish`
    #[error("builder not finished")]
    NotFinished,

    /// Object (or a field delta inside it) exceeds the 16-bit voffset range
    #[error("object too large: {size} bytes exceeds voffset range")]
    ObjectTooLarge { size: usize },

    /// Buffer would exceed the configured or wire-format maximum
    #[error("buffer overflow: message size {size} exceeds maximum {max}")]
    BufferOverflow { size: usize, max: usize },

    /// Allocation failed while growing the buffer
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Message is too short to contain the value being read
    #[error("message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort { expected: usize, actual: usize },

    /// Invalid FlatBuffer structure
    #[error("invalid flatbuffer: {0}")]
    InvalidFlatBuffer(String),

    /// String field is not valid UTF-8
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Builder configuration rejected
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl CodecError {
    /// Create a message too short error
    #[inline]
    pub fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Create an invalid flatbuffer error
    #[inline]
    pub fn invalid_flatbuffer(msg: impl Into<String>) -> Self {
        Self::InvalidFlatBuffer(msg.into())
    }

    /// Create a field out of range error
    #[inline]
    pub fn field_out_of_range(field: usize, num_fields: usize) -> Self {
        Self::FieldOutOfRange { field, num_fields }
    }

    /// Create a buffer overflow error
    #[inline]
    pub fn buffer_overflow(size: usize, max: usize) -> Self {
        Self::BufferOverflow { size, max }
    }

    /// Create an invalid config error
    #[inline]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Check if this is a usage error (the builder state is unchanged and
    /// the caller may continue with a corrected call)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NestedObject
                | Self::NotInObject
                | Self::ObjectOpen
                | Self::FieldOutOfRange { .. }
                | Self::TooManyFields(_)
                | Self::InvalidOffset { .. }
                | Self::NotFinished
        )
    }
}
