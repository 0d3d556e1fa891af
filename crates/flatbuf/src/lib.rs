//! Agent FlatBuffers codec
//!
//! Builds and reads the binary payloads the agent exchanges with its local
//! daemon. The encoding is the public FlatBuffers wire format, produced
//! and parsed directly without schemas or code generation:
//! - `Builder` - back-to-front message builder with vtable deduplication
//! - `Table` / `Vector` - zero-copy readers over a finished message
//! - `AbsOffset` / `RelOffset` / `VOffset` - the three wire offset kinds
//! - `VtableCache` - pluggable vtable deduplication strategy
//!
//! # Design Principles
//!
//! - **Zero-copy reads**: tables borrow the message buffer, nothing is unpacked
//! - **No raw pointers**: the builder hands out back-relative offsets that
//!   survive buffer growth, never references into the buffer
//! - **Errors, not aborts**: misuse, wire-format limits and allocation
//!   failure all surface as `CodecError`
//!
//! The field layout of each message (index, meaning and default of every
//! field) is shared knowledge between producer and consumer and lives
//! outside this crate.

mod arena;
mod builder;
mod config;
mod error;
mod offset;
mod scalar;
mod table;
mod vtable;

pub use arena::Arena;
pub use builder::Builder;
pub use config::{BuilderConfig, DEFAULT_INITIAL_CAPACITY};
pub use error::CodecError;
pub use offset::{AbsOffset, RelOffset, VOffset};
pub use scalar::Scalar;
pub use table::{Table, Vector};
pub use vtable::{HashedVtables, LinearScan, VtableCache};

// Re-export bytes for convenience
pub use bytes::Bytes;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Largest buffer the format can address (offsets are signed 32-bit)
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;
