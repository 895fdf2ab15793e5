//! Chunked byte buffers, cursors, and wire codecs shared by every other
//! `openrti-*` crate.
//!
//! - [`blob::VariableLengthData`] is the copy-on-write byte blob.
//! - [`buffer::Buffer`] / [`buffer::ChunkCursor`] model the non-contiguous
//!   chunk chain used for scatter/gather socket I/O.
//! - [`codec`] provides the aligned/unaligned primitive accessors and
//!   LEB128 varints framed messages and the handshake envelope are built
//!   on.

pub mod blob;
pub mod buffer;
pub mod codec;
pub mod error;

pub use blob::VariableLengthData;
pub use buffer::{Buffer, ChunkCursor};
pub use codec::{varint_len, DecodeCursor, EncodeCursor};
pub use error::{ProtocolError, ResourceError};
