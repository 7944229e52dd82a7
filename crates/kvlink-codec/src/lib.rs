//! Self-describing typed key-value codec.
//!
//! Every field of a [`Message`] travels as a `name:tag` entry in a text
//! header plus a run of bytes in a binary payload. The tag names the value
//! kind and, for variable-length kinds, the exact number of payload bytes:
//!
//! ```text
//! n        null (0 bytes)          s<N>    UTF-8 string
//! b        bool (1 byte)           b<N>    raw bytes
//! i        Int32 LE (4 bytes)      i<N>    Int32 array       mi<N> / mmi<N>
//! d        Float64 LE (8 bytes)    d<N>    Float64 array     md<N> / mmd<N>
//! ```
//!
//! Matrix (`m`) and tensor (`mm`) payloads start with their Int32
//! dimensions followed by the row-major elements.
//!
//! - [`bits`]: per-kind byte conversions
//! - [`registry`]: ordered descriptor table resolving values and tags
//! - [`message`]: header/payload encoding of whole messages

pub mod bits;
pub mod error;
pub mod message;
pub mod registry;
pub mod value;

pub use error::{CodecError, Result};
pub use message::{decode_message, encode_message, IntoMessage, Message};
pub use registry::{Descriptor, TypeRegistry, DESCRIPTORS};
pub use value::{Matrix, Tensor, Value, ValueKind};
