//! Length-prefixed header/payload framing for kvlink.
//!
//! Every message travels as one frame:
//! - A 4-byte little-endian header length
//! - A 4-byte little-endian payload length
//! - The UTF-8 header (`name:tag` entries joined by `;`)
//! - The payload bytes
//!
//! A header length of zero marks end-of-stream. No partial reads, no buffer
//! management in user code.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::WireCodec;
pub use codec::{
    decode_frame, encode_frame, FrameConfig, WireFrame, DEFAULT_MAX_HEADER, DEFAULT_MAX_PAYLOAD,
    PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
