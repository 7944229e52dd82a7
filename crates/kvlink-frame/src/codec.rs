use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use kvlink_codec::Message;

use crate::error::{FrameError, Result};

/// Length prefix: header length (4) + payload length (4) = 8 bytes.
pub const PREFIX_SIZE: usize = 8;

/// Default maximum header size: 1 MiB.
pub const DEFAULT_MAX_HEADER: usize = 1024 * 1024;

/// Default maximum payload size: 64 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// One framed message: UTF-8 header text plus binary payload.
///
/// A frame with an empty header is the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    /// Header bytes, `name:tag` entries joined by `;`.
    pub header: Bytes,
    /// Concatenated field payloads, in header order.
    pub payload: Bytes,
}

impl WireFrame {
    pub fn new(header: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            header: header.into(),
            payload: payload.into(),
        }
    }

    /// The end-of-stream marker (`header_len == 0`).
    pub fn end_of_stream() -> Self {
        Self::new(Bytes::new(), Bytes::new())
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.header.is_empty()
    }

    /// Encode `message` into a frame.
    pub fn from_message(message: &Message) -> kvlink_codec::Result<Self> {
        let (header, payload) = kvlink_codec::encode_message(message)?;
        Ok(Self::new(header.into_bytes(), payload.freeze()))
    }

    /// The header as text.
    pub fn header_text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.header)?)
    }

    /// Decode the message this frame carries.
    pub fn decode_message(&self) -> kvlink_codec::Result<Message> {
        let header = std::str::from_utf8(&self.header)?;
        kvlink_codec::decode_message(header, &self.payload)
    }

    /// The total wire size of this frame (prefix + header + payload).
    pub fn wire_size(&self) -> usize {
        PREFIX_SIZE + self.header.len() + self.payload.len()
    }
}

fn wire_len(which: &'static str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| FrameError::InvalidLength {
        which,
        len: i64::try_from(len).unwrap_or(i64::MAX),
    })
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────────┬─────────────────┬──────────────────┐
/// │ Header len   │ Payload len   │ Header          │ Payload          │
/// │ (4B LE i32)  │ (4B LE i32)   │ UTF-8 name:tag; │ field bytes      │
/// └──────────────┴───────────────┴─────────────────┴──────────────────┘
/// ```
pub fn encode_frame(header: &[u8], payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header_len = wire_len("header", header.len())?;
    let payload_len = wire_len("payload", payload.len())?;
    dst.reserve(PREFIX_SIZE + header.len() + payload.len());
    dst.put_i32_le(header_len);
    dst.put_i32_le(payload_len);
    dst.put_slice(header);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Limits are checked
/// as soon as the prefix is buffered, before waiting for the body.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<WireFrame>> {
    if src.len() < PREFIX_SIZE {
        return Ok(None);
    }

    let mut prefix = &src[..PREFIX_SIZE];
    let header_len = prefix.get_i32_le();
    let payload_len = prefix.get_i32_le();

    let header_len = usize::try_from(header_len).map_err(|_| FrameError::InvalidLength {
        which: "header",
        len: header_len.into(),
    })?;
    let payload_len = usize::try_from(payload_len).map_err(|_| FrameError::InvalidLength {
        which: "payload",
        len: payload_len.into(),
    })?;

    if header_len > config.max_header_size {
        return Err(FrameError::HeaderTooLarge {
            size: header_len,
            max: config.max_header_size,
        });
    }
    if payload_len > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: config.max_payload_size,
        });
    }

    let total = PREFIX_SIZE + header_len + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(PREFIX_SIZE);
    let header = src.split_to(header_len).freeze();
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(WireFrame { header, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum header size in bytes. Default: 1 MiB.
    pub max_header_size: usize,
    /// Maximum payload size in bytes. Default: 64 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_header_size: DEFAULT_MAX_HEADER,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
