//! `tokio-util` codec over the same wire format as [`FrameReader`](crate::FrameReader).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, FrameConfig, WireFrame};
use crate::error::{FrameError, Result};

/// Frame codec for `Framed`/`FramedRead`/`FramedWrite`.
///
/// End-of-stream markers are yielded like any other frame; check
/// [`WireFrame::is_end_of_stream`].
#[derive(Debug, Clone, Default)]
pub struct WireCodec {
    config: FrameConfig,
}

impl WireCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for WireCodec {
    type Item = WireFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<WireFrame>> {
        decode_frame(src, &self.config)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<WireFrame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<WireFrame> for WireCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: WireFrame, dst: &mut BytesMut) -> Result<()> {
        if frame.header.len() > self.config.max_header_size {
            return Err(FrameError::HeaderTooLarge {
                size: frame.header.len(),
                max: self.config.max_header_size,
            });
        }
        if frame.payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.config.max_payload_size,
            });
        }
        encode_frame(&frame.header, &frame.payload, dst)
    }
}
