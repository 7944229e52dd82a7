use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use kvlink_transport::WireStream;
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig, WireFrame};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Each frame goes out as one contiguous buffer; no write is ever issued
/// for zero bytes.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &WireFrame) -> Result<()> {
        self.send(frame.header.as_ref(), frame.payload.as_ref())
    }

    /// Write the end-of-stream marker.
    pub fn write_end_of_stream(&mut self) -> Result<()> {
        self.send(&[], &[])
    }

    /// Encode and send a header and payload.
    pub fn send(&mut self, header: &[u8], payload: &[u8]) -> Result<()> {
        if header.len() > self.config.max_header_size {
            return Err(FrameError::HeaderTooLarge {
                size: header.len(),
                max: self.config.max_header_size,
            });
        }
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(header, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(bytes = offset, "frame written");

        self.flush()
    }

    /// Flush the underlying stream.
    ///
    /// Only `Interrupted` is retried. An expired write timeout surfaces as
    /// `WouldBlock` or `TimedOut` and is returned as [`FrameError::Io`].
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<WireStream> {
    /// Create a frame writer for a TCP stream and apply the write timeout
    /// from config.
    pub fn with_config_tcp(inner: WireStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Half-close the connection so the peer sees end-of-stream.
    pub fn finish(&mut self) -> Result<()> {
        self.flush()?;
        self.inner
            .shutdown_write()
            .map_err(transport_to_frame_error)
    }
}
