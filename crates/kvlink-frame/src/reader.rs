use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use kvlink_transport::WireStream;
use tracing::trace;

use crate::codec::{decode_frame, FrameConfig, WireFrame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` at end-of-stream: the peer closed before sending
    /// any byte of a new frame, or sent the end-of-stream marker. A close
    /// part-way through a frame is `FrameError::ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Option<WireFrame>> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, &self.config)? {
                if frame.is_end_of_stream() {
                    trace!("end-of-stream marker");
                    return Ok(None);
                }
                trace!(
                    header_len = frame.header.len(),
                    payload_len = frame.payload.len(),
                    "frame complete"
                );
                return Ok(Some(frame));
            }

            if self.fill()? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(FrameError::ConnectionClosed);
            }
        }
    }

    /// Require the peer to close without sending anything more.
    ///
    /// Any buffered or newly arriving byte is `FrameError::TrailingBytes`.
    pub fn expect_eof(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            return Err(FrameError::TrailingBytes {
                count: self.buf.len(),
            });
        }
        match self.fill()? {
            0 => Ok(()),
            count => Err(FrameError::TrailingBytes { count }),
        }
    }

    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<WireStream> {
    /// Create a frame reader for a TCP stream and apply the read timeout
    /// from config.
    pub fn with_config_tcp(inner: WireStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: kvlink_transport::TransportError) -> FrameError {
    match err {
        kvlink_transport::TransportError::Io(io)
        | kvlink_transport::TransportError::Accept(io) => FrameError::Io(io),
        kvlink_transport::TransportError::Bind { source, .. }
        | kvlink_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use kvlink_codec::{Matrix, Message};

    use super::*;
    use crate::codec::encode_frame;

    fn wire_for(message: &Message) -> Vec<u8> {
        let frame = WireFrame::from_message(message).unwrap();
        let mut wire = BytesMut::new();
        encode_frame(&frame.header, &frame.payload, &mut wire).unwrap();
        wire.to_vec()
    }

    fn sample() -> Message {
        Message::new()
            .with("name", "abc")
            .with("grid", Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap())
            .with("tags", vec![0u8; 300])
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire_for(&sample())));
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.decode_message().unwrap(), sample());
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn byte_by_byte_matches_whole() {
        let wire = wire_for(&sample());

        let mut whole = FrameReader::new(Cursor::new(wire.clone()));
        let expected = whole.read_frame().unwrap().unwrap();

        let mut slow = FrameReader::new(ByteByByteReader {
            bytes: wire,
            pos: 0,
        });
        let frame = slow.read_frame().unwrap().unwrap();

        assert_eq!(frame, expected);
        assert_eq!(frame.decode_message().unwrap(), sample());
        slow.expect_eof().unwrap();
    }

    #[test]
    fn read_frame_with_large_payload() {
        let message = Message::new().with("blob", vec![0xABu8; 64 * 1024]);
        let mut reader = FrameReader::new(Cursor::new(wire_for(&message)));
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.payload.len(), 64 * 1024);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn end_of_stream_marker_is_clean_close() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8; 8]));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn connection_closed_mid_prefix() {
        let mut reader = FrameReader::new(Cursor::new(vec![5u8, 0, 0]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_i32_le(3);
        partial.put_i32_le(16);
        partial.put_slice(b"a:b16only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn trailing_bytes_after_frame() {
        let mut wire = wire_for(&sample());
        wire.extend_from_slice(b"junk");

        let mut reader = FrameReader::new(Cursor::new(wire));
        reader.read_frame().unwrap().unwrap();
        let err = reader.expect_eof().unwrap_err();
        assert!(matches!(err, FrameError::TrailingBytes { count: 4 }));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(4);
        wire.put_i32_le(1024);

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = FlakyReader {
            first: Some(ErrorKind::WouldBlock),
            bytes: wire_for(&sample()),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = FlakyReader {
            first: Some(ErrorKind::Interrupted),
            bytes: wire_for(&sample()),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap().unwrap();
        assert_eq!(frame.decode_message().unwrap(), sample());
    }

    struct FlakyReader {
        first: Option<ErrorKind>,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.first.take() {
                return Err(std::io::Error::from(kind));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn roundtrip_over_tcp() {
        let listener = kvlink_transport::TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().to_string();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let cfg = FrameConfig {
                read_timeout: Some(std::time::Duration::from_secs(5)),
                ..FrameConfig::default()
            };
            let mut reader = FrameReader::with_config_tcp(stream, cfg).unwrap();
            let frame = reader.read_frame().unwrap().unwrap();
            reader.expect_eof().unwrap();
            frame.decode_message().unwrap()
        });

        let stream = kvlink_transport::TcpTransport::connect(&addr, None).unwrap();
        let mut writer = crate::writer::FrameWriter::new(stream);
        writer
            .write_frame(&WireFrame::from_message(&sample()).unwrap())
            .unwrap();
        writer.finish().unwrap();

        assert_eq!(server.join().unwrap(), sample());
    }
}
