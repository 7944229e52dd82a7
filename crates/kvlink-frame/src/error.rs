/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A length prefix is negative or does not fit the wire's Int32 field.
    #[error("invalid {which} length {len}")]
    InvalidLength { which: &'static str, len: i64 },

    /// The header exceeds the configured maximum size.
    #[error("header too large ({size} bytes, max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// Bytes followed the single frame a connection may carry.
    #[error("{count} unexpected bytes after the frame")]
    TrailingBytes { count: usize },

    /// Header bytes are not valid UTF-8.
    #[error("frame header is not valid UTF-8: {0}")]
    InvalidHeaderText(#[from] std::str::Utf8Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
