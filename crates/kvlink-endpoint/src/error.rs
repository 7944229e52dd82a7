use kvlink_codec::CodecError;
use kvlink_frame::FrameError;
use kvlink_transport::TransportError;

/// Errors that can occur in sender and receiver operations.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// A call-boundary precondition was violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `start` was called on a receiver that is not off.
    #[error("receiver is already running")]
    AlreadyRunning,

    /// The receiver is not running.
    #[error("receiver is not running")]
    NotRunning,

    /// Opening the outgoing connection failed.
    #[error("connection to {addr} failed")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: TransportError,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The outgoing message could not be encoded.
    #[error("failed to serialize message")]
    Serialize(#[source] CodecError),

    /// A received message could not be decoded.
    #[error("failed to decode message: {0}")]
    Decode(#[source] CodecError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The accept loop failed while running.
    #[error("accept loop failed: {0}")]
    AcceptFailed(#[source] TransportError),
}

pub type Result<T> = std::result::Result<T, EndpointError>;
