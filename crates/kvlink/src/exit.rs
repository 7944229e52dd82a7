use std::error::Error as _;
use std::fmt;

use kvlink_codec::CodecError;
use kvlink_endpoint::EndpointError;
use kvlink_frame::FrameError;
use kvlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidAddress { .. } => CliError::usage(format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    match err {
        EndpointError::InvalidArgument(_)
        | EndpointError::ConnectionFailed {
            source: TransportError::InvalidAddress { .. },
            ..
        } => CliError::usage(format!("{context}: {err}")),
        EndpointError::ConnectionFailed { .. } | EndpointError::AcceptFailed(_) => {
            // Both variants keep the io cause out of their own message.
            let cause = err
                .source()
                .map(|source| format!(": {source}"))
                .unwrap_or_default();
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}{cause}"))
        }
        EndpointError::Transport(err) => transport_error(context, err),
        EndpointError::Frame(err) => frame_error(context, err),
        EndpointError::Serialize(err) | EndpointError::Decode(err) => codec_error(context, err),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
