//! Typed key-value messages over framed TCP connections.
//!
//! A message is an ordered list of named, typed fields. kvlink encodes it as a
//! text header plus a binary payload, frames the pair with two Int32 length
//! prefixes and delivers it over a short-lived TCP connection.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listener and stream wrappers
//! - [`codec`]: value kinds, the type registry and message encoding
//! - [`frame`]: length-prefixed framing of header/payload pairs
//! - [`endpoint`]: sender and multi-client receiver (behind `endpoint` feature)

/// Re-export transport types.
pub mod transport {
    pub use kvlink_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use kvlink_codec::*;
}

/// Re-export frame types.
pub mod frame {
    pub use kvlink_frame::*;
}

/// Re-export endpoint types (requires `endpoint` feature).
#[cfg(feature = "endpoint")]
pub mod endpoint {
    pub use kvlink_endpoint::*;
}

pub use kvlink_codec::{IntoMessage, Message, Value};
#[cfg(feature = "endpoint")]
pub use kvlink_endpoint::{Receiver, ReceiverConfig, ReceiverEvent, ReceiverHandler, Sender};
