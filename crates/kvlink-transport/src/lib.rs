//! TCP transport for kvlink.
//!
//! This is the lowest layer of kvlink. It owns socket setup only:
//! - [`TcpTransport`] binds a listening socket and accepts connections
//! - [`TcpTransport::connect`] opens an outgoing connection
//! - [`WireStream`] is the connected stream every upper layer reads and writes
//!
//! Nothing here knows about frames or messages.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::WireStream;
pub use tcp::TcpTransport;
