//! Sending and receiving kvlink messages over TCP.
//!
//! A [`Sender`] opens one connection per message, writes a single frame and
//! closes. A [`Receiver`] accepts any number of such connections, decodes
//! each message on a worker thread and reports it to its
//! [`ReceiverHandler`]s.

pub mod error;
pub mod events;
mod pool;
pub mod receiver;
pub mod sender;

pub use error::{EndpointError, Result};
pub use events::{ReceiverEvent, ReceiverHandler};
pub use receiver::{
    Receiver, ReceiverConfig, ReceiverState, StopHandle, DEFAULT_WORKERS,
    DEFAULT_WORKER_KEEP_ALIVE,
};
pub use sender::{Sender, SenderConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_ID_FIELD};
