use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use kvlink_codec::{IntoMessage, Message};
use kvlink_frame::{FrameConfig, FrameWriter, WireFrame};
use kvlink_transport::TcpTransport;
use tracing::debug;

use crate::error::{EndpointError, Result};

/// Default connect timeout for outgoing connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default name of the field [`Sender::send_with_request_id`] stamps.
pub const DEFAULT_REQUEST_ID_FIELD: &str = "rid";

/// Sender behavior configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Connect timeout; `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Frame limits and write timeout.
    pub frame: FrameConfig,
    /// Field carrying the request id.
    pub request_id_field: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            frame: FrameConfig::default(),
            request_id_field: DEFAULT_REQUEST_ID_FIELD.to_string(),
        }
    }
}

/// Sends one message per connection to a fixed receiver address.
#[derive(Debug)]
pub struct Sender {
    addr: String,
    config: SenderConfig,
    next_request_id: AtomicI32,
}

impl Sender {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_config(host, port, SenderConfig::default())
    }

    pub fn with_config(host: &str, port: u16, config: SenderConfig) -> Result<Self> {
        let addr = endpoint_addr(host, port)?;
        Ok(Self {
            addr,
            config,
            next_request_id: AtomicI32::new(1),
        })
    }

    /// `host:port` this sender connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Encode `message`, connect, write one frame and close.
    ///
    /// The message is fully encoded before connecting, so an encoding failure
    /// never opens a connection.
    pub fn send(&self, message: &Message) -> Result<()> {
        if message.is_empty() {
            return Err(EndpointError::InvalidArgument(
                "an empty message cannot be framed".to_string(),
            ));
        }
        let frame = WireFrame::from_message(message).map_err(EndpointError::Serialize)?;

        let stream = TcpTransport::connect(&self.addr, self.config.connect_timeout).map_err(
            |source| EndpointError::ConnectionFailed {
                addr: self.addr.clone(),
                source,
            },
        )?;
        stream.set_nodelay(true)?;
        let mut writer = FrameWriter::with_config_tcp(stream, self.config.frame.clone())?;
        writer.write_frame(&frame)?;
        writer.finish()?;

        debug!(
            addr = %self.addr,
            fields = message.len(),
            bytes = frame.wire_size(),
            "message sent"
        );
        Ok(())
    }

    /// Stamp `message` with the next request id and send it.
    ///
    /// Ids start at 1 and increase by one per call on this sender. The id is
    /// consumed even if the send fails.
    pub fn send_with_request_id(&self, mut message: Message) -> Result<i32> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        message.insert(self.config.request_id_field.as_str(), id);
        self.send(&message)?;
        Ok(id)
    }

    /// Send anything convertible into a message.
    pub fn send_object<T: IntoMessage>(&self, object: T) -> Result<()> {
        self.send(&object.into_message())
    }
}

/// Validate a host/port pair and render it as a connectable address.
pub(crate) fn endpoint_addr(host: &str, port: u16) -> Result<String> {
    if host.trim().is_empty() {
        return Err(EndpointError::InvalidArgument(
            "host must not be empty".to_string(),
        ));
    }
    if port == 0 {
        return Err(EndpointError::InvalidArgument(
            "port must be positive".to_string(),
        ));
    }
    if host.contains(':') && !host.starts_with('[') {
        return Ok(format!("[{host}]:{port}"));
    }
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use kvlink_codec::CodecError;

    use super::*;

    #[test]
    fn rejects_invalid_endpoints() {
        assert!(matches!(
            Sender::new("", 7007),
            Err(EndpointError::InvalidArgument(_))
        ));
        assert!(matches!(
            Sender::new("localhost", 0),
            Err(EndpointError::InvalidArgument(_))
        ));
    }

    #[test]
    fn formats_addresses() {
        assert_eq!(Sender::new("localhost", 7007).unwrap().addr(), "localhost:7007");
        assert_eq!(Sender::new("::1", 80).unwrap().addr(), "[::1]:80");
        assert_eq!(Sender::new("[::1]", 80).unwrap().addr(), "[::1]:80");
    }

    #[test]
    fn empty_message_is_rejected_before_connecting() {
        let sender = Sender::new("127.0.0.1", 9).unwrap();
        let err = sender.send(&Message::new()).unwrap_err();
        assert!(matches!(err, EndpointError::InvalidArgument(_)));
    }

    #[test]
    fn encoding_failure_is_serialize_error() {
        let sender = Sender::new("127.0.0.1", 9).unwrap();
        let err = sender.send(&Message::new().with("bad;name", 1)).unwrap_err();
        assert!(matches!(
            err,
            EndpointError::Serialize(CodecError::InvalidFieldName(_))
        ));
        assert_eq!(err.to_string(), "failed to serialize message");
    }

    #[test]
    fn refused_connection_is_connection_failed() {
        let port = {
            let scratch = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            scratch.local_addr().unwrap().port()
        };
        let sender = Sender::new("127.0.0.1", port).unwrap();
        let err = sender.send(&Message::new().with("a", 1)).unwrap_err();
        assert!(matches!(err, EndpointError::ConnectionFailed { .. }));
    }

    #[test]
    fn request_ids_increase_even_on_failure() {
        let port = {
            let scratch = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            scratch.local_addr().unwrap().port()
        };
        let sender = Sender::new("127.0.0.1", port).unwrap();
        assert!(sender.send_with_request_id(Message::new()).is_err());
        assert!(sender.send_with_request_id(Message::new()).is_err());
        assert_eq!(sender.next_request_id.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn custom_request_id_field_is_used() {
        let config = SenderConfig {
            request_id_field: "seq".to_string(),
            ..SenderConfig::default()
        };
        let sender = Sender::with_config("localhost", 1, config).unwrap();
        assert_eq!(sender.config().request_id_field, "seq");
    }
}
