use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::WireStream;

/// Timeout for the loopback connection used to wake a blocked `accept`.
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP listening socket.
///
/// Provides bind/accept over IPv4 and IPv6 and the outgoing [`connect`].
///
/// [`connect`]: TcpTransport::connect
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `addr` (`host:port`). Port 0 picks an ephemeral port.
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        info!(%local_addr, "listening on tcp socket");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(WireStream, SocketAddr)> {
        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%addr, "accepted connection");
        Ok((WireStream::from_tcp(stream), addr))
    }

    /// Connect to a listening socket (blocking).
    ///
    /// With a timeout, every resolved address is tried in turn and the last
    /// failure is reported.
    pub fn connect(addr: &str, timeout: Option<Duration>) -> Result<WireStream> {
        let connect_err = |source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        };

        let stream = match timeout {
            None => TcpStream::connect(addr).map_err(connect_err)?,
            Some(timeout) => {
                let candidates = addr.to_socket_addrs().map_err(|e| invalid_address(addr, e))?;
                let mut last_err = None;
                let mut connected = None;
                for candidate in candidates {
                    match TcpStream::connect_timeout(&candidate, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match (connected, last_err) {
                    (Some(stream), _) => stream,
                    (None, Some(err)) => return Err(connect_err(err)),
                    (None, None) => {
                        return Err(TransportError::InvalidAddress {
                            addr: addr.to_string(),
                            reason: "address resolved to nothing".to_string(),
                        })
                    }
                }
            }
        };

        debug!(addr, "connected to tcp socket");
        Ok(WireStream::from_tcp(stream))
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address a local client can use to reach this listener.
    ///
    /// A wildcard bind (`0.0.0.0`, `::`) is reached through loopback.
    pub fn wake_addr(&self) -> SocketAddr {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.local_addr.port())
    }

    /// Unblock a thread parked in [`accept`](Self::accept) on the listener
    /// at `addr` by opening and immediately dropping a connection.
    pub fn wake(addr: SocketAddr) -> Result<()> {
        let stream =
            TcpStream::connect_timeout(&addr, WAKE_TIMEOUT).map_err(|e| TransportError::Connect {
                addr: addr.to_string(),
                source: e,
            })?;
        drop(stream);
        debug!(%addr, "woke listener");
        Ok(())
    }
}

fn invalid_address(addr: &str, err: std::io::Error) -> TransportError {
    TransportError::InvalidAddress {
        addr: addr.to_string(),
        reason: err.to_string(),
    }
}
