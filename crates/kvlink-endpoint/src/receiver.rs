use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kvlink_frame::{FrameConfig, FrameReader};
use kvlink_transport::{TcpTransport, TransportError, WireStream};
use tracing::{debug, error, info, warn};

use crate::error::{EndpointError, Result};
use crate::events::ReceiverHandler;
use crate::pool::WorkerPool;
use crate::sender::endpoint_addr;

const OFF: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

/// Default number of connection workers kept alive while running.
pub const DEFAULT_WORKERS: usize = 8;

/// How long an extra worker waits for another connection before exiting.
pub const DEFAULT_WORKER_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Receiver configuration. Fixed once the receiver is constructed.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub host: String,
    pub port: u16,
    /// Threads kept ready to serve connections. More are started while
    /// every worker is busy.
    pub workers: usize,
    /// Idle time after which a worker beyond `workers` exits.
    pub worker_keep_alive: Duration,
    /// Frame limits and read timeout per connection.
    pub frame: FrameConfig,
}

impl ReceiverConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            workers: DEFAULT_WORKERS,
            worker_keep_alive: DEFAULT_WORKER_KEEP_ALIVE,
            frame: FrameConfig::default(),
        }
    }
}

/// Lifecycle state of a [`Receiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Off,
    Running,
    Stopping,
}

struct Shared {
    state: AtomicU8,
    next_client_id: AtomicU64,
    wake_addr: Mutex<Option<SocketAddr>>,
}

impl Shared {
    fn state(&self) -> ReceiverState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => ReceiverState::Running,
            STOPPING => ReceiverState::Stopping,
            _ => ReceiverState::Off,
        }
    }

    fn stop(&self) -> Result<()> {
        self.state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EndpointError::NotRunning)?;

        let wake_addr = *self.wake_addr.lock().unwrap_or_else(PoisonError::into_inner);
        info!("stopping receiver");
        if let Some(addr) = wake_addr {
            // The accept loop also exits on the next real connection.
            if let Err(err) = TcpTransport::wake(addr) {
                warn!(%addr, error = %err, "failed to wake accept loop");
            }
        }
        Ok(())
    }
}

/// Everything a connection worker needs.
struct Session {
    shared: Arc<Shared>,
    handlers: Arc<[Arc<dyn ReceiverHandler>]>,
    frame: FrameConfig,
}

impl Session {
    fn emit(&self, event: impl Fn(&dyn ReceiverHandler)) {
        for handler in self.handlers.iter() {
            event(handler.as_ref());
        }
    }
}

/// Stops a running [`Receiver`] from another thread.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    /// See [`Receiver::stop`].
    pub fn stop(&self) -> Result<()> {
        self.shared.stop()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state() == ReceiverState::Running
    }
}

/// Multi-client TCP listener delivering one message per connection.
///
/// ```text
/// OFF --start--> RUNNING --stop--> STOPPING --accept loop exits--> OFF
/// ```
///
/// The accept loop runs on its own thread and hands each connection to a
/// worker pool that grows while every worker is busy. Client ids come from a counter owned by the
/// receiver: they start at 1 and are never reused, even across restarts.
pub struct Receiver {
    config: ReceiverConfig,
    addr: String,
    handlers: Vec<Arc<dyn ReceiverHandler>>,
    shared: Arc<Shared>,
    local_addr: Option<SocketAddr>,
    accept_thread: Option<JoinHandle<Result<()>>>,
}

impl Receiver {
    /// Validate `config`. Nothing is bound until [`start`](Self::start).
    pub fn new(config: ReceiverConfig) -> Result<Self> {
        let addr = endpoint_addr(&config.host, config.port)?;
        if config.workers == 0 {
            return Err(EndpointError::InvalidArgument(
                "at least one worker is required".to_string(),
            ));
        }
        Ok(Self {
            config,
            addr,
            handlers: Vec::new(),
            shared: Arc::new(Shared {
                state: AtomicU8::new(OFF),
                next_client_id: AtomicU64::new(1),
                wake_addr: Mutex::new(None),
            }),
            local_addr: None,
            accept_thread: None,
        })
    }

    /// Register a handler. Handlers added while running take effect on the
    /// next start.
    pub fn subscribe(&mut self, handler: impl ReceiverHandler + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    /// Bind the listening socket and start accepting connections.
    pub fn start(&mut self) -> Result<()> {
        if self.shared.state() != ReceiverState::Off {
            return Err(EndpointError::AlreadyRunning);
        }
        if self.accept_thread.is_some() {
            // A previous run ended on its own; collect its outcome.
            if let Err(err) = self.wait() {
                warn!(error = %err, "previous accept loop ended with an error");
            }
        }

        let listener = TcpTransport::bind(&self.addr)?;
        let local_addr = listener.local_addr();
        let pool = WorkerPool::new(
            "kvlink-worker",
            self.config.workers,
            self.config.worker_keep_alive,
        )
        .map_err(TransportError::Io)?;

        let session = Arc::new(Session {
            shared: Arc::clone(&self.shared),
            handlers: self.handlers.iter().cloned().collect(),
            frame: self.config.frame.clone(),
        });

        *self
            .shared
            .wake_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener.wake_addr());
        self.shared.state.store(RUNNING, Ordering::Release);

        let spawned = thread::Builder::new()
            .name("kvlink-accept".to_string())
            .spawn(move || accept_loop(listener, pool, session));
        match spawned {
            Ok(handle) => {
                self.accept_thread = Some(handle);
                self.local_addr = Some(local_addr);
                info!(addr = %local_addr, workers = self.config.workers, "receiver started");
                Ok(())
            }
            Err(err) => {
                self.shared.state.store(OFF, Ordering::Release);
                Err(TransportError::Io(err).into())
            }
        }
    }

    /// Ask the accept loop to exit. Returns without waiting for it.
    ///
    /// Connections already accepted are served to completion.
    pub fn stop(&self) -> Result<()> {
        self.shared.stop()
    }

    /// Wait for the accept loop to exit and return how it ended.
    pub fn wait(&mut self) -> Result<()> {
        let handle = self.accept_thread.take().ok_or(EndpointError::NotRunning)?;
        match handle.join() {
            Ok(outcome) => outcome,
            Err(_) => Err(EndpointError::AcceptFailed(TransportError::Io(
                std::io::Error::other("accept thread panicked"),
            ))),
        }
    }

    pub fn stop_and_wait(&mut self) -> Result<()> {
        self.stop()?;
        self.wait()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state() == ReceiverState::Running
    }

    pub fn state(&self) -> ReceiverState {
        self.shared.state()
    }

    /// Address bound by the last successful start.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
        if self.accept_thread.is_some() {
            let _ = self.wait();
        }
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("addr", &self.addr)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn accept_loop(listener: TcpTransport, pool: WorkerPool, session: Arc<Session>) -> Result<()> {
    session.emit(|h| h.listening_started());

    let outcome = loop {
        let accepted = listener.accept();
        if session.shared.state() != ReceiverState::Running {
            debug!("accept loop observed stop");
            break Ok(());
        }
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "accept failed");
                break Err(EndpointError::AcceptFailed(err));
            }
        };

        let client_id = session.shared.next_client_id.fetch_add(1, Ordering::Relaxed);
        debug!(client_id, %peer, "client connected");
        session.emit(|h| h.client_connected(client_id));

        let worker_session = Arc::clone(&session);
        let job = Box::new(move || serve(&worker_session, client_id, stream));
        if pool.submit(job).is_err() {
            error!(client_id, "connection workers are gone");
            break Err(EndpointError::AcceptFailed(TransportError::Io(
                std::io::Error::other("connection workers are gone"),
            )));
        }
    };

    drop(listener);
    drop(pool);
    session
        .shared
        .wake_addr
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    session.shared.state.store(OFF, Ordering::Release);
    info!("receiver stopped");
    session.emit(|h| h.listening_stopped());
    outcome
}

fn serve(session: &Session, client_id: u64, stream: WireStream) {
    match read_message(session, client_id, stream) {
        Ok(()) => {
            debug!(client_id, "client disconnected");
            session.emit(|h| h.client_disconnected(client_id));
        }
        Err(err) => {
            warn!(client_id, error = %err, "connection failed");
            session.emit(|h| h.connection_failed(client_id, &err));
        }
    }
}

fn read_message(session: &Session, client_id: u64, stream: WireStream) -> Result<()> {
    let mut reader = FrameReader::with_config_tcp(stream, session.frame.clone())?;
    let Some(frame) = reader.read_frame()? else {
        debug!(client_id, "closed without a message");
        return Ok(());
    };

    let message = frame.decode_message().map_err(EndpointError::Decode)?;
    debug!(
        client_id,
        fields = message.len(),
        bytes = frame.wire_size(),
        "message received"
    );
    session.emit(|h| h.message_received(client_id, &message));

    reader.expect_eof()?;
    Ok(())
}
