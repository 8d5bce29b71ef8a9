//! Publish transport.
//!
//! `TransportEndpoint` owns one ZeroMQ PUB socket bound once at startup.
//! The socket lives on a dedicated worker thread with its own tokio runtime;
//! callers hand framed messages to it through a bounded queue, which keeps
//! `send` non-blocking and serializes concurrent senders in arrival order.

pub mod mock;

pub use mock::MockTransport;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zeromq::{Endpoint, PubSocket, Socket, SocketSend, ZmqMessage};

use crate::config::ResourceLimits;
use crate::message::EventMessage;

/// Well-known port subscribers connect to.
pub const PUB_PORT: u16 = 5556;

/// Host value meaning "every local interface".
pub const ALL_INTERFACES: &str = "0.0.0.0";

const WORKER_THREAD_NAME: &str = "broadcaster-publish";

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by the publish transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to start publish runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Failed to bind publish socket to {address}: {message}")]
    Bind { address: String, message: String },

    #[error("Publish worker exited before reporting bind status")]
    WorkerExited,

    #[error("Publish queue is full")]
    QueueFull,

    #[error("Publish queue is closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),
}

/// Publish socket configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Interface to bind. `*` and `0.0.0.0` both mean all interfaces.
    pub host: String,
    /// Port to bind. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: ALL_INTERFACES.to_string(),
            port: PUB_PORT,
        }
    }
}

impl TransportConfig {
    /// ZeroMQ endpoint string to bind, e.g. `tcp://0.0.0.0:5556`.
    pub fn bind_address(&self) -> String {
        let host = match self.host.as_str() {
            "*" | "" => ALL_INTERFACES,
            host => host,
        };
        format!("tcp://{}:{}", host, self.port)
    }
}

/// Socket send failures that happen after `send` has already returned.
///
/// The worker records each failure here. The next `send` reports the
/// pending error as `TransportError::Send`, and the running total feeds
/// the publisher's stats.
#[derive(Debug, Default)]
pub struct SendFailures {
    count: AtomicU64,
    pending: Mutex<Option<String>>,
}

impl SendFailures {
    pub fn record(&self, error: impl Into<String>) {
        self.count.fetch_add(1, Ordering::Relaxed);
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.into());
    }

    /// Take the most recent unreported failure, if any.
    pub fn take_pending(&self) -> Option<String> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Outbound side of the publisher.
///
/// Implementations:
/// - `TransportEndpoint`: ZeroMQ PUB socket over TCP
/// - `MockTransport`: in-memory recorder for testing
pub trait Transport: Send + Sync {
    /// Hand one framed message to the transport. Must not block on subscribers.
    fn send(&self, message: EventMessage) -> Result<()>;

    /// Resolved endpoint the transport publishes on.
    fn endpoint(&self) -> &str;

    /// Bound TCP port, when the transport has one.
    fn local_port(&self) -> Option<u16> {
        None
    }

    /// Frames accepted by `send` that the socket later failed to publish.
    fn background_failures(&self) -> u64 {
        0
    }

    /// Flush queued frames and release the socket.
    fn close(&mut self) {}
}

/// Lets a caller keep a handle on a transport the publisher owns.
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, message: EventMessage) -> Result<()> {
        (**self).send(message)
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    fn local_port(&self) -> Option<u16> {
        (**self).local_port()
    }

    fn background_failures(&self) -> u64 {
        (**self).background_failures()
    }
}

/// The process's publish endpoint: one context, one PUB socket, one bind.
pub struct TransportEndpoint {
    endpoint: String,
    local_port: Option<u16>,
    sender: Option<mpsc::Sender<EventMessage>>,
    worker: Option<JoinHandle<()>>,
    failures: Arc<SendFailures>,
}

impl TransportEndpoint {
    /// Create the socket and bind it. Returns once the bind has completed.
    ///
    /// Any failure here is fatal for the plugin: the endpoint is never
    /// constructed and nothing can be published.
    pub fn bind(config: &TransportConfig, limits: &ResourceLimits) -> Result<Self> {
        let address = config.bind_address();
        let (sender, receiver) = mpsc::channel(limits.effective_queue_capacity());
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let failures = Arc::new(SendFailures::default());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker_address = address.clone();
        let worker_failures = Arc::clone(&failures);
        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(run_worker(worker_address, receiver, ready_tx, worker_failures));
            })?;

        let bound = match ready_rx.recv() {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(e)) => {
                join_worker(worker, &address);
                return Err(e);
            }
            Err(_) => {
                join_worker(worker, &address);
                return Err(TransportError::WorkerExited);
            }
        };

        let local_port = match &bound {
            Endpoint::Tcp(_, port) => Some(*port),
            #[allow(unreachable_patterns)]
            _ => None,
        };
        let endpoint = bound.to_string();

        info!(
            address = %address,
            endpoint = %endpoint,
            "Publish socket bound"
        );

        Ok(Self {
            endpoint,
            local_port,
            sender: Some(sender),
            worker: Some(worker),
            failures,
        })
    }
}

impl Transport for TransportEndpoint {
    fn send(&self, message: EventMessage) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(TransportError::Closed)?;
        if let Some(error) = self.failures.take_pending() {
            return Err(TransportError::Send(error));
        }
        sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    fn background_failures(&self) -> u64 {
        self.failures.count()
    }

    fn close(&mut self) {
        // Closing the queue lets the worker drain what is left and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            join_worker(worker, &self.endpoint);
        }
    }
}

impl Drop for TransportEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

fn join_worker(worker: JoinHandle<()>, endpoint: &str) {
    if worker.join().is_err() {
        warn!(endpoint = %endpoint, "Publish worker panicked");
    }
}

/// Worker body: bind, report, then forward queued frames until the queue closes.
async fn run_worker(
    address: String,
    mut receiver: mpsc::Receiver<EventMessage>,
    ready: std_mpsc::Sender<Result<Endpoint>>,
    failures: Arc<SendFailures>,
) {
    let mut socket = PubSocket::new();
    match socket.bind(&address).await {
        Ok(endpoint) => {
            if ready.send(Ok(endpoint)).is_err() {
                return;
            }
        }
        Err(e) => {
            let _ = ready.send(Err(TransportError::Bind {
                address,
                message: e.to_string(),
            }));
            return;
        }
    }

    while let Some(message) = receiver.recv().await {
        let size = message.len();
        if let Err(e) = socket.send(ZmqMessage::from(Bytes::from(message))).await {
            warn!(error = %e, size, "Publish socket send failed");
            failures.record(e.to_string());
        }
    }

    debug!(address = %address, "Publish queue closed, stopping worker");
}
