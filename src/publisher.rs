//! Bounded event publisher.
//!
//! `Broadcaster` is the long-lived service the host binding owns. It moves
//! through three states: uninitialized, ready (endpoint bound), and shut
//! down. `announce` validates and frames text, then hands the frame to the
//! transport without waiting for subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info, trace, warn};

use crate::config::Config;
use crate::message::EventMessage;
use crate::transport::{Transport, TransportEndpoint, TransportError};

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, BroadcastError>;

/// Errors returned to callers of the publisher.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Broadcaster is not initialized")]
    NotInitialized,

    #[error("Broadcaster is already initialized")]
    AlreadyInitialized,

    #[error("Broadcaster has been shut down")]
    ShutDown,

    #[error("Message too large: {size} bytes scanned, limit is {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Message contains a zero byte at offset {position}")]
    InteriorNul { position: usize },

    #[error("Send failed: {0}")]
    SendFailed(#[source] TransportError),

    #[error("Transport initialization failed: {0}")]
    Initialization(#[source] TransportError),
}

enum State {
    Uninitialized,
    Ready(Box<dyn Transport>),
    ShutDown,
}

/// Point-in-time publisher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Messages accepted by the transport.
    pub published: u64,
    /// Messages rejected for size.
    pub rejected: u64,
    /// Messages the transport refused.
    pub failed: u64,
    /// Messages the transport accepted but the socket failed to publish.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Publishes host events to every connected subscriber.
pub struct Broadcaster {
    config: Config,
    state: RwLock<State>,
    counters: Counters,
}

impl Broadcaster {
    /// Create an uninitialized broadcaster. Nothing is bound until [`initialize`].
    ///
    /// [`initialize`]: Broadcaster::initialize
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: RwLock::new(State::Uninitialized),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind the publish endpoint. Runs at most once per broadcaster.
    ///
    /// A second call returns `AlreadyInitialized` and leaves the bound socket
    /// untouched. Bind failures are returned as `Initialization` and leave the
    /// broadcaster uninitialized.
    pub fn initialize(&self) -> Result<()> {
        self.initialize_with(|config| {
            TransportEndpoint::bind(&config.transport, &config.limits)
                .map(|endpoint| Box::new(endpoint) as Box<dyn Transport>)
        })
    }

    /// Initialize with a caller-supplied transport.
    pub fn initialize_with_transport(&self, transport: Box<dyn Transport>) -> Result<()> {
        self.initialize_with(move |_| Ok(transport))
    }

    fn initialize_with<F>(&self, create: F) -> Result<()>
    where
        F: FnOnce(&Config) -> std::result::Result<Box<dyn Transport>, TransportError>,
    {
        // Hold the write lock across creation so concurrent callers cannot bind twice.
        let mut state = self.write_state();
        match *state {
            State::Ready(_) => {
                warn!("Broadcaster initialization requested twice; ignoring");
                return Err(BroadcastError::AlreadyInitialized);
            }
            State::ShutDown => return Err(BroadcastError::ShutDown),
            State::Uninitialized => {}
        }

        let transport = create(&self.config).map_err(|e| {
            error!(error = %e, "Failed to initialize publish transport");
            BroadcastError::Initialization(e)
        })?;

        info!(endpoint = %transport.endpoint(), "Broadcaster ready");
        *state = State::Ready(transport);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.read_state(), State::Ready(_))
    }

    /// Resolved publish endpoint, once initialized.
    pub fn endpoint(&self) -> Option<String> {
        match &*self.read_state() {
            State::Ready(transport) => Some(transport.endpoint().to_string()),
            _ => None,
        }
    }

    /// Bound TCP port, once initialized.
    pub fn local_port(&self) -> Option<u16> {
        match &*self.read_state() {
            State::Ready(transport) => transport.local_port(),
            _ => None,
        }
    }

    /// Publish one event.
    ///
    /// The whole string is published. Text of `MAX_MESSAGE_SIZE` bytes or
    /// more is `MessageTooLarge` and text containing a zero byte is
    /// `InteriorNul`; neither is truncated.
    pub fn announce(&self, text: &str) -> Result<()> {
        self.ensure_ready()?;

        let limit = self.config.limits.max_message_size();
        if text.len() >= limit {
            return Err(self.reject_oversized(text.len(), limit));
        }
        if let Some(position) = text.bytes().position(|b| b == 0) {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(size = text.len(), position, "Rejected event with interior zero byte");
            return Err(BroadcastError::InteriorNul { position });
        }

        self.announce_bytes(text.as_bytes())
    }

    /// Publish one event given as raw bytes.
    ///
    /// The text ends at the first zero byte or at the end of the slice,
    /// whichever comes first, and must be shorter than `MAX_MESSAGE_SIZE`.
    /// Returns once the frame is queued; delivery is not confirmed.
    pub fn announce_bytes(&self, text: &[u8]) -> Result<()> {
        let state = self.read_state();
        let transport = match &*state {
            State::Ready(transport) => transport,
            State::Uninitialized => return Err(BroadcastError::NotInitialized),
            State::ShutDown => return Err(BroadcastError::ShutDown),
        };

        let limit = self.config.limits.max_message_size();
        let message = EventMessage::frame(text, limit)
            .map_err(|_| self.reject_oversized(text.len(), limit))?;

        trace!(size = message.len(), "Announcing event");

        transport.send(message).map_err(|e| {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Failed to publish event");
            BroadcastError::SendFailed(e)
        })?;

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match &*self.read_state() {
            State::Ready(_) => Ok(()),
            State::Uninitialized => Err(BroadcastError::NotInitialized),
            State::ShutDown => Err(BroadcastError::ShutDown),
        }
    }

    fn reject_oversized(&self, size: usize, limit: usize) -> BroadcastError {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        warn!(size, limit, "Rejected oversized event");
        BroadcastError::MessageTooLarge { size, limit }
    }

    /// Release the endpoint. Queued frames are flushed before the socket closes.
    ///
    /// Afterwards `announce` and `initialize` return `ShutDown`. Calling this
    /// on an uninitialized or already shut down broadcaster is a no-op.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.write_state(), State::ShutDown);
        if let State::Ready(mut transport) = previous {
            info!(endpoint = %transport.endpoint(), "Shutting down broadcaster");
            transport.close();
            // The worker has exited, so this count is final.
            self.counters
                .dropped
                .store(transport.background_failures(), Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> BroadcastStats {
        let dropped = match &*self.read_state() {
            State::Ready(transport) => transport.background_failures(),
            _ => self.counters.dropped.load(Ordering::Relaxed),
        };
        BroadcastStats {
            published: self.counters.published.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
