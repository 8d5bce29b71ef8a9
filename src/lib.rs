//! Message Broadcaster
//!
//! Lets a game server announce textual events to any number of ZeroMQ
//! subscribers. Each event is framed as its text plus one zero byte and
//! published on a single PUB socket bound once at plugin load.
//!
//! ```text
//! host script --TellClientAbout--> Broadcaster --frame--> PUB socket --> subscribers
//! ```

pub mod config;
pub mod ffi;
pub mod message;
pub mod publisher;
pub mod transport;
pub mod utils;

pub use config::{Config, MAX_MESSAGE_SIZE};
pub use message::{parse_frame, EventMessage, FrameError};
pub use publisher::{BroadcastError, BroadcastStats, Broadcaster};
pub use transport::{Transport, TransportConfig, TransportEndpoint, TransportError, PUB_PORT};
