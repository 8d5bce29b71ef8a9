//! broadcaster-tail: event subscriber
//!
//! Connects a SUB socket to a running broadcaster and prints every event it
//! receives, one per line. Useful for checking what a server is announcing.
//!
//! ## Architecture
//! ```text
//! [game server + broadcaster] --(PUB tcp)--> [broadcaster-tail]
//!                                                   |
//!                                                   v
//!                                                 stdout
//! ```
//!
//! ## Configuration
//! - BROADCASTER_TAIL_ADDRESS: endpoint to connect to (default: tcp://127.0.0.1:5556)
//! - BROADCASTER_LOG: log filter (default: info)

use tracing::{info, warn};
use zeromq::{Socket, SocketRecv, SubSocket};

use message_broadcaster::message::parse_frame;
use message_broadcaster::transport::PUB_PORT;
use message_broadcaster::utils::bootstrap::init_tracing;

const ADDRESS_ENV_VAR: &str = "BROADCASTER_TAIL_ADDRESS";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let address = std::env::var(ADDRESS_ENV_VAR)
        .unwrap_or_else(|_| format!("tcp://127.0.0.1:{}", PUB_PORT));

    let mut socket = SubSocket::new();
    socket.connect(&address).await?;
    socket.subscribe("").await?;

    info!(address = %address, "broadcaster-tail subscribed");

    loop {
        tokio::select! {
            received = socket.recv() => {
                let message = received?;
                for frame in message.into_vec() {
                    match parse_frame(&frame) {
                        Ok(text) => println!("{}", String::from_utf8_lossy(text)),
                        Err(e) => warn!(error = %e, size = frame.len(), "Skipping malformed frame"),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, exiting");
                break;
            }
        }
    }

    Ok(())
}
