//! Shared utilities for integration tests.
//!
//! Provides a ZeroMQ subscriber helper that waits out the PUB/SUB
//! subscription handshake before a test starts asserting on messages.

#![allow(dead_code)]

use std::time::Duration;

use message_broadcaster::Broadcaster;
use zeromq::{Socket, SocketRecv, SubSocket};

const WARMUP: &str = "__warmup__";
const SYNC_MARKER: &str = "__sync__";
const WARMUP_INTERVAL: Duration = Duration::from_millis(50);
const MAX_WARMUPS: usize = 200;

/// How long a test waits for an expected message.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect a subscriber to a broadcaster on loopback and subscribe to everything.
pub async fn connect_subscriber(port: u16) -> SubSocket {
    let mut socket = SubSocket::new();
    socket
        .connect(&format!("tcp://127.0.0.1:{}", port))
        .await
        .expect("Failed to connect subscriber");
    socket.subscribe("").await.expect("Failed to subscribe");
    socket
}

/// Receive one single-frame message as raw bytes.
pub async fn recv_frame(socket: &mut SubSocket) -> Vec<u8> {
    let message = tokio::time::timeout(RECV_TIMEOUT, socket.recv())
        .await
        .expect("Timed out waiting for message")
        .expect("Subscriber receive failed");
    assert_eq!(message.len(), 1, "expected a single-frame message");
    message.get(0).expect("empty message").to_vec()
}

/// Block until the subscription is live, then drain every warm-up event.
///
/// PUB sockets drop messages for subscribers whose subscription has not yet
/// arrived, so tests publish warm-up events until one gets through, then
/// publish a marker and read up to it. Afterwards the next frame the subscriber reads
/// is the next event the test announces.
pub async fn sync_subscriber(broadcaster: &Broadcaster, socket: &mut SubSocket) {
    let mut live = false;
    for _ in 0..MAX_WARMUPS {
        broadcaster.announce(WARMUP).expect("Warm-up announce failed");
        if let Ok(Ok(_)) = tokio::time::timeout(WARMUP_INTERVAL, socket.recv()).await {
            live = true;
            break;
        }
    }
    assert!(live, "subscription never became live");

    broadcaster
        .announce(SYNC_MARKER)
        .expect("Sync announce failed");
    let marker = format!("{}\0", SYNC_MARKER).into_bytes();
    loop {
        if recv_frame(socket).await == marker {
            break;
        }
    }
}
