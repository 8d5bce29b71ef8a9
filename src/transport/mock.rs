//! Mock transport implementation for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{Result, SendFailures, Transport, TransportError};
use crate::message::EventMessage;

const MOCK_ENDPOINT: &str = "mock://publisher";

/// Mock transport that records every message it is handed.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<EventMessage>>,
    fail_on_send: AtomicBool,
    background: SendFailures,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::SeqCst);
    }

    /// Simulate the socket failing a frame after `send` returned.
    pub fn fail_in_background(&self, error: &str) {
        self.background.record(error);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn take_sent(&self) -> Vec<EventMessage> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Transport for MockTransport {
    fn send(&self, message: EventMessage) -> Result<()> {
        if self.fail_on_send.load(Ordering::SeqCst) {
            return Err(TransportError::Send("Mock send failure".to_string()));
        }
        if let Some(error) = self.background.take_pending() {
            return Err(TransportError::Send(error));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }

    fn background_failures(&self) -> u64 {
        self.background.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> EventMessage {
        EventMessage::frame(text.as_bytes(), 64).unwrap()
    }

    #[test]
    fn test_mock_transport_records_sends() {
        let transport = MockTransport::new();
        transport.send(message("a")).unwrap();
        transport.send(message("b")).unwrap();

        assert_eq!(transport.sent_count(), 2);
        let sent = transport.take_sent();
        assert_eq!(sent[0].as_bytes(), b"a\0");
        assert_eq!(sent[1].as_bytes(), b"b\0");
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn test_mock_transport_background_failure() {
        let transport = MockTransport::new();
        transport.fail_in_background("lost");

        let result = transport.send(EventMessage::frame(b"next", 16).unwrap());

        assert!(matches!(result, Err(TransportError::Send(ref e)) if e == "lost"));
        assert_eq!(transport.background_failures(), 1);
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn test_mock_transport_fail_on_send() {
        let transport = MockTransport::new();
        transport.set_fail_on_send(true);

        let result = transport.send(message("a"));

        assert!(matches!(result, Err(TransportError::Send(_))));
        assert_eq!(transport.sent_count(), 0);
    }
}
