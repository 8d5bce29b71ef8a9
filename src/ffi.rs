//! C ABI entry points for the host.
//!
//! The host's extension shim calls `broadcaster_on_load` from its load hook,
//! registers `TellClientAbout` as a script native, and calls
//! `broadcaster_on_unload` when the extension is unloaded. The process's
//! single `Broadcaster` lives here and nowhere else.

#![allow(non_snake_case)]

use std::sync::OnceLock;

use libc::{c_char, c_int};
use tracing::error;

use crate::config::{Config, MAX_MESSAGE_SIZE};
use crate::publisher::{BroadcastError, Broadcaster};
use crate::utils::bootstrap::init_tracing;

static BROADCASTER: OnceLock<Broadcaster> = OnceLock::new();

/// The process's broadcaster, once `broadcaster_on_load` has created it.
pub fn broadcaster() -> Option<&'static Broadcaster> {
    BROADCASTER.get()
}

/// Result codes returned across the C boundary.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResultCode {
    Ok = 0,
    AlreadyInitialized = 1,
    NotInitialized = -1,
    MessageTooLarge = -2,
    SendFailed = -3,
    InvalidArgument = -4,
    InitFailed = -5,
    ShutDown = -6,
}

impl ResultCode {
    pub fn code(self) -> c_int {
        self as c_int
    }
}

impl From<&BroadcastError> for ResultCode {
    fn from(error: &BroadcastError) -> Self {
        match error {
            BroadcastError::NotInitialized => ResultCode::NotInitialized,
            BroadcastError::AlreadyInitialized => ResultCode::AlreadyInitialized,
            BroadcastError::ShutDown => ResultCode::ShutDown,
            BroadcastError::MessageTooLarge { .. } => ResultCode::MessageTooLarge,
            BroadcastError::InteriorNul { .. } => ResultCode::InvalidArgument,
            BroadcastError::SendFailed(_) => ResultCode::SendFailed,
            BroadcastError::Initialization(_) => ResultCode::InitFailed,
        }
    }
}

impl<T> From<Result<T, BroadcastError>> for ResultCode {
    fn from(result: Result<T, BroadcastError>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(e) => ResultCode::from(&e),
        }
    }
}

/// View at most `limit` bytes of a C string, stopping after its terminator.
///
/// # Safety
/// `text` must be non-null and readable up to its terminator or `limit`
/// bytes, whichever comes first.
unsafe fn bounded_c_str<'a>(text: *const c_char, limit: usize) -> &'a [u8] {
    let bytes = text.cast::<u8>();
    let mut length = 0;
    while length < limit && *bytes.add(length) != 0 {
        length += 1;
    }
    std::slice::from_raw_parts(bytes, length)
}

/// Load hook: configure logging, bind the publish socket.
///
/// Returns `0` on success, `1` if already loaded, negative on failure. A
/// negative result means the host must fail the extension load.
#[no_mangle]
pub extern "C" fn broadcaster_on_load() -> c_int {
    init_tracing();

    let broadcaster = match BROADCASTER.get() {
        Some(broadcaster) => broadcaster,
        None => match Config::load(None) {
            Ok(config) => BROADCASTER.get_or_init(|| Broadcaster::new(config)),
            Err(e) => {
                error!(error = %e, "Broadcaster configuration is invalid");
                return ResultCode::InitFailed.code();
            }
        },
    };

    ResultCode::from(broadcaster.initialize()).code()
}

/// Script native: publish `text` to every subscriber.
///
/// # Safety
/// `text` must be null or point to memory readable up to its terminating
/// zero byte or `MAX_MESSAGE_SIZE` bytes, whichever comes first.
#[no_mangle]
pub unsafe extern "C" fn TellClientAbout(text: *const c_char) -> c_int {
    let Some(broadcaster) = BROADCASTER.get() else {
        return ResultCode::NotInitialized.code();
    };
    if text.is_null() {
        return ResultCode::InvalidArgument.code();
    }

    let text = bounded_c_str(text, broadcaster.config().limits.max_message_size());
    ResultCode::from(broadcaster.announce_bytes(text)).code()
}

/// Unload hook: flush and close the publish socket.
#[no_mangle]
pub extern "C" fn broadcaster_on_unload() -> c_int {
    if let Some(broadcaster) = BROADCASTER.get() {
        broadcaster.shutdown();
    }
    ResultCode::Ok.code()
}
