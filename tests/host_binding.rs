//! Host binding tests through the C entry points.
//!
//! Run with: cargo test --test host_binding
//!
//! The plugin keeps one broadcaster per process, so the whole load, announce,
//! unload lifecycle runs as a single test in its own binary.

mod common;

use std::ffi::CString;

use common::{connect_subscriber, recv_frame, sync_subscriber};
use message_broadcaster::ffi::{
    broadcaster, broadcaster_on_load, broadcaster_on_unload, ResultCode, TellClientAbout,
};
use message_broadcaster::MAX_MESSAGE_SIZE;

fn tell(text: &CString) -> i32 {
    unsafe { TellClientAbout(text.as_ptr()) }
}

#[tokio::test]
async fn test_plugin_lifecycle() {
    std::env::set_var("BROADCASTER__TRANSPORT__HOST", "127.0.0.1");
    std::env::set_var("BROADCASTER__TRANSPORT__PORT", "0");

    let hello = CString::new("hello").unwrap();

    // Natives are unusable before the load hook runs.
    assert_eq!(tell(&hello), ResultCode::NotInitialized.code());

    assert_eq!(broadcaster_on_load(), ResultCode::Ok.code());
    assert_eq!(broadcaster_on_load(), ResultCode::AlreadyInitialized.code());

    let instance = broadcaster().expect("load hook must create the broadcaster");
    let port = instance.local_port().expect("bound to a TCP port");
    let mut subscriber = connect_subscriber(port).await;
    sync_subscriber(instance, &mut subscriber).await;

    assert_eq!(tell(&hello), ResultCode::Ok.code());
    assert_eq!(recv_frame(&mut subscriber).await, b"hello\0".to_vec());

    let oversized = CString::new("x".repeat(MAX_MESSAGE_SIZE)).unwrap();
    assert_eq!(tell(&oversized), ResultCode::MessageTooLarge.code());

    let boundary = CString::new("z".repeat(MAX_MESSAGE_SIZE - 1)).unwrap();
    assert_eq!(tell(&boundary), ResultCode::Ok.code());
    let frame = recv_frame(&mut subscriber).await;
    assert_eq!(frame.len(), MAX_MESSAGE_SIZE);

    assert_eq!(
        unsafe { TellClientAbout(std::ptr::null()) },
        ResultCode::InvalidArgument.code()
    );

    assert_eq!(broadcaster_on_unload(), ResultCode::Ok.code());
    assert_eq!(tell(&hello), ResultCode::ShutDown.code());
    assert_eq!(broadcaster_on_load(), ResultCode::ShutDown.code());

    std::env::remove_var("BROADCASTER__TRANSPORT__HOST");
    std::env::remove_var("BROADCASTER__TRANSPORT__PORT");
}
