#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Exercise the raw-byte deserialization path for outbound events; any
    // input that parses must serialize back without panicking.
    if let Ok(event) = serde_json::from_slice::<listen_lobby_client::protocol::ClientEvent>(data) {
        let _ = serde_json::to_string(&event);
    }
});
