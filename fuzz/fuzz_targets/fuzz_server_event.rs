#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Exercise the strict raw-byte deserialization path (includes
    // serde_json's own UTF-8 validation and error handling for invalid
    // sequences).
    let _ = serde_json::from_slice::<listen_lobby_client::protocol::ServerEvent>(data);

    // The lossy decoder must never panic, whatever the envelope contains.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = listen_lobby_client::protocol::ServerEvent::decode_lossy(s);
    }
});
