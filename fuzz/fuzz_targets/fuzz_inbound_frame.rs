#![no_main]

use libfuzzer_sys::fuzz_target;
use party_game_client::{decode, PresentationEvent, Router};

fuzz_target!(|data: &[u8]| {
    // Frames arrive as text; anything else never reaches the decoder.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding and routing must never panic, whatever the frame holds.
    if let Ok(envelope) = decode(text) {
        let mut sink: Vec<PresentationEvent> = Vec::new();
        let _ = Router::default().route(&envelope, &mut sink);
    }

    // Raw-byte path through serde_json's own UTF-8 handling.
    let _ = serde_json::from_slice::<party_game_client::InboundEnvelope>(data);
});
