// src/process/encoding.rs
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, SHIFT_JIS};
use tracing::{debug, warn};

/// Guess the encoding of `bytes`: a BOM wins, otherwise a statistical guess
/// biased towards Japanese legacy encodings.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((enc, _)) = Encoding::for_bom(bytes) {
        return enc;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(Some(b"jp"), true)
}

/// Decode `bytes` into text. Never fails: when the detected encoding cannot
/// decode the input cleanly, falls back to Shift_JIS and drops whatever
/// bytes it cannot map.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let encoding = detect_encoding(bytes);
    debug!(encoding = encoding.name(), "detected encoding");

    let body = match Encoding::for_bom(bytes) {
        Some((_, bom_len)) => &bytes[bom_len..],
        None => bytes,
    };
    if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(body) {
        return text.into_owned();
    }

    warn!(
        encoding = encoding.name(),
        "strict decode failed; falling back to lossy Shift_JIS"
    );
    let (text, _) = SHIFT_JIS.decode_without_bom_handling(body);
    text.replace('\u{FFFD}', "")
}
