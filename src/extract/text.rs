//! Plain-text decoding.

const UTF8_BOM: &str = "\u{feff}";

/// Decode bytes as UTF-8, replacing invalid sequences and dropping a leading BOM.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix(UTF8_BOM).unwrap_or(&text).to_string()
}
