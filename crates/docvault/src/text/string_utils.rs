use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Remove C0 control characters and DEL, keeping newlines, carriage returns and tabs.
pub fn strip_control_characters(text: &str) -> String {
    if text
        .chars()
        .any(|c| matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') && c != '\n' && c != '\r' && c != '\t')
    {
        text.chars()
            .filter(|c| !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') || matches!(c, '\n' | '\r' | '\t'))
            .collect()
    } else {
        text.to_string()
    }
}

/// Validate UTF-8, using the SIMD validator when available.
pub fn utf8_str(bytes: &[u8]) -> Option<&str> {
    #[cfg(feature = "simd-utf8")]
    {
        simdutf8::basic::from_utf8(bytes).ok()
    }

    #[cfg(not(feature = "simd-utf8"))]
    {
        std::str::from_utf8(bytes).ok()
    }
}

/// The `charset` parameter of a media type, if present and known.
pub fn charset_from_mime(mime_type: &str) -> Option<&'static Encoding> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

/// Decode bytes without substituting anything.
///
/// A byte order mark decides the encoding when present; then an explicit
/// charset; then valid UTF-8; then the `chardetng` guess. Returns `None` when the
/// chosen encoding cannot decode the bytes cleanly.
pub fn decode_strict(bytes: &[u8], declared: Option<&'static Encoding>) -> Option<(String, &'static Encoding)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|text| (text.into_owned(), encoding));
    }

    if let Some(encoding) = declared {
        return encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| (text.into_owned(), encoding));
    }

    if let Some(text) = utf8_str(bytes) {
        return Some((text.to_string(), UTF_8));
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);

    guess
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| (text.into_owned(), guess))
}

/// Lossy UTF-8 with any leading byte order mark removed.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
