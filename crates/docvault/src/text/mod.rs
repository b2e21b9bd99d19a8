//! Text decoding helpers shared by the extractors.

pub mod string_utils;

pub use string_utils::{charset_from_mime, decode_lossy, decode_strict, strip_control_characters, utf8_str};
