//! Format-specific extraction helpers that do not need a native library.

pub mod text;

pub use text::PlainTextReader;
