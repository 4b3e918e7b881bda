//! Codec errors.

use std::fmt;

/// Result type for XDR operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding or decoding XDR.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom message raised by a serde impl.
    #[error("{0}")]
    Message(String),

    /// Input ended before the value was complete.
    #[error("unexpected end of input: needed {needed} bytes, {available} left")]
    Eof { needed: usize, available: usize },

    /// Booleans must be 0 or 1.
    #[error("invalid boolean value: {0}")]
    InvalidBool(u32),

    /// Optional-data discriminants must be 0 or 1.
    #[error("invalid optional discriminant: {0}")]
    InvalidOptional(u32),

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Declared length is larger than the remaining input could hold.
    #[error("declared length {0} exceeds remaining input")]
    LengthOverflow(usize),

    /// The serde data model construct has no XDR encoding.
    #[error("{0} cannot be represented in XDR")]
    Unsupported(&'static str),

    /// Bytes left over after a complete value.
    #[error("trailing data: {0} bytes remaining")]
    TrailingData(usize),
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
