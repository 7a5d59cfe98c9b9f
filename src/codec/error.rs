use thiserror::Error;

/// Failure of a decode or encode call. Every variant is terminal for the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    #[error("encoded length {length} is not a positive multiple of 4")]
    InvalidLength { length: usize },

    #[error("truncated UTF-8 sequence at byte {offset}: needs {needed} bytes, {available} available")]
    TruncatedSequence {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed UTF-8 sequence at byte {offset} (0x{byte:02X})")]
    MalformedSequence { offset: usize, byte: u8 },

    #[error("code point U+{code_point:X} is outside the Basic Multilingual Plane")]
    UnsupportedCodePoint { code_point: u32 },
}
