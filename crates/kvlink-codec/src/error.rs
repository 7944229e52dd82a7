use crate::value::ValueKind;

/// Errors that can occur while encoding or decoding values and messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No descriptor accepts a value of this kind.
    #[error("no encoder registered for {0} values")]
    UnsupportedValue(ValueKind),

    /// No descriptor accepts this type tag.
    #[error("no decoder registered for type tag {0:?}")]
    UnknownTag(String),

    /// Container dimensions disagree with its element count.
    #[error("shape mismatch: dimensions {dims:?} need {expected} elements, got {actual}")]
    ShapeMismatch {
        dims: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A length or dimension does not fit the wire's signed 32-bit fields.
    #[error("{what} of {size} exceeds the Int32 range")]
    TooLarge { what: &'static str, size: usize },

    /// Field names must be non-empty and free of `:` and `;`.
    #[error("invalid field name {0:?}")]
    InvalidFieldName(String),

    /// The payload ended before the bytes a tag declares.
    #[error("payload for tag {tag:?} truncated: needs {needed} bytes, {available} available")]
    Truncated {
        tag: String,
        needed: usize,
        available: usize,
    },

    /// The bytes of a field cannot be decoded as its declared kind.
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: ValueKind, reason: String },

    /// A header entry is not of the form `name:tag`.
    #[error("malformed header entry {0:?}")]
    MalformedHeader(String),

    /// Payload bytes remain after every header field was decoded.
    #[error("{remaining} payload bytes left after the last field")]
    TrailingPayload { remaining: usize },

    /// String or header bytes are not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
