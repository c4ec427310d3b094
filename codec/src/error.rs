use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown parameter type: {0}")]
    UnknownType(String),

    #[error("malformed function signature: {0}")]
    MalformedSignature(String),

    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument {index} does not match type {expected}")]
    TypeMismatch { index: usize, expected: String },

    #[error("value {value} does not fit in uint{bits}")]
    ValueOutOfRange { value: String, bits: usize },

    #[error("payload shorter than a selector ({0} bytes)")]
    PayloadTooShort(usize),

    #[error("selector mismatch: expected {expected}, got {actual}")]
    SelectorMismatch { expected: String, actual: String },

    #[error("read of {len} bytes at offset {offset} is out of bounds")]
    OutOfBounds { offset: usize, len: usize },

    #[error("invalid encoded value: {0}")]
    InvalidValue(String),
}
