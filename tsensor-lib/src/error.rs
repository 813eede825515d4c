use std::io;
use thiserror::Error;

/// Errors from assembling a message out of caller-supplied parameters.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unitId [{0}] out of range (0-19)")]
    UnitIdOutOfRange(i32),

    #[error("invalid sensor type [{0}]")]
    InvalidSensorType(String),
}

/// Errors from decoding wire bytes into a message.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated message")]
    Truncated,

    #[error("varint longer than 64 bits")]
    MalformedVarint,

    #[error("unknown message type {0}")]
    UnknownMessageType(i32),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),
}

/// Signature validation outcomes other than plain success. These are status
/// information to a listener, not fatal conditions.
#[derive(Error, Debug, PartialEq)]
pub enum SignatureError {
    #[error("can't validate a pairing message, hash is key not signature")]
    WrongMessageKind,

    #[error("error decoding message signature")]
    BadEncoding(#[from] base64::DecodeError),

    #[error("signature not a match")]
    Mismatch,
}

/// The primary error type for the `tsensor-lib` crate.
#[derive(Error, Debug)]
pub enum SensorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
