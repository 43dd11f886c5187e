use std::fmt;

use thiserror::Error;

/// The eight CBOR major types plus the simple/float group, as seen by the
/// reader's lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CborType {
    UnsignedInteger,
    NegativeInteger,
    ByteString,
    TextString,
    Array,
    Map,
    Tag,
    Simple,
}

impl fmt::Display for CborType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CborType::UnsignedInteger => "unsigned integer",
            CborType::NegativeInteger => "negative integer",
            CborType::ByteString => "byte string",
            CborType::TextString => "text string",
            CborType::Array => "array",
            CborType::Map => "map",
            CborType::Tag => "tag",
            CborType::Simple => "simple value",
        };

        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of cbor buffer")]
    EndOfBuffer,

    #[error("unexpected cbor type: expected {expected}, found {actual}")]
    UnexpectedCborType {
        expected: CborType,
        actual: CborType,
    },

    #[error("invalid cbor array size: expected {expected}, found {actual}")]
    InvalidArraySize { expected: u64, actual: u64 },

    #[error("invalid cbor map size: expected {expected}, found {actual}")]
    InvalidMapSize { expected: u64, actual: u64 },

    #[error("malformed or unexpected cbor tag: expected {expected}, found {actual}")]
    MalformedTag { expected: u64, actual: u64 },

    #[error("cbor integer out of range for the target type")]
    IntegerOutOfRange,

    #[error("invalid utf-8 in cbor text string")]
    InvalidUtf8,

    #[error("non-canonical cbor rejected in strict mode: {0}")]
    NotCanonical(&'static str),

    #[error("unknown discriminator: {0}")]
    UnknownDiscriminator(u64),

    #[error("duplicate key in cbor map or set")]
    DuplicateKey,

    #[error("invalid writer operation: {0}")]
    InvalidOperation(&'static str),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }
}
