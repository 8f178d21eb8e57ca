//! Object codecs turn entities into the opaque payload stored in a
//! document's `object` column and back.
//!
//! Codecs are format-level only: they know nothing about keys, tables or
//! sessions.

mod cbor;
mod json;

#[cfg(test)]
mod tests;

use std::fmt;
use thiserror::Error as ThisError;

pub use cbor::{CborCodec, MAX_OBJECT_BYTES};
pub use json::JsonCodec;

///
/// ObjectCodec
///
/// Payload encoding for one entity type. Implementations must be pure:
/// decoding the output of `encode` yields an equal entity.
///

pub trait ObjectCodec<T>: Send + Sync {
    fn encode(&self, entity: &T) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Short format name used in logs.
    fn format(&self) -> &'static str;
}

///
/// CodecError
///

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("decode size limit exceeded: {len} bytes (limit {max_bytes})")]
    SizeLimitExceeded { len: usize, max_bytes: usize },
}

///
/// CodecErrorKind
///
/// Stable kind taxonomy, independent of backend message text.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecErrorKind {
    Encode,
    Decode,
    SizeLimitExceeded,
}

impl CodecErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
            Self::SizeLimitExceeded => "size_limit_exceeded",
        }
    }
}

impl fmt::Display for CodecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CodecError {
    #[must_use]
    pub const fn kind(&self) -> CodecErrorKind {
        match self {
            Self::Encode(_) => CodecErrorKind::Encode,
            Self::Decode(_) => CodecErrorKind::Decode,
            Self::SizeLimitExceeded { .. } => CodecErrorKind::SizeLimitExceeded,
        }
    }
}
