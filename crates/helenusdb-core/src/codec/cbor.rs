use crate::codec::{CodecError, ObjectCodec};
use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::{from_slice, to_vec};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Largest payload the CBOR codec will attempt to decode.
pub const MAX_OBJECT_BYTES: usize = 16 * 1024 * 1024;

///
/// CborCodec
///
/// Compact binary payloads via `serde_cbor`.
///

#[derive(Clone, Copy, Debug)]
pub struct CborCodec {
    max_bytes: usize,
}

impl CborCodec {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_limit(MAX_OBJECT_BYTES)
    }

    #[must_use]
    pub const fn with_limit(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for CborCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectCodec<T> for CborCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, entity: &T) -> Result<Vec<u8>, CodecError> {
        to_vec(entity).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Input size is bounded before decode, and a panic inside the decoder
    /// is reported as a decode error.
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        if bytes.len() > self.max_bytes {
            return Err(CodecError::SizeLimitExceeded {
                len: bytes.len(),
                max_bytes: self.max_bytes,
            });
        }

        match catch_unwind(AssertUnwindSafe(|| from_slice(bytes))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CodecError::Decode(err.to_string())),
            Err(_) => Err(CodecError::Decode(
                "panic during CBOR deserialization".into(),
            )),
        }
    }

    fn format(&self) -> &'static str {
        "cbor"
    }
}
