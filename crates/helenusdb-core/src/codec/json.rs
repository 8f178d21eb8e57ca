use crate::codec::{CodecError, ObjectCodec};
use serde::{Serialize, de::DeserializeOwned};

///
/// JsonCodec
///
/// Human-readable payloads via `serde_json`.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl<T> ObjectCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, entity: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(entity).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn format(&self) -> &'static str {
        "json"
    }
}
