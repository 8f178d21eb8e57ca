use crate::{
    codec::ObjectCodec,
    columns,
    document::Document,
    error::{Error, ErrorClass, ErrorOrigin},
    key::{KeyDefinition, PropertyAccess},
    session::Row,
    table::Table,
    value::Value,
};
use std::{any::type_name, fmt, sync::Arc};

///
/// DocumentFactory
///
/// Converts between entities, documents and stored rows for one key
/// definition. The identifier is always derived from the entity itself.
///

pub struct DocumentFactory<T> {
    keys: Arc<KeyDefinition>,
    codec: Arc<dyn ObjectCodec<T>>,
}

impl<T: PropertyAccess> DocumentFactory<T> {
    pub fn new(keys: Arc<KeyDefinition>, codec: Arc<dyn ObjectCodec<T>>) -> Self {
        Self { keys, codec }
    }

    pub fn for_table(table: &Table, codec: Arc<dyn ObjectCodec<T>>) -> Self {
        Self::new(table.shared_keys(), codec)
    }

    #[must_use]
    pub fn keys(&self) -> &KeyDefinition {
        &self.keys
    }

    /// Type tag written to the `type` column.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        type_name::<T>()
    }

    /// Encode `entity` and derive its identifier.
    pub fn as_document(&self, entity: &T) -> Result<Document<T>, Error> {
        let identifier = self.keys.identifier(entity)?;
        let object = self.codec.encode(entity)?;

        Ok(Document::new(identifier, Some(object), self.type_tag()))
    }

    /// Rebuild a document from a row projected by a read statement.
    pub fn from_row(&self, row: &Row) -> Result<Document<T>, Error> {
        let object = match row.get(columns::OBJECT) {
            Some(Value::Blob(bytes)) => bytes.clone(),
            _ => {
                return Err(Error::new(
                    ErrorClass::InvalidIdentifier,
                    ErrorOrigin::Document,
                    "stored row has no object payload to derive an identifier from",
                ));
            }
        };
        let identifier = self.keys.identifier(&self.codec.decode(&object)?)?;

        let type_tag = row
            .get(columns::TYPE)
            .and_then(Value::as_text)
            .unwrap_or_default();
        let metadata = row
            .get(columns::METADATA)
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();
        let created_at = row.get(columns::CREATED_AT).and_then(Value::as_timestamp);
        let updated_at = row.get(columns::UPDATED_AT).and_then(Value::as_timestamp);

        Ok(Document::new(identifier, Some(object), type_tag)
            .with_metadata_map(metadata)
            .with_timestamps(created_at, updated_at))
    }

    /// Decode the entity wrapped by `document`.
    pub fn as_entity(&self, document: &Document<T>) -> Result<T, Error> {
        let object = document.object().ok_or_else(|| {
            Error::new(
                ErrorClass::Codec,
                ErrorOrigin::Document,
                format!("document {} has no object payload", document.identifier()),
            )
        })?;

        Ok(self.codec.decode(object)?)
    }
}

impl<T> Clone for DocumentFactory<T> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<T> fmt::Debug for DocumentFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFactory")
            .field("keys", &self.keys)
            .field("codec", &self.codec.format())
            .finish()
    }
}
