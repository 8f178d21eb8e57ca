//! Document envelope: an entity's serialized payload plus the bookkeeping
//! columns stored beside it.

mod factory;
mod observer;


use crate::key::Identifier;
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, fmt, marker::PhantomData};

pub use factory::DocumentFactory;
pub use observer::DocumentObserver;

///
/// Document
///
/// Payload bytes, type tag, string metadata, timestamps, and the identifier
/// of the wrapped entity under one view's key definition. Timestamps are
/// stamped by the write path only.
///

pub struct Document<T> {
    identifier: Identifier,
    object: Option<Vec<u8>>,
    type_tag: String,
    metadata: BTreeMap<String, String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Document<T> {
    pub fn new(identifier: Identifier, object: Option<Vec<u8>>, type_tag: impl Into<String>) -> Self {
        Self {
            identifier,
            object,
            type_tag: type_tag.into(),
            metadata: BTreeMap::new(),
            created_at: None,
            updated_at: None,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[must_use]
    pub fn object(&self) -> Option<&[u8]> {
        self.object.as_deref()
    }

    #[must_use]
    pub const fn has_object(&self) -> bool {
        self.object.is_some()
    }

    #[must_use]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub const fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub(crate) const fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
        self.updated_at = Some(at);
    }

    pub(crate) const fn stamp_updated(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    // Read path only: timestamps come from the stored row.
    pub(crate) fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub(crate) fn with_metadata_map(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

impl<T> Clone for Document<T> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            object: self.object.clone(),
            type_tag: self.type_tag.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Document<T> {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.object == other.object
            && self.type_tag == other.type_tag
            && self.metadata == other.metadata
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }
}

impl<T> Eq for Document<T> {}

impl<T> fmt::Debug for Document<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("identifier", &self.identifier)
            .field("object_len", &self.object.as_ref().map(Vec::len))
            .field("type_tag", &self.type_tag)
            .field("metadata", &self.metadata)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
