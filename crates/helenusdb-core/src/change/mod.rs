//! Change tracking for one unit-of-work scope.
//!
//! Registrations are keyed by view and identifier. Each key keeps the latest
//! change per [`EntityState`]; among the active (non-clean) states the most
//! recent registration wins.

#[cfg(test)]
mod tests;

use crate::{document::Document, key::Identifier};
use std::{collections::BTreeMap, fmt};
use tracing::debug;

///
/// EntityState
///
/// Relationship of an in-memory entity to its persisted row.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EntityState {
    New,
    Dirty,
    Deleted,
    Clean,
}

impl EntityState {
    /// Active states produce a write at commit time.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Dirty => "dirty",
            Self::Deleted => "deleted",
            Self::Clean => "clean",
        };
        write!(f, "{label}")
    }
}

///
/// Change
///

#[derive(Clone, Debug)]
pub struct Change<T> {
    view: String,
    document: Document<T>,
    state: EntityState,
    sequence: u64,
}

impl<T> Change<T> {
    #[must_use]
    pub fn view(&self) -> &str {
        &self.view
    }

    #[must_use]
    pub const fn document(&self) -> &Document<T> {
        &self.document
    }

    pub(crate) const fn document_mut(&mut self) -> &mut Document<T> {
        &mut self.document
    }

    #[must_use]
    pub const fn id(&self) -> &Identifier {
        self.document.identifier()
    }

    #[must_use]
    pub const fn state(&self) -> EntityState {
        self.state
    }

    /// Registration order within the owning change set.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self.state, EntityState::New)
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        matches!(self.state, EntityState::Dirty)
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self.state, EntityState::Deleted)
    }
}

///
/// EntityChanges
///
/// Latest change per state for one (view, identifier).
///

#[derive(Clone, Debug)]
pub struct EntityChanges<T> {
    changes: BTreeMap<EntityState, Change<T>>,
}

impl<T> EntityChanges<T> {
    const fn new() -> Self {
        Self {
            changes: BTreeMap::new(),
        }
    }

    fn add(&mut self, change: Change<T>) {
        self.changes.insert(change.state, change);
    }

    #[must_use]
    pub fn get(&self, state: EntityState) -> Option<&Change<T>> {
        self.changes.get(&state)
    }

    #[must_use]
    pub fn clean(&self) -> Option<&Change<T>> {
        self.get(EntityState::Clean)
    }

    /// The change to act on at commit: the most recently registered active
    /// change, if any.
    #[must_use]
    pub fn as_change(&self) -> Option<&Change<T>> {
        self.changes
            .values()
            .filter(|change| change.state.is_active())
            .max_by_key(|change| change.sequence)
    }

    fn as_change_mut(&mut self) -> Option<&mut Change<T>> {
        self.changes
            .values_mut()
            .filter(|change| change.state.is_active())
            .max_by_key(|change| change.sequence)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change<T>> {
        self.changes.values()
    }
}

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct ChangeKey {
    view: String,
    id: Identifier,
}

///
/// ChangeSet
///
/// Registration ledger of one unit-of-work scope. Never persisted.
///

#[derive(Clone, Debug)]
pub struct ChangeSet<T> {
    entries: BTreeMap<ChangeKey, EntityChanges<T>>,
    sequence: u64,
}

impl<T> ChangeSet<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            sequence: 0,
        }
    }

    /// Register `document` under `view` in `state`. A later active
    /// registration for the same view and identifier supersedes earlier ones.
    pub fn register(&mut self, view: impl Into<String>, document: Document<T>, state: EntityState) {
        let key = ChangeKey {
            view: view.into(),
            id: document.identifier().clone(),
        };
        self.sequence += 1;
        let change = Change {
            view: key.view.clone(),
            document,
            state,
            sequence: self.sequence,
        };

        let changes = self.entries.entry(key).or_insert_with(EntityChanges::new);
        if state.is_active()
            && let Some(previous) = changes.as_change()
        {
            debug!(
                view = previous.view(),
                id = %previous.id(),
                previous = %previous.state(),
                state = %state,
                "registration supersedes an earlier active change"
            );
        }
        changes.add(change);
    }

    /// Active changes in registration order.
    #[must_use]
    pub fn changes(&self) -> Vec<&Change<T>> {
        let mut changes = self
            .entries
            .values()
            .filter_map(EntityChanges::as_change)
            .collect::<Vec<_>>();
        changes.sort_by_key(|change| change.sequence);

        changes
    }

    pub(crate) fn changes_mut(&mut self) -> Vec<&mut Change<T>> {
        let mut changes = self
            .entries
            .values_mut()
            .filter_map(EntityChanges::as_change_mut)
            .collect::<Vec<_>>();
        changes.sort_by_key(|change| change.sequence);

        changes
    }

    /// Clean snapshot registered for `id` in any view, searching views in
    /// name order.
    #[must_use]
    pub fn find_clean(&self, id: &Identifier) -> Option<&Document<T>> {
        self.entries
            .iter()
            .filter(|(key, _)| key.id == *id)
            .find_map(|(_, changes)| changes.clean())
            .map(Change::document)
    }

    #[must_use]
    pub fn find_clean_in(&self, view: &str, id: &Identifier) -> Option<&Document<T>> {
        self.entries_for(view, id)?.clean().map(Change::document)
    }

    #[must_use]
    pub fn entries_for(&self, view: &str, id: &Identifier) -> Option<&EntityChanges<T>> {
        let key = ChangeKey {
            view: view.to_string(),
            id: id.clone(),
        };

        self.entries.get(&key)
    }

    /// Forget every registration.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.sequence = 0;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (view, identifier) pairs tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
