use crate::{codec::CodecError, key::Identifier, session::StorageError};
use helenusdb_config::ConfigError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured runtime error with a stable classification.
/// `class` says what went wrong, `origin` says which subsystem noticed.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Malformed key definition, or an entity missing a key property.
    pub(crate) fn key_definition(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::KeyDefinition, ErrorOrigin::Key, message)
    }

    /// A derived identifier is missing a required component.
    pub(crate) fn invalid_identifier(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidIdentifier, origin, message)
    }

    /// A NEW registration found an existing row under a unique view.
    pub(crate) fn duplicate_item(view: &str, id: &Identifier) -> Self {
        Self::new(
            ErrorClass::DuplicateItem,
            ErrorOrigin::UnitOfWork,
            format!("duplicate item in view '{view}': {id}"),
        )
        .with_detail(ErrorDetail::Item {
            view: view.to_string(),
            id: id.clone(),
        })
    }

    /// A DIRTY/DELETED registration, or a read, found no row.
    pub(crate) fn item_not_found(origin: ErrorOrigin, view: &str, id: &Identifier) -> Self {
        Self::new(
            ErrorClass::ItemNotFound,
            origin,
            format!("item not found in view '{view}': {id}"),
        )
        .with_detail(ErrorDetail::Item {
            view: view.to_string(),
            id: id.clone(),
        })
    }

    /// Storage failure while a commit was in flight.
    pub(crate) fn commit(phase: CommitPhase, source: StorageError) -> Self {
        let message = match phase {
            CommitPhase::Probe => format!("commit aborted during existence probes: {source}"),
            CommitPhase::Submit => format!("commit outcome unknown, batch submission failed: {source}"),
        };

        Self::new(ErrorClass::Commit, ErrorOrigin::Commit, message)
            .with_detail(ErrorDetail::Commit { phase, source })
    }

    /// The storage engine rejected a conditional batch.
    pub(crate) fn commit_not_applied(statements: usize) -> Self {
        Self::new(
            ErrorClass::Commit,
            ErrorOrigin::Commit,
            format!("conditional batch of {statements} statements was not applied"),
        )
        .with_detail(ErrorDetail::NotApplied { statements })
    }

    pub(crate) fn rollback(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Rollback, ErrorOrigin::Commit, message)
    }

    /// Storage failure outside a commit (reads, schema scripts, prepares).
    pub(crate) fn storage(origin: ErrorOrigin, source: StorageError) -> Self {
        Self::new(ErrorClass::Storage, origin, source.to_string())
            .with_detail(ErrorDetail::Storage(source))
    }

    pub(crate) fn invalid_argument(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, origin, message)
    }

    pub(crate) fn unknown_view(view: &str) -> Self {
        Self::new(
            ErrorClass::Internal,
            ErrorOrigin::Statement,
            format!("unknown view '{view}'"),
        )
    }

    #[must_use]
    pub const fn is_duplicate_item(&self) -> bool {
        matches!(self.class, ErrorClass::DuplicateItem)
    }

    #[must_use]
    pub const fn is_item_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::ItemNotFound)
    }

    #[must_use]
    pub const fn is_commit(&self) -> bool {
        matches!(self.class, ErrorClass::Commit)
    }

    #[must_use]
    pub const fn is_rollback(&self) -> bool {
        matches!(self.class, ErrorClass::Rollback)
    }

    /// Commit phase recorded on storage-backed commit failures.
    #[must_use]
    pub const fn commit_phase(&self) -> Option<CommitPhase> {
        match &self.detail {
            Some(ErrorDetail::Commit { phase, .. }) => Some(*phase),
            Some(ErrorDetail::NotApplied { .. }) => Some(CommitPhase::Submit),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Self::new(ErrorClass::Codec, ErrorOrigin::Codec, err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorDetail
///
/// Structured, class-specific error detail carried by [`Error`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("commit failed during {phase}: {source}")]
    Commit {
        phase: CommitPhase,
        source: StorageError,
    },

    #[error("view '{view}', identifier {id}")]
    Item { view: String, id: Identifier },

    #[error("conditional batch of {statements} statements not applied")]
    NotApplied { statements: usize },

    #[error("{0}")]
    Storage(StorageError),
}

///
/// CommitPhase
///
/// `Probe` failures never send the batch. `Submit` failures happen at or
/// after submission; unless the batch was reported as not applied, the
/// outcome is ambiguous.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommitPhase {
    Probe,
    Submit,
}

impl fmt::Display for CommitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Probe => "probe",
            Self::Submit => "submit",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorClass {
    Codec,
    Commit,
    Configuration,
    DuplicateItem,
    Internal,
    InvalidArgument,
    InvalidIdentifier,
    ItemNotFound,
    KeyDefinition,
    Rollback,
    Storage,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Codec => "codec",
            Self::Commit => "commit",
            Self::Configuration => "configuration",
            Self::DuplicateItem => "duplicate_item",
            Self::Internal => "internal",
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidIdentifier => "invalid_identifier",
            Self::ItemNotFound => "item_not_found",
            Self::KeyDefinition => "key_definition",
            Self::Rollback => "rollback",
            Self::Storage => "storage",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorOrigin {
    Codec,
    Commit,
    Config,
    Document,
    Key,
    Repository,
    Schema,
    Session,
    Statement,
    UnitOfWork,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Codec => "codec",
            Self::Commit => "commit",
            Self::Config => "config",
            Self::Document => "document",
            Self::Key => "key",
            Self::Repository => "repository",
            Self::Schema => "schema",
            Self::Session => "session",
            Self::Statement => "statement",
            Self::UnitOfWork => "unit_of_work",
        };
        write!(f, "{label}")
    }
}
