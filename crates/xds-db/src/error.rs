//! Error types for the store and the node service.

use crate::document::DocumentId;
use thiserror::Error;
use xds_xml::XmlError;

/// Errors raised by a persistence backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store is unreachable: {0}")]
    Unavailable(String),

    #[error("Document with title {0:?} is already in the database")]
    DuplicateTitle(String),

    #[error("Document {id} changed underneath (expected version {expected}, found {found})")]
    VersionConflict {
        id: DocumentId,
        expected: u64,
        found: u64,
    },

    #[error("Document {0} does not exist")]
    Missing(DocumentId),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors surfaced by [`XmlService`](crate::service::XmlService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document with title {0:?} is already in the database")]
    DuplicateTitle(String),

    #[error("Invalid XML: {0}")]
    InvalidXml(#[from] XmlError),

    #[error("Node with path {0} does not exist")]
    NodeNotFound(String),

    #[error("Attribute {attribute:?} not found at {locator}")]
    AttributeNotFound { locator: String, attribute: String },

    #[error("No nodes match {0}")]
    NoMatches(String),

    #[error("Document {0} was modified concurrently")]
    ConcurrentModification(DocumentId),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<StoreError> for DbError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateTitle(title) => DbError::DuplicateTitle(title),
            StoreError::VersionConflict { id, .. } => DbError::ConcurrentModification(id),
            StoreError::Missing(id) => DbError::DocumentNotFound(format!("id {}", id)),
            other => DbError::Store(other),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
