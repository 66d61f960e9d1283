//! Error types for locator parsing and building.

use thiserror::Error;

/// Errors produced when reading or assembling a locator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Locator is empty")]
    Empty,

    #[error("Empty step at position {position}")]
    EmptyStep { position: usize },

    #[error("Invalid name character '{found}' at position {position}")]
    InvalidName { position: usize, found: char },

    #[error("Invalid segment name: {0:?}")]
    InvalidSegmentName(String),

    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("Locator ends with a separator at position {position}")]
    TrailingSlash { position: usize },

    #[error("Empty predicate at position {position}")]
    EmptyPredicate { position: usize },

    #[error("Unterminated predicate starting at position {position}")]
    UnterminatedPredicate { position: usize },

    #[error("Invalid position {text:?} at {position} (positions start at 1)")]
    InvalidPosition { position: usize, text: String },

    #[error("Predicate appended before any segment")]
    DanglingPredicate,
}
