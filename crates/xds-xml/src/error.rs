//! Error types for XML parsing and editing.

use thiserror::Error;

/// Errors that make content not well-formed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML syntax error at position {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("Unexpected closing tag </{0}>")]
    UnexpectedEndTag(String),

    #[error("Unclosed element(s): <{}>", .0.join(">, <"))]
    UnclosedElements(Vec<String>),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Document has more than one root element (second root: <{0}>)")]
    MultipleRoots(String),

    #[error("Text is not allowed outside the root element")]
    TextOutsideRoot,

    #[error("Fragment contains no element")]
    EmptyFragment,

    #[error("Invalid XML name: {0:?}")]
    InvalidName(String),

    #[error("Character U+{code:04X} is not allowed in {context}")]
    InvalidChar { context: &'static str, code: u32 },

    #[error("Node is not an element")]
    NotAnElement,

    #[error("Invalid UTF-8 in {context}: {message}")]
    Encoding { context: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, XmlError>;
