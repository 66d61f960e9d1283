//! # xds-xml
//!
//! In-memory XML tree for the XML Document Store.
//!
//! - Parsing with `quick-xml` into an arena of nodes ([`XmlDocument`])
//! - Locator evaluation ([`XmlDocument::select`], [`XmlDocument::select_from`])
//! - Node-level edits: rename, text, attributes, appending fragments, detaching
//! - Compact serialization (the stored form) and an indented display form
//!
//! ## Example
//!
//! ```rust
//! use xds_query::Locator;
//! use xds_xml::XmlDocument;
//!
//! let mut doc = XmlDocument::parse("<catalog><book id=\"1\"/></catalog>").unwrap();
//! let book = doc.select(&Locator::parse("//book[@id=1]").unwrap())[0];
//! doc.set_attribute(book, "lang", "pl").unwrap();
//! assert_eq!(doc.to_xml(), r#"<catalog><book id="1" lang="pl"/></catalog>"#);
//! ```

pub mod error;
mod parse;
mod select;
pub mod serialize;
pub mod tree;

pub use error::{Result, XmlError};
pub use serialize::{escape_attr, escape_text};
pub use tree::{NodeId, NodeKind, XmlDocument};
