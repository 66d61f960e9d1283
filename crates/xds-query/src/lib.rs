//! # xds-query
//!
//! Locators for the XML Document Store.
//!
//! This crate provides:
//! - [`Locator`], an ordered list of tagged segments (element name, axis,
//!   positional and attribute predicates)
//! - A parser and renderer for the textual form (`/catalog/book[2]/title`,
//!   `//book[@id=bk_105]`, `book/title`)
//! - [`QueryBuilder`], a fluent builder that assembles locators without
//!   touching a document
//!
//! ## Example
//!
//! ```rust
//! use xds_query::{Locator, QueryBuilder};
//!
//! let query = QueryBuilder::root("catalog")
//!     .go_to("book")
//!     .with_attribute("id", Some("bk_105"))
//!     .go_to("title");
//! assert_eq!(query.render(), "/catalog/book[@id=bk_105]/title");
//!
//! let locator: Locator = "/catalog/book[@id=bk_105]/title".parse().unwrap();
//! assert_eq!(query.locator().unwrap(), locator);
//! ```

pub mod builder;
pub mod error;
pub mod locator;

pub use builder::{IntoLocator, QueryBuilder};
pub use error::LocatorError;
pub use locator::{is_valid_name, Axis, Locator, Predicate, Segment};
