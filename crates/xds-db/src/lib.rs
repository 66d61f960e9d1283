//! # xds-db
//!
//! Document storage and the node-level XML service.
//!
//! This crate provides:
//! - [`DocumentStore`] / [`StoreConnection`]: the persistence backend seam,
//!   with [`MemoryDocumentStore`] and the JSON-file [`FileDocumentStore`]
//! - [`XmlService`]: document CRUD plus reads and edits addressed by
//!   locators
//! - [`NodeOperation`] / [`OperationOutput`]: the same operations as data
//!
//! ## Example
//!
//! ```rust
//! use xds_db::{Lookup, MemoryDocumentStore, XmlService};
//! use xds_query::QueryBuilder;
//!
//! let service = XmlService::new(MemoryDocumentStore::new());
//! let id = service
//!     .create_document("books", "", "<catalog><book><title>A</title></book></catalog>")
//!     .unwrap();
//!
//! let titles = QueryBuilder::search("book").go_to("title");
//! assert_eq!(
//!     service.get_all_matching_text(id, &titles).unwrap(),
//!     Lookup::Found(vec!["A".to_string()])
//! );
//! assert!(service.edit_node_name(id, "//title", "name").unwrap());
//! assert!(!service.node_exists(id, "//title"));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod file_store;
pub mod operation;
pub mod service;
pub mod store;

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use document::{Document, DocumentId, DocumentPatch, DocumentSummary};
pub use error::{DbError, Result, StoreError};
pub use file_store::FileDocumentStore;
pub use operation::{Lookup, NodeOperation, OperationOutput};
pub use service::XmlService;
pub use store::{DocumentStore, MemoryDocumentStore, StoreConnection};
