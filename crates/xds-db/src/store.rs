//! Persistence backend abstraction and the in-memory backend.
//!
//! A [`DocumentStore`] hands out a [`StoreConnection`] scoped to a single
//! service operation. The connection is released when dropped, so every
//! exit path (including `?`) gives it back.

use crate::document::{Document, DocumentId, DocumentPatch};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// A persistence backend for documents.
pub trait DocumentStore: Send + Sync {
    type Connection<'a>: StoreConnection
    where
        Self: 'a;

    /// Acquire a connection for one operation.
    fn connect(&self) -> Result<Self::Connection<'_>, StoreError>;

    /// Whether the backend currently answers.
    fn check_reachable(&self) -> bool;
}

/// Statements available on an open connection.
pub trait StoreConnection {
    fn fetch_by_id(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    fn fetch_by_title(&mut self, title: &str) -> Result<Option<Document>, StoreError>;

    /// All documents ordered by id.
    fn fetch_all(&mut self) -> Result<Vec<Document>, StoreError>;

    /// Insert a new row and return its id. Fails with `DuplicateTitle`.
    fn insert(&mut self, document: Document) -> Result<DocumentId, StoreError>;

    /// Replace the content. When `expected_version` is given and differs
    /// from the stored version, fails with `VersionConflict`. Returns the
    /// new version.
    fn update_content(
        &mut self,
        id: DocumentId,
        content: &str,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// Apply a patch. Returns the new version.
    fn update_fields(&mut self, id: DocumentId, patch: &DocumentPatch) -> Result<u64, StoreError>;

    /// Returns whether a row was removed.
    fn delete(&mut self, id: DocumentId) -> Result<bool, StoreError>;

    /// Returns the number of rows removed.
    fn delete_all(&mut self) -> Result<usize, StoreError>;

    fn count(&mut self) -> Result<usize, StoreError>;
}

// === Tables ===

/// Rows plus the title index and id counter, shared by both backends.
#[derive(Clone, Debug, Default)]
pub(crate) struct Tables {
    pub(crate) documents: BTreeMap<DocumentId, Document>,
    title_index: BTreeMap<String, DocumentId>,
    /// Last id handed out; survives deletions.
    pub(crate) last_id: u64,
}

impl Tables {
    pub(crate) fn from_rows(last_id: u64, rows: Vec<Document>) -> Self {
        let mut tables = Self {
            last_id,
            ..Self::default()
        };
        for doc in rows {
            tables.last_id = tables.last_id.max(doc.id.0);
            tables.title_index.insert(doc.title.clone(), doc.id);
            tables.documents.insert(doc.id, doc);
        }
        tables
    }

    pub(crate) fn by_id(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(&id).cloned()
    }

    pub(crate) fn by_title(&self, title: &str) -> Option<Document> {
        self.title_index
            .get(title)
            .and_then(|id| self.documents.get(id))
            .cloned()
    }

    pub(crate) fn all(&self) -> Vec<Document> {
        self.documents.values().cloned().collect()
    }

    pub(crate) fn insert(&mut self, mut document: Document) -> Result<DocumentId, StoreError> {
        if self.title_index.contains_key(&document.title) {
            return Err(StoreError::DuplicateTitle(document.title));
        }
        self.last_id += 1;
        let id = DocumentId(self.last_id);
        document.id = id;
        self.title_index.insert(document.title.clone(), id);
        self.documents.insert(id, document);
        Ok(id)
    }

    pub(crate) fn update_content(
        &mut self,
        id: DocumentId,
        content: &str,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let doc = self
            .documents
            .get_mut(&id)
            .ok_or(StoreError::Missing(id))?;
        if let Some(expected) = expected_version {
            if doc.version != expected {
                return Err(StoreError::VersionConflict {
                    id,
                    expected,
                    found: doc.version,
                });
            }
        }
        doc.content = content.to_string();
        doc.touch();
        Ok(doc.version)
    }

    pub(crate) fn update_fields(
        &mut self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> Result<u64, StoreError> {
        let old_title = match self.documents.get(&id) {
            Some(doc) => doc.title.clone(),
            None => return Err(StoreError::Missing(id)),
        };
        if let Some(title) = &patch.title {
            if self.title_index.get(title).map_or(false, |&owner| owner != id) {
                return Err(StoreError::DuplicateTitle(title.clone()));
            }
        }

        let doc = self
            .documents
            .get_mut(&id)
            .ok_or(StoreError::Missing(id))?;
        patch.apply_to(doc);
        doc.touch();
        let version = doc.version;
        if doc.title != old_title {
            let title = doc.title.clone();
            self.title_index.remove(&old_title);
            self.title_index.insert(title, id);
        }
        Ok(version)
    }

    pub(crate) fn delete(&mut self, id: DocumentId) -> bool {
        match self.documents.remove(&id) {
            Some(doc) => {
                self.title_index.remove(&doc.title);
                true
            }
            None => false,
        }
    }

    pub(crate) fn delete_all(&mut self) -> usize {
        let removed = self.documents.len();
        self.documents.clear();
        self.title_index.clear();
        removed
    }
}

// === Memory backend ===

/// In-process backend. Each statement takes the lock on its own, so a
/// read-modify-write spans two lock scopes and can interleave with other
/// writers; version checks catch that.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    tables: RwLock<Tables>,
    reachable: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Rewrite a document's content behind the service's back, bumping the
    /// version like any other writer would.
    pub fn overwrite_content(&self, id: DocumentId, content: &str) -> Result<u64, StoreError> {
        self.tables.write().update_content(id, content, None)
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    type Connection<'a> = MemoryConnection<'a>;

    fn connect(&self) -> Result<MemoryConnection<'_>, StoreError> {
        if !self.check_reachable() {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        trace!("memory connection acquired");
        Ok(MemoryConnection { store: self })
    }

    fn check_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Connection to a [`MemoryDocumentStore`].
pub struct MemoryConnection<'a> {
    store: &'a MemoryDocumentStore,
}

impl MemoryConnection<'_> {
    fn ensure_reachable(&self) -> Result<(), StoreError> {
        if self.store.check_reachable() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store went offline".to_string()))
        }
    }
}

impl Drop for MemoryConnection<'_> {
    fn drop(&mut self) {
        trace!("memory connection released");
    }
}

impl StoreConnection for MemoryConnection<'_> {
    fn fetch_by_id(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.ensure_reachable()?;
        Ok(self.store.tables.read().by_id(id))
    }

    fn fetch_by_title(&mut self, title: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_reachable()?;
        Ok(self.store.tables.read().by_title(title))
    }

    fn fetch_all(&mut self) -> Result<Vec<Document>, StoreError> {
        self.ensure_reachable()?;
        Ok(self.store.tables.read().all())
    }

    fn insert(&mut self, document: Document) -> Result<DocumentId, StoreError> {
        self.ensure_reachable()?;
        self.store.tables.write().insert(document)
    }

    fn update_content(
        &mut self,
        id: DocumentId,
        content: &str,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.ensure_reachable()?;
        self.store
            .tables
            .write()
            .update_content(id, content, expected_version)
    }

    fn update_fields(&mut self, id: DocumentId, patch: &DocumentPatch) -> Result<u64, StoreError> {
        self.ensure_reachable()?;
        self.store.tables.write().update_fields(id, patch)
    }

    fn delete(&mut self, id: DocumentId) -> Result<bool, StoreError> {
        self.ensure_reachable()?;
        Ok(self.store.tables.write().delete(id))
    }

    fn delete_all(&mut self) -> Result<usize, StoreError> {
        self.ensure_reachable()?;
        Ok(self.store.tables.write().delete_all())
    }

    fn count(&mut self) -> Result<usize, StoreError> {
        self.ensure_reachable()?;
        Ok(self.store.tables.read().documents.len())
    }
}
