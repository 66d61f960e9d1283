//! JSON file backend.
//!
//! The whole table lives in one `serde_json` file. A connection holds the
//! store's lock, loads the file on acquire and writes it back after every
//! mutating statement, so operations through one store never interleave.
//! Writes go to a temporary file in the same directory that then replaces
//! the store file.

use crate::document::{Document, DocumentId, DocumentPatch};
use crate::error::StoreError;
use crate::store::{DocumentStore, StoreConnection, Tables};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreImage {
    last_id: u64,
    documents: Vec<Document>,
}

/// Backend persisting every document to a single JSON file.
#[derive(Debug)]
pub struct FileDocumentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDocumentStore {
    /// A store at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Tables, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "store file missing, starting empty");
            return Ok(Tables::default());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Tables::default());
        }
        let image: StoreImage = serde_json::from_str(&text)?;
        Ok(Tables::from_rows(image.last_id, image.documents))
    }
}

impl DocumentStore for FileDocumentStore {
    type Connection<'a> = FileConnection<'a>;

    fn connect(&self) -> Result<FileConnection<'_>, StoreError> {
        let guard = self.lock.lock();
        let tables = self.load()?;
        trace!(path = %self.path.display(), "file connection acquired");
        Ok(FileConnection {
            store: self,
            tables,
            _guard: guard,
        })
    }

    fn check_reachable(&self) -> bool {
        if self.path.exists() {
            return fs::metadata(&self.path).map(|m| m.is_file()).unwrap_or(false);
        }
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        }
    }
}

/// Connection to a [`FileDocumentStore`].
pub struct FileConnection<'a> {
    store: &'a FileDocumentStore,
    tables: Tables,
    _guard: MutexGuard<'a, ()>,
}

impl FileConnection<'_> {
    fn flush(&self) -> Result<(), StoreError> {
        let image = StoreImage {
            last_id: self.tables.last_id,
            documents: self.tables.all(),
        };
        let json = serde_json::to_string_pretty(&image)?;

        // a crash mid-write leaves the previous store file intact
        let dir = match self.store.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.store.path).map_err(|err| StoreError::from(err.error))?;
        trace!(documents = image.documents.len(), "store file written");
        Ok(())
    }
}

impl Drop for FileConnection<'_> {
    fn drop(&mut self) {
        trace!(path = %self.store.path.display(), "file connection released");
    }
}

impl StoreConnection for FileConnection<'_> {
    fn fetch_by_id(&mut self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.tables.by_id(id))
    }

    fn fetch_by_title(&mut self, title: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.tables.by_title(title))
    }

    fn fetch_all(&mut self) -> Result<Vec<Document>, StoreError> {
        Ok(self.tables.all())
    }

    fn insert(&mut self, document: Document) -> Result<DocumentId, StoreError> {
        let id = self.tables.insert(document)?;
        self.flush()?;
        Ok(id)
    }

    fn update_content(
        &mut self,
        id: DocumentId,
        content: &str,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let version = self.tables.update_content(id, content, expected_version)?;
        self.flush()?;
        Ok(version)
    }

    fn update_fields(&mut self, id: DocumentId, patch: &DocumentPatch) -> Result<u64, StoreError> {
        let version = self.tables.update_fields(id, patch)?;
        self.flush()?;
        Ok(version)
    }

    fn delete(&mut self, id: DocumentId) -> Result<bool, StoreError> {
        let removed = self.tables.delete(id);
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    fn delete_all(&mut self) -> Result<usize, StoreError> {
        let removed = self.tables.delete_all();
        self.flush()?;
        Ok(removed)
    }

    fn count(&mut self) -> Result<usize, StoreError> {
        Ok(self.tables.documents.len())
    }
}
