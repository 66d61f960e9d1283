//! Stored documents.

use serde::{Deserialize, Serialize};

/// Store-assigned document identifier. Never reused after deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A document row: metadata plus well-formed XML content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Unique, case-sensitive.
    pub title: String,
    pub description: String,
    /// Normalized XML (see [`xds_xml::XmlDocument::to_xml`]).
    pub content: String,
    /// Incremented by the store on every write.
    pub version: u64,
    /// Creation timestamp (ms since epoch).
    pub created_at: u64,
    /// Last modified timestamp (ms since epoch).
    pub modified_at: u64,
}

impl Document {
    /// A row about to be inserted; the store fills in the id.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: DocumentId(0),
            title: title.into(),
            description: description.into(),
            content: content.into(),
            version: 1,
            created_at: now,
            modified_at: now,
        }
    }

    /// Bump the version and the modified timestamp.
    pub fn touch(&mut self) {
        self.version += 1;
        self.modified_at = now_millis();
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            version: self.version,
            modified_at: self.modified_at,
        }
    }
}

/// Listing row without the content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub description: String,
    pub version: u64,
    pub modified_at: u64,
}

/// Any subset of a document's editable fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.content.is_none()
    }

    /// Copy the supplied fields onto `document`.
    pub fn apply_to(&self, document: &mut Document) {
        if let Some(title) = &self.title {
            document.title = title.clone();
        }
        if let Some(description) = &self.description {
            document.description = description.clone();
        }
        if let Some(content) = &self.content {
            document.content = content.clone();
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let mut doc = Document::new("Books", "old", "<a/>");
        DocumentPatch::new().description("new").apply_to(&mut doc);
        assert_eq!(doc.title, "Books");
        assert_eq!(doc.description, "new");
        assert_eq!(doc.content, "<a/>");
        assert!(DocumentPatch::new().is_empty());
        assert!(!DocumentPatch::new().content("<b/>").is_empty());
    }

    #[test]
    fn test_touch_bumps_version() {
        let mut doc = Document::new("t", "", "<a/>");
        let created = doc.created_at;
        doc.touch();
        assert_eq!(doc.version, 2);
        assert!(doc.modified_at >= created);
    }
}
