//! Document Node Service.
//!
//! Every call is a fresh load, evaluate, (mutate, store) cycle on one
//! connection; nothing is cached between calls.
//!
//! Outcome channels:
//! - reads that return a [`Lookup`] report a missing node as
//!   `Lookup::NotFound`, and degrade to it when the backend fails
//! - reads that must produce a value (`get_all_attributes`,
//!   `get_attribute_value`, `get_structured_nodes`) raise instead
//! - mutations return `false` when the target does not resolve
//! - a locator that does not parse matches nothing
//! - an unknown document is always `DocumentNotFound`, except for
//!   `node_exists`, which never fails

use crate::config::ServiceConfig;
use crate::document::{Document, DocumentId, DocumentPatch, DocumentSummary};
use crate::error::{DbError, Result};
use crate::operation::{Lookup, NodeOperation, OperationOutput};
use crate::store::{DocumentStore, StoreConnection};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use xds_query::{IntoLocator, Locator};
use xds_xml::{NodeId, XmlDocument};

/// A locator after parsing, plus the text used in logs and errors.
struct Target {
    locator: Option<Locator>,
    label: String,
}

impl Target {
    fn resolve(locator: impl IntoLocator) -> Self {
        match locator.into_locator() {
            Ok(locator) => Self {
                label: locator.to_string(),
                locator: Some(locator),
            },
            Err(err) => {
                warn!(error = %err, "locator does not parse, treating as no match");
                Self {
                    locator: None,
                    label: format!("<invalid locator: {}>", err),
                }
            }
        }
    }

    fn select(&self, tree: &XmlDocument) -> Vec<NodeId> {
        match &self.locator {
            Some(locator) => tree.select(locator),
            None => Vec::new(),
        }
    }
}

fn document_not_found(id: DocumentId) -> DbError {
    DbError::DocumentNotFound(format!("id {}", id))
}

/// Node-level operations over documents held in a [`DocumentStore`].
pub struct XmlService<S: DocumentStore> {
    store: S,
    config: ServiceConfig,
}

impl<S: DocumentStore> XmlService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // === Documents ===

    /// Store a new document. The content is checked for well-formedness
    /// and saved in normalized form.
    pub fn create_document(
        &self,
        title: &str,
        description: &str,
        xml: &str,
    ) -> Result<DocumentId> {
        let content = XmlDocument::parse(xml)?.to_xml();
        let mut conn = self.store.connect()?;
        let id = conn.insert(Document::new(title, description, content))?;
        info!(%id, title, "document created");
        Ok(id)
    }

    /// [`create_document`](Self::create_document) with content read from a file.
    pub fn create_document_from_file(
        &self,
        title: &str,
        description: &str,
        path: impl AsRef<Path>,
    ) -> Result<DocumentId> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        self.create_document(title, description, &xml)
    }

    /// Update any subset of title, description and content.
    pub fn modify_document(&self, id: DocumentId, mut patch: DocumentPatch) -> Result<()> {
        if let Some(xml) = patch.content.take() {
            patch.content = Some(XmlDocument::parse(&xml)?.to_xml());
        }
        let mut conn = self.store.connect()?;
        if patch.is_empty() {
            return match conn.fetch_by_id(id)? {
                Some(_) => Ok(()),
                None => Err(document_not_found(id)),
            };
        }
        let version = conn.update_fields(id, &patch)?;
        info!(%id, version, "document modified");
        Ok(())
    }

    /// Returns `false` when there was nothing to delete.
    pub fn delete_document(&self, id: DocumentId) -> Result<bool> {
        let removed = self.store.connect()?.delete(id)?;
        debug!(%id, removed, "delete document");
        Ok(removed)
    }

    /// Returns the number of documents removed.
    pub fn delete_all_documents(&self) -> Result<usize> {
        let removed = self.store.connect()?.delete_all()?;
        info!(removed, "all documents deleted");
        Ok(removed)
    }

    pub fn get_document(&self, id: DocumentId) -> Result<Document> {
        self.store
            .connect()?
            .fetch_by_id(id)?
            .ok_or_else(|| document_not_found(id))
    }

    pub fn get_document_by_title(&self, title: &str) -> Result<Document> {
        self.store
            .connect()?
            .fetch_by_title(title)?
            .ok_or_else(|| DbError::DocumentNotFound(format!("title {:?}", title)))
    }

    pub fn get_all_documents(&self) -> Result<Vec<DocumentSummary>> {
        let documents = self.store.connect()?.fetch_all()?;
        Ok(documents.iter().map(Document::summary).collect())
    }

    pub fn count_documents(&self) -> Result<usize> {
        Ok(self.store.connect()?.count()?)
    }

    pub fn check_connection(&self) -> bool {
        self.store.check_reachable()
    }

    /// Indented content for display.
    pub fn pretty_content(&self, id: DocumentId) -> Result<String> {
        let (_, tree) = self.load(id)?;
        Ok(tree.to_pretty_xml(self.config.pretty_indent))
    }

    // === Reads ===

    /// Whether the locator matches at least one node. Never fails: an
    /// unknown document or an unreachable store is reported as `false`.
    pub fn node_exists(&self, id: DocumentId, locator: impl IntoLocator) -> bool {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "node_exists");
        match self.load(id) {
            Ok((_, tree)) => !target.select(&tree).is_empty(),
            Err(err) => {
                debug!(%id, error = %err, "node_exists on unavailable document");
                false
            }
        }
    }

    /// Serialized XML of every match, concatenated in document order.
    pub fn get_node_xml(&self, id: DocumentId, locator: impl IntoLocator) -> Result<Lookup<String>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "get_node_xml");
        self.read(id, |tree| {
            let hits = target.select(tree);
            if hits.is_empty() {
                return Ok(Lookup::NotFound);
            }
            Ok(Lookup::Found(hits.iter().map(|&n| tree.node_xml(n)).collect()))
        })
    }

    /// Text content of the first match.
    pub fn get_node_text(&self, id: DocumentId, locator: impl IntoLocator) -> Result<Lookup<String>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "get_node_text");
        self.read(id, |tree| {
            Ok(match target.select(tree).first() {
                None => Lookup::NotFound,
                Some(&node) => {
                    let text = tree.text(node);
                    if text.is_empty() {
                        Lookup::Empty
                    } else {
                        Lookup::Found(text)
                    }
                }
            })
        })
    }

    /// Serialized XML of each match.
    pub fn get_all_matching_xml(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
    ) -> Result<Lookup<Vec<String>>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "get_all_matching_xml");
        self.read(id, |tree| {
            let hits = target.select(tree);
            if hits.is_empty() {
                return Ok(Lookup::NotFound);
            }
            Ok(Lookup::Found(hits.iter().map(|&n| tree.node_xml(n)).collect()))
        })
    }

    /// Text content of each match.
    pub fn get_all_matching_text(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
    ) -> Result<Lookup<Vec<String>>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "get_all_matching_text");
        self.read(id, |tree| {
            let hits = target.select(tree);
            if hits.is_empty() {
                return Ok(Lookup::NotFound);
            }
            Ok(Lookup::Found(hits.iter().map(|&n| tree.text(n)).collect()))
        })
    }

    /// Attributes of the first match. `Empty` when it has none;
    /// `NodeNotFound` when nothing matches.
    pub fn get_all_attributes(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
    ) -> Result<Lookup<BTreeMap<String, String>>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "get_all_attributes");
        let (_, tree) = self.load(id)?;
        let node = match target.select(&tree).first() {
            Some(&node) => node,
            None => return Err(DbError::NodeNotFound(target.label)),
        };
        let attributes: BTreeMap<String, String> = tree.attributes(node).iter().cloned().collect();
        if attributes.is_empty() {
            Ok(Lookup::Empty)
        } else {
            Ok(Lookup::Found(attributes))
        }
    }

    /// One record per match. Each field locator is evaluated relative to
    /// the match; the record maps the field to the text of its first hit.
    /// Fields that resolve to nothing are left out of the record.
    pub fn get_structured_nodes<F: AsRef<str>>(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
        fields: &[F],
    ) -> Result<Vec<BTreeMap<String, String>>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, fields = fields.len(), "get_structured_nodes");
        let (_, tree) = self.load(id)?;
        let hits = target.select(&tree);
        if hits.is_empty() {
            return Err(DbError::NoMatches(target.label));
        }

        let field_locators: Vec<(&str, Option<Locator>)> = fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                let parsed = Locator::parse(field)
                    .map_err(|err| warn!(field, error = %err, "field locator does not parse"))
                    .ok();
                (field, parsed)
            })
            .collect();

        Ok(hits
            .into_iter()
            .map(|node| {
                field_locators
                    .iter()
                    .filter_map(|(field, locator)| {
                        let locator = locator.as_ref()?;
                        let first = *tree.select_from(node, locator).first()?;
                        Some((field.to_string(), tree.text(first)))
                    })
                    .collect()
            })
            .collect())
    }

    /// Value of one attribute on the first match.
    pub fn get_attribute_value(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
        name: &str,
    ) -> Result<String> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, attribute = name, "get_attribute_value");
        let (_, tree) = self.load(id)?;
        target
            .select(&tree)
            .first()
            .and_then(|&node| tree.attribute(node, name))
            .map(str::to_string)
            .ok_or(DbError::AttributeNotFound {
                locator: target.label,
                attribute: name.to_string(),
            })
    }

    /// Serialized matches carrying `name` (with `value`, when given).
    /// `Empty` when nodes match but none pass the attribute filter.
    pub fn get_nodes_with_attribute(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
        name: &str,
        value: Option<&str>,
    ) -> Result<Lookup<Vec<String>>> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, attribute = name, ?value, "get_nodes_with_attribute");
        self.read(id, |tree| {
            let hits = target.select(tree);
            if hits.is_empty() {
                return Ok(Lookup::NotFound);
            }
            let kept: Vec<String> = hits
                .into_iter()
                .filter(|&node| match (tree.attribute(node, name), value) {
                    (Some(actual), Some(expected)) => actual == expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                })
                .map(|node| tree.node_xml(node))
                .collect();
            Ok(if kept.is_empty() {
                Lookup::Empty
            } else {
                Lookup::Found(kept)
            })
        })
    }

    // === Mutations ===

    /// Append `xml` as the last child(ren) of the first parent match. The
    /// fragment is validated before the document is even loaded.
    pub fn add_node(&self, id: DocumentId, parent: impl IntoLocator, xml: &str) -> Result<bool> {
        let fragment = XmlDocument::parse_fragment(xml)?;
        let target = Target::resolve(parent);
        debug!(%id, locator = %target.label, "add_node");
        self.mutate(id, &target, |tree, hits| {
            tree.append_fragment(hits[0], &fragment)?;
            Ok(true)
        })
    }

    /// Replace the text of the first match; child elements are kept.
    pub fn edit_node_text(&self, id: DocumentId, locator: impl IntoLocator, text: &str) -> Result<bool> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "edit_node_text");
        self.mutate(id, &target, |tree, hits| {
            tree.set_text(hits[0], text)?;
            Ok(true)
        })
    }

    /// Rename the first match, keeping its attributes and children.
    pub fn edit_node_name(&self, id: DocumentId, locator: impl IntoLocator, name: &str) -> Result<bool> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, new_name = name, "edit_node_name");
        self.mutate(id, &target, |tree, hits| {
            tree.rename(hits[0], name)?;
            Ok(true)
        })
    }

    /// Set an attribute on the first match, overwriting an existing value.
    pub fn add_attribute(
        &self,
        id: DocumentId,
        locator: impl IntoLocator,
        name: &str,
        value: &str,
    ) -> Result<bool> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, attribute = name, "add_attribute");
        self.mutate(id, &target, |tree, hits| {
            tree.set_attribute(hits[0], name, value)?;
            Ok(true)
        })
    }

    /// Remove an attribute from the first match. `false` when the node or
    /// the attribute is missing.
    pub fn remove_attribute(&self, id: DocumentId, locator: impl IntoLocator, name: &str) -> Result<bool> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, attribute = name, "remove_attribute");
        self.mutate(id, &target, |tree, hits| {
            tree.remove_attribute(hits[0], name).map_err(DbError::from)
        })
    }

    /// Delete every match with its subtree.
    pub fn delete_node(&self, id: DocumentId, locator: impl IntoLocator) -> Result<bool> {
        let target = Target::resolve(locator);
        debug!(%id, locator = %target.label, "delete_node");
        self.mutate(id, &target, |tree, hits| {
            for &node in hits {
                tree.detach(node);
            }
            Ok(true)
        })
    }

    // === Dispatch ===

    /// Run one operation.
    pub fn execute(&self, id: DocumentId, operation: NodeOperation) -> Result<OperationOutput> {
        use NodeOperation as Op;
        use OperationOutput as Out;

        Ok(match operation {
            Op::Exists { locator } => Out::Bool(self.node_exists(id, &locator)),
            Op::GetXml { locator } => Out::Text(self.get_node_xml(id, &locator)?),
            Op::GetText { locator } => Out::Text(self.get_node_text(id, &locator)?),
            Op::GetAllXml { locator } => Out::List(self.get_all_matching_xml(id, &locator)?),
            Op::GetAllText { locator } => Out::List(self.get_all_matching_text(id, &locator)?),
            Op::GetAttributes { locator } => Out::Attributes(self.get_all_attributes(id, &locator)?),
            Op::GetStructured { locator, fields } => {
                Out::Records(self.get_structured_nodes(id, &locator, &fields)?)
            }
            Op::GetAttribute { locator, name } => {
                Out::Value(self.get_attribute_value(id, &locator, &name)?)
            }
            Op::GetWithAttribute { locator, name, value } => Out::List(
                self.get_nodes_with_attribute(id, &locator, &name, value.as_deref())?,
            ),
            Op::AddNode { parent, xml } => Out::Bool(self.add_node(id, &parent, &xml)?),
            Op::EditText { locator, text } => Out::Bool(self.edit_node_text(id, &locator, &text)?),
            Op::Rename { locator, name } => Out::Bool(self.edit_node_name(id, &locator, &name)?),
            Op::AddAttribute { locator, name, value } => {
                Out::Bool(self.add_attribute(id, &locator, &name, &value)?)
            }
            Op::RemoveAttribute { locator, name } => {
                Out::Bool(self.remove_attribute(id, &locator, &name)?)
            }
            Op::Delete { locator } => Out::Bool(self.delete_node(id, &locator)?),
        })
    }

    // === Internals ===

    fn load(&self, id: DocumentId) -> Result<(Document, XmlDocument)> {
        let mut conn = self.store.connect()?;
        let document = conn.fetch_by_id(id)?.ok_or_else(|| document_not_found(id))?;
        let tree = XmlDocument::parse(&document.content)?;
        Ok((document, tree))
    }

    /// Load and evaluate; a failing backend reads as `NotFound`.
    fn read<T>(
        &self,
        id: DocumentId,
        f: impl FnOnce(&XmlDocument) -> Result<Lookup<T>>,
    ) -> Result<Lookup<T>> {
        match self.load(id) {
            Ok((_, tree)) => f(&tree),
            Err(DbError::Store(err)) => {
                warn!(%id, error = %err, "store failure, reporting no match");
                Ok(Lookup::NotFound)
            }
            Err(err) => Err(err),
        }
    }

    /// Load, evaluate, apply `edit` to the matches and store the result.
    /// `edit` only runs when there is at least one match. The edited tree
    /// is re-parsed before it is written, so nothing ill-formed is stored.
    fn mutate(
        &self,
        id: DocumentId,
        target: &Target,
        edit: impl FnOnce(&mut XmlDocument, &[NodeId]) -> Result<bool>,
    ) -> Result<bool> {
        let mut conn = self.store.connect()?;
        let document = conn.fetch_by_id(id)?.ok_or_else(|| document_not_found(id))?;
        let mut tree = XmlDocument::parse(&document.content)?;

        let hits = target.select(&tree);
        if hits.is_empty() {
            debug!(%id, locator = %target.label, "no match, nothing to change");
            return Ok(false);
        }
        if !edit(&mut tree, &hits)? {
            return Ok(false);
        }

        let content = tree.to_xml();
        XmlDocument::parse(&content)?;
        let expected = self.config.optimistic_concurrency.then_some(document.version);
        let version = conn.update_content(id, &content, expected)?;
        debug!(%id, version, matches = hits.len(), "document content updated");
        Ok(true)
    }
}
