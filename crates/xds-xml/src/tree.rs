//! Arena-backed XML tree.
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`]. A
//! detached node stays in the arena but is no longer reachable from the
//! document node, so it disappears from serialization and selection.

use crate::error::{Result, XmlError};
use xds_query::is_valid_name;

/// The XML 1.0 `Char` production.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\u{9}' | '\u{A}' | '\u{D}' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

pub(crate) fn check_chars(text: &str, context: &'static str) -> Result<()> {
    match text.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(XmlError::InvalidChar {
            context,
            code: c as u32,
        }),
        None => Ok(()),
    }
}

/// Index of a node inside its [`XmlDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// A parsed XML document (or fragment) held as a tree.
#[derive(Clone, Debug)]
pub struct XmlDocument {
    pub(crate) nodes: Vec<NodeData>,
}

impl XmlDocument {
    pub(crate) const DOCUMENT: NodeId = NodeId(0);

    pub(crate) fn empty() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    // === Navigation ===

    /// The document node every absolute locator starts from.
    pub fn document_node(&self) -> NodeId {
        Self::DOCUMENT
    }

    /// The first top-level element.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(Self::DOCUMENT)
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child elements in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.is_element(child))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    /// Element name, `None` for other node kinds.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attributes in document order; empty for non-elements.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// String value: all descendant text and CDATA, concatenated.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
            NodeKind::Comment(_) => {}
            NodeKind::Document | NodeKind::Element { .. } => {
                for &child in &self.nodes[id.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// `id` itself followed by all of its descendants, in document order.
    pub(crate) fn self_and_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            for &child in self.nodes[next.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Preorder rank of every attached node; detached nodes rank `usize::MAX`.
    pub(crate) fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        for (rank, id) in self.self_and_descendants(Self::DOCUMENT).into_iter().enumerate() {
            order[id.0] = rank;
        }
        order
    }

    // === Mutation ===

    fn element_mut(&mut self, id: NodeId) -> Result<(&mut String, &mut Vec<(String, String)>)> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { name, attributes } => Ok((name, attributes)),
            _ => Err(XmlError::NotAnElement),
        }
    }

    /// Rename an element, keeping its attributes and children.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        if !is_valid_name(new_name) {
            return Err(XmlError::InvalidName(new_name.to_string()));
        }
        let (name, _) = self.element_mut(id)?;
        *name = new_name.to_string();
        Ok(())
    }

    /// Replace the element's first text child, or append one when it has
    /// none. Child elements are kept. An empty `text` removes that child.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        check_chars(text, "text")?;
        self.element_mut(id)?;
        let existing = self.nodes[id.0]
            .children
            .iter()
            .position(|c| matches!(self.nodes[c.0].kind, NodeKind::Text(_) | NodeKind::CData(_)));

        match (existing, text.is_empty()) {
            (Some(pos), true) => {
                let child = self.nodes[id.0].children.remove(pos);
                self.nodes[child.0].parent = None;
            }
            (Some(pos), false) => {
                let child = self.nodes[id.0].children[pos];
                self.nodes[child.0].kind = NodeKind::Text(text.to_string());
            }
            (None, true) => {}
            (None, false) => {
                self.push_child(id, NodeKind::Text(text.to_string()));
            }
        }
        Ok(())
    }

    /// Add an attribute, or overwrite its value when already present.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Err(XmlError::InvalidName(name.to_string()));
        }
        check_chars(value, "attribute value")?;
        let (_, attributes) = self.element_mut(id)?;
        match attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Remove an attribute. Returns whether it was there.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let (_, attributes) = self.element_mut(id)?;
        let before = attributes.len();
        attributes.retain(|(k, _)| k != name);
        Ok(attributes.len() != before)
    }

    /// Deep-copy the top-level nodes of `fragment` as the last children of
    /// `parent`. Returns the ids of the copied top-level nodes.
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &XmlDocument) -> Result<Vec<NodeId>> {
        self.element_mut(parent)?;
        let mut added = Vec::new();
        for &top in fragment.children(Self::DOCUMENT) {
            added.push(self.copy_subtree(parent, fragment, top));
        }
        Ok(added)
    }

    fn copy_subtree(&mut self, parent: NodeId, source: &XmlDocument, node: NodeId) -> NodeId {
        let copy = self.push_child(parent, source.kind(node).clone());
        for &child in source.children(node) {
            self.copy_subtree(copy, source, child);
        }
        copy
    }

    /// Unlink a node from its parent. The document node cannot be detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let parent = match self.nodes[id.0].parent {
            Some(p) => p,
            None => return false,
        };
        let siblings = &mut self.nodes[parent.0].children;
        let before = siblings.len();
        siblings.retain(|&c| c != id);
        let removed = siblings.len() != before;
        if removed {
            self.nodes[id.0].parent = None;
        }
        removed
    }
}
