//! Tree to text.
//!
//! Compact output is the stored form: double-quoted attributes, `<a/>` for
//! empty elements, no whitespace between nodes.

use crate::tree::{NodeId, NodeKind, XmlDocument};
use std::borrow::Cow;

/// Escape XML text content.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>')) {
        let mut out = String::with_capacity(s.len() + 8);
        for c in s.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                _ => out.push(c),
            }
        }
        Cow::Owned(out)
    } else {
        Cow::Borrowed(s)
    }
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\n' | b'\t' | b'\r')) {
        let mut out = String::with_capacity(s.len() + 8);
        for c in s.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\n' => out.push_str("&#10;"),
                '\t' => out.push_str("&#9;"),
                '\r' => out.push_str("&#13;"),
                _ => out.push(c),
            }
        }
        Cow::Owned(out)
    } else {
        Cow::Borrowed(s)
    }
}

impl XmlDocument {
    /// Compact serialization of the whole document.
    pub fn to_xml(&self) -> String {
        self.node_xml(self.document_node())
    }

    /// Compact serialization of one node and its subtree.
    pub fn node_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_compact(id, &mut out);
        out
    }

    /// Indented serialization for display. Elements holding text keep
    /// their content on one line so no whitespace is added to text.
    pub fn to_pretty_xml(&self, indent: usize) -> String {
        let mut out = String::new();
        for &child in self.children(self.document_node()) {
            self.write_pretty(child, 0, indent, &mut out);
        }
        out
    }

    fn write_compact(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_compact(child, out);
                }
            }
            NodeKind::Element { name, attributes } => {
                write_open_tag(name, attributes, out);
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_compact(child, out);
                }
                write_close_tag(name, out);
            }
            other => write_leaf(other, out),
        }
    }

    fn write_pretty(&self, id: NodeId, depth: usize, indent: usize, out: &mut String) {
        let pad = " ".repeat(depth * indent);
        match self.kind(id) {
            NodeKind::Element { name, attributes } => {
                let children = self.children(id);
                let mixed = children
                    .iter()
                    .any(|&c| matches!(self.kind(c), NodeKind::Text(_) | NodeKind::CData(_)));
                out.push_str(&pad);
                if children.is_empty() || mixed {
                    self.write_compact(id, out);
                    out.push('\n');
                    return;
                }
                write_open_tag(name, attributes, out);
                out.push_str(">\n");
                for &child in children {
                    self.write_pretty(child, depth + 1, indent, out);
                }
                out.push_str(&pad);
                write_close_tag(name, out);
                out.push('\n');
            }
            other => {
                out.push_str(&pad);
                write_leaf(other, out);
                out.push('\n');
            }
        }
    }
}

fn write_open_tag(name: &str, attributes: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
}

fn write_close_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn write_leaf(kind: &NodeKind, out: &mut String) {
    match kind {
        NodeKind::Text(text) => out.push_str(&escape_text(text)),
        NodeKind::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Document | NodeKind::Element { .. } => {}
    }
}
