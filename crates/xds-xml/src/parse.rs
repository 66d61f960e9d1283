//! quick-xml event stream to arena tree.

use crate::error::{Result, XmlError};
use crate::tree::{check_chars, NodeId, NodeKind, XmlDocument};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use xds_query::is_valid_name;

/// Whether the input must be a full document or may be a fragment.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Document,
    Fragment,
}

impl XmlDocument {
    /// Parse a complete document: exactly one root element, optionally
    /// surrounded by comments. Whitespace-only text is dropped; the XML
    /// declaration, processing instructions and DOCTYPE are skipped.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = build(xml, Mode::Document)?;
        let roots: Vec<NodeId> = doc.child_elements(doc.document_node()).collect();
        match roots.as_slice() {
            [] => Err(XmlError::NoRootElement),
            [_] => Ok(doc),
            [_, second, ..] => {
                let name = doc.name(*second).unwrap_or_default().to_string();
                Err(XmlError::MultipleRoots(name))
            }
        }
    }

    /// Parse a fragment: any sequence of elements, text and comments, as
    /// long as at least one element is present.
    pub fn parse_fragment(xml: &str) -> Result<Self> {
        let doc = build(xml, Mode::Fragment)?;
        if doc.root_element().is_none() {
            return Err(XmlError::EmptyFragment);
        }
        Ok(doc)
    }
}

fn build(xml: &str, mode: Mode) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = XmlDocument::empty();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        let parent = stack.last().copied().unwrap_or(XmlDocument::DOCUMENT);
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let kind = element_kind(e)?;
                let id = doc.push_child(parent, kind);
                stack.push(id);
            }
            Ok(Event::End(ref e)) => {
                if stack.pop().is_none() {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(XmlError::UnexpectedEndTag(name));
                }
            }
            Ok(Event::Empty(ref e)) => {
                let kind = element_kind(e)?;
                doc.push_child(parent, kind);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| XmlError::Syntax {
                        position: reader.error_position() as u64,
                        message: err.to_string(),
                    })?
                    .into_owned();
                check_chars(&text, "text")?;
                if text.chars().all(char::is_whitespace) {
                    continue;
                }
                if stack.is_empty() && mode == Mode::Document {
                    return Err(XmlError::TextOutsideRoot);
                }
                doc.push_child(parent, NodeKind::Text(text));
            }
            Ok(Event::CData(ref e)) => {
                let text = utf8(e.as_ref(), "CDATA")?;
                if stack.is_empty() && mode == Mode::Document {
                    return Err(XmlError::TextOutsideRoot);
                }
                check_chars(&text, "CDATA")?;
                doc.push_child(parent, NodeKind::CData(text));
            }
            Ok(Event::Comment(ref e)) => {
                let text = utf8(e.as_ref(), "comment")?;
                check_chars(&text, "comment")?;
                doc.push_child(parent, NodeKind::Comment(text));
            }
            Ok(Event::Eof) => {
                if !stack.is_empty() {
                    let unclosed = stack
                        .iter()
                        .filter_map(|&id| doc.name(id).map(str::to_string))
                        .collect();
                    return Err(XmlError::UnclosedElements(unclosed));
                }
                break;
            }
            // declaration, processing instructions, doctype
            Ok(_) => {}
            Err(e) => {
                return Err(XmlError::Syntax {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                })
            }
        }
    }

    Ok(doc)
}

fn element_kind(e: &BytesStart) -> Result<NodeKind> {
    let name = utf8(e.name().as_ref(), "element name")?;
    if !is_valid_name(&name) {
        return Err(XmlError::InvalidName(name));
    }
    let mut attributes: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError::Syntax {
            position: 0,
            message: format!("attribute error in <{}>: {}", name, err),
        })?;
        let key = utf8(attr.key.as_ref(), "attribute name")?;
        if !is_valid_name(&key) {
            return Err(XmlError::InvalidName(key));
        }
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Syntax {
                position: 0,
                message: format!("attribute {} in <{}>: {}", key, name, err),
            })?
            .into_owned();
        check_chars(&value, "attribute value")?;
        attributes.push((key, value));
    }
    Ok(NodeKind::Element { name, attributes })
}

fn utf8(bytes: &[u8], context: &'static str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| XmlError::Encoding {
            context,
            message: err.to_string(),
        })
}
