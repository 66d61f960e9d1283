//! Typed node operations and their results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a read that may legitimately find nothing.
///
/// `NotFound` means the locator matched no node; `Empty` means it matched
/// but the requested value is empty (no text, no attributes, no node
/// passing the attribute filter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup<T> {
    Found(T),
    Empty,
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// The value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Empty => Lookup::Empty,
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

/// One node operation with its arguments. Locators are kept in their
/// textual form; one that does not parse matches nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NodeOperation {
    Exists {
        locator: String,
    },
    GetXml {
        locator: String,
    },
    GetText {
        locator: String,
    },
    GetAllXml {
        locator: String,
    },
    GetAllText {
        locator: String,
    },
    GetAttributes {
        locator: String,
    },
    GetStructured {
        locator: String,
        fields: Vec<String>,
    },
    GetAttribute {
        locator: String,
        name: String,
    },
    GetWithAttribute {
        locator: String,
        name: String,
        value: Option<String>,
    },
    AddNode {
        parent: String,
        xml: String,
    },
    EditText {
        locator: String,
        text: String,
    },
    Rename {
        locator: String,
        name: String,
    },
    AddAttribute {
        locator: String,
        name: String,
        value: String,
    },
    RemoveAttribute {
        locator: String,
        name: String,
    },
    Delete {
        locator: String,
    },
}

impl NodeOperation {
    /// Whether the operation writes the document back.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            NodeOperation::AddNode { .. }
                | NodeOperation::EditText { .. }
                | NodeOperation::Rename { .. }
                | NodeOperation::AddAttribute { .. }
                | NodeOperation::RemoveAttribute { .. }
                | NodeOperation::Delete { .. }
        )
    }

    /// The locator the operation targets.
    pub fn locator(&self) -> &str {
        match self {
            NodeOperation::Exists { locator }
            | NodeOperation::GetXml { locator }
            | NodeOperation::GetText { locator }
            | NodeOperation::GetAllXml { locator }
            | NodeOperation::GetAllText { locator }
            | NodeOperation::GetAttributes { locator }
            | NodeOperation::GetStructured { locator, .. }
            | NodeOperation::GetAttribute { locator, .. }
            | NodeOperation::GetWithAttribute { locator, .. }
            | NodeOperation::EditText { locator, .. }
            | NodeOperation::Rename { locator, .. }
            | NodeOperation::AddAttribute { locator, .. }
            | NodeOperation::RemoveAttribute { locator, .. }
            | NodeOperation::Delete { locator } => locator,
            NodeOperation::AddNode { parent, .. } => parent,
        }
    }
}

/// What [`XmlService::execute`](crate::service::XmlService::execute) returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutput {
    /// Existence checks and mutations.
    Bool(bool),
    Text(Lookup<String>),
    List(Lookup<Vec<String>>),
    Attributes(Lookup<BTreeMap<String, String>>),
    Records(Vec<BTreeMap<String, String>>),
    Value(String),
}
