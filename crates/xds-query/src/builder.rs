//! Fluent builder for locators.
//!
//! The builder never looks at a document. It only records segments and
//! predicates in call order; [`QueryBuilder::render`] is the literal
//! concatenation of those calls.

use crate::error::LocatorError;
use crate::locator::{is_valid_name, Locator, Predicate, Segment};
use std::fmt;

/// Builds a [`Locator`] one step at a time.
///
/// # Example
///
/// ```rust
/// use xds_query::QueryBuilder;
///
/// let query = QueryBuilder::root("catalog").go_to("book").at(2).go_to("title");
/// assert_eq!(query.render(), "/catalog/book[2]/title");
///
/// let search = QueryBuilder::search("book").go_to("title");
/// assert_eq!(search.render(), "//book/title");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    segments: Vec<Segment>,
    /// Predicates appended before any segment existed.
    dangling: Vec<Predicate>,
}

impl QueryBuilder {
    /// Start from an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `segment` as the first step; `/segment` when `is_absolute`,
    /// `//segment` otherwise.
    pub fn with_root(segment: impl Into<String>, is_absolute: bool) -> Self {
        let first = if is_absolute {
            Segment::child(segment)
        } else {
            Segment::descendant(segment)
        };
        Self {
            segments: vec![first],
            dangling: Vec::new(),
        }
    }

    /// Start at the document root element: `/segment`.
    pub fn root(segment: impl Into<String>) -> Self {
        Self::with_root(segment, true)
    }

    /// Start with a document-wide search: `//segment`.
    pub fn search(segment: impl Into<String>) -> Self {
        Self::with_root(segment, false)
    }

    /// Append `/segment`. No escaping is done on the name.
    pub fn go_to(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(Segment::child(segment));
        self
    }

    /// Append `[position]` to the last segment.
    pub fn at(self, position: usize) -> Self {
        self.push_predicate(Predicate::Position(position))
    }

    /// Append `[@name]`, or `[@name=value]` when a value is given. The value
    /// is inserted as written.
    pub fn with_attribute(self, name: impl Into<String>, value: Option<&str>) -> Self {
        let name = name.into();
        let predicate = match value {
            Some(literal) => Predicate::AttributeEquals {
                name,
                literal: literal.to_string(),
            },
            None => Predicate::HasAttribute(name),
        };
        self.push_predicate(predicate)
    }

    fn push_predicate(mut self, predicate: Predicate) -> Self {
        match self.segments.last_mut() {
            Some(last) => last.predicates.push(predicate),
            None => self.dangling.push(predicate),
        }
        self
    }

    /// The accumulated locator text. Calling this has no side effects.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for predicate in &self.dangling {
            out.push_str(&predicate.to_string());
        }
        out.push_str(&Locator::absolute(self.segments.clone()).to_string());
        out
    }

    /// The structured locator, checked for names that would not survive
    /// rendering.
    pub fn locator(&self) -> Result<Locator, LocatorError> {
        if !self.dangling.is_empty() {
            return Err(LocatorError::DanglingPredicate);
        }
        if self.segments.is_empty() {
            return Err(LocatorError::Empty);
        }
        for segment in &self.segments {
            if segment.name != "*" && !is_valid_name(&segment.name) {
                return Err(LocatorError::InvalidSegmentName(segment.name.clone()));
            }
            for predicate in &segment.predicates {
                match predicate {
                    Predicate::HasAttribute(name) | Predicate::AttributeEquals { name, .. }
                        if !is_valid_name(name) =>
                    {
                        return Err(LocatorError::InvalidSegmentName(name.clone()));
                    }
                    Predicate::Position(0) => {
                        return Err(LocatorError::InvalidPosition {
                            position: 0,
                            text: "0".to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(Locator::absolute(self.segments.clone()))
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Anything an operation can take as a locator: text, a built query or a
/// structured locator.
pub trait IntoLocator {
    fn into_locator(self) -> Result<Locator, LocatorError>;
}

impl IntoLocator for Locator {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Ok(self)
    }
}

impl IntoLocator for &Locator {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Ok(self.clone())
    }
}

impl IntoLocator for &str {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Locator::parse(self)
    }
}

impl IntoLocator for &String {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Locator::parse(self)
    }
}

impl IntoLocator for String {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Locator::parse(&self)
    }
}

// A builder resolves exactly like its rendered text; `locator()` stays the
// strict check.
impl IntoLocator for &QueryBuilder {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Locator::parse(&self.render())
    }
}

impl IntoLocator for QueryBuilder {
    fn into_locator(self) -> Result<Locator, LocatorError> {
        Locator::parse(&self.render())
    }
}
