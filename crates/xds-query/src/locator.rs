//! Locator model - the tagged-segment form of an XPath-style path.
//!
//! A [`Locator`] is only turned into text at the boundary (display, storage,
//! logging). Everything else works on the segment list, so names and
//! literals never get spliced into a query string by hand.

use crate::error::LocatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a segment is reached from the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// `/name` - direct children.
    Child,
    /// `//name` - children of the context node or any of its descendants.
    Descendant,
}

impl Axis {
    fn separator(self) -> &'static str {
        match self {
            Axis::Child => "/",
            Axis::Descendant => "//",
        }
    }
}

/// A filter attached to a segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// `[n]`, 1-based position among the candidates of one parent.
    Position(usize),
    /// `[@name]`
    HasAttribute(String),
    /// `[@name=literal]`. The literal is kept exactly as written.
    AttributeEquals { name: String, literal: String },
}

impl Predicate {
    /// The value an `AttributeEquals` literal compares against: quotes are
    /// stripped, a bare literal is taken as-is.
    pub fn expected_value(literal: &str) -> &str {
        let bytes = literal.as_bytes();
        if bytes.len() >= 2 {
            let first = bytes[0];
            if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
                return &literal[1..literal.len() - 1];
            }
        }
        literal
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Position(n) => write!(f, "[{}]", n),
            Predicate::HasAttribute(name) => write!(f, "[@{}]", name),
            Predicate::AttributeEquals { name, literal } => write!(f, "[@{}={}]", name, literal),
        }
    }
}

/// One step of a locator: element name plus its predicates in order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub axis: Axis,
    /// Element name, or `*` for any element.
    pub name: String,
    pub predicates: Vec<Predicate>,
}

impl Segment {
    /// A child-axis segment without predicates.
    pub fn child(name: impl Into<String>) -> Self {
        Self {
            axis: Axis::Child,
            name: name.into(),
            predicates: Vec::new(),
        }
    }

    /// A descendant-axis segment without predicates.
    pub fn descendant(name: impl Into<String>) -> Self {
        Self {
            axis: Axis::Descendant,
            name: name.into(),
            predicates: Vec::new(),
        }
    }

    /// Add a predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Whether `name` passes this segment's name test.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == "*" || self.name == name
    }
}

/// An ordered list of segments, anchored at the document root or relative
/// to a context node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    relative: bool,
    segments: Vec<Segment>,
}

impl Locator {
    /// A locator anchored at the document node (`/a/b`, `//a/b`).
    pub fn absolute(segments: Vec<Segment>) -> Self {
        Self {
            relative: false,
            segments,
        }
    }

    /// A locator evaluated from a context node (`a/b`).
    pub fn relative(segments: Vec<Segment>) -> Self {
        Self {
            relative: true,
            segments,
        }
    }

    /// Parse the textual form.
    pub fn parse(text: &str) -> Result<Self, LocatorError> {
        Parser::new(text).parse()
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            let leading_relative = i == 0 && self.relative && segment.axis == Axis::Child;
            if !leading_relative {
                f.write_str(segment.axis.separator())?;
            }
            f.write_str(&segment.name)?;
            for predicate in &segment.predicates {
                write!(f, "{}", predicate)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

/// Whether `c` may start an XML name.
pub fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

/// Whether `c` may continue an XML name.
pub fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || c == '-' || c == '.'
}

/// Whether `name` is a usable element or attribute name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start(c) => chars.all(is_name_char),
        _ => false,
    }
}

// === Parser ===

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.trim(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.input[self.pos..].starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn parse(mut self) -> Result<Locator, LocatorError> {
        if self.input.is_empty() {
            return Err(LocatorError::Empty);
        }

        let (relative, mut axis) = if self.eat("//") {
            (false, Axis::Descendant)
        } else if self.eat("/") {
            (false, Axis::Child)
        } else {
            (true, Axis::Child)
        };

        let mut segments = Vec::new();
        loop {
            segments.push(self.parse_segment(axis)?);
            if self.peek().is_none() {
                break;
            }
            axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                let found = self.peek().unwrap_or(' ');
                return Err(LocatorError::UnexpectedChar {
                    position: self.pos,
                    found,
                });
            };
            if self.peek().is_none() {
                return Err(LocatorError::TrailingSlash { position: self.pos });
            }
        }

        Ok(Locator { relative, segments })
    }

    fn parse_segment(&mut self, axis: Axis) -> Result<Segment, LocatorError> {
        let name = if self.eat("*") {
            "*".to_string()
        } else {
            self.parse_name()?
        };

        let mut segment = Segment {
            axis,
            name,
            predicates: Vec::new(),
        };
        while self.eat("[") {
            segment.predicates.push(self.parse_predicate()?);
        }
        Ok(segment)
    }

    fn parse_name(&mut self) -> Result<String, LocatorError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => {
                self.bump();
            }
            Some('/') | Some('[') | None => {
                return Err(LocatorError::EmptyStep { position: start });
            }
            Some(found) => {
                return Err(LocatorError::InvalidName {
                    position: start,
                    found,
                });
            }
        }
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.bump();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_predicate(&mut self) -> Result<Predicate, LocatorError> {
        let open = self.pos - 1;
        self.skip_whitespace();

        let predicate = if self.eat("@") {
            let name = self.parse_name()?;
            self.skip_whitespace();
            if self.eat("=") {
                self.skip_whitespace();
                let literal = self.parse_literal(open)?;
                Predicate::AttributeEquals { name, literal }
            } else {
                Predicate::HasAttribute(name)
            }
        } else {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c != ']') {
                self.bump();
            }
            let text = self.input[start..self.pos].trim();
            if text.is_empty() {
                return Err(LocatorError::EmptyPredicate { position: open });
            }
            match text.parse::<usize>() {
                Ok(n) if n >= 1 => Predicate::Position(n),
                _ => {
                    return Err(LocatorError::InvalidPosition {
                        position: start,
                        text: text.to_string(),
                    })
                }
            }
        };

        self.skip_whitespace();
        if !self.eat("]") {
            return Err(LocatorError::UnterminatedPredicate { position: open });
        }
        Ok(predicate)
    }

    fn parse_literal(&mut self, open: usize) -> Result<String, LocatorError> {
        let start = self.pos;
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(_) => {}
                        None => return Err(LocatorError::UnterminatedPredicate { position: open }),
                    }
                }
                Ok(self.input[start..self.pos].to_string())
            }
            _ => {
                while matches!(self.peek(), Some(c) if c != ']') {
                    self.bump();
                }
                Ok(self.input[start..self.pos].trim_end().to_string())
            }
        }
    }
}
