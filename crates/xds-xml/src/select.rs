//! Locator evaluation.
//!
//! Each segment maps the current node set to the next one. Candidates are
//! grouped by parent so `[n]` counts among siblings: `//book[1]` is every
//! book that is the first book child of its parent. Each step's result is
//! deduplicated and put back in document order.

use crate::tree::{NodeId, XmlDocument};
use xds_query::{Axis, Locator, Predicate, Segment};

impl XmlDocument {
    /// Evaluate a locator from the document node. Relative locators are
    /// anchored there too, so `catalog/book` and `/catalog/book` agree.
    pub fn select(&self, locator: &Locator) -> Vec<NodeId> {
        self.select_from(self.document_node(), locator)
    }

    /// Evaluate a locator from `context`. Absolute locators ignore the
    /// context and start at the document node.
    pub fn select_from(&self, context: NodeId, locator: &Locator) -> Vec<NodeId> {
        if locator.is_empty() {
            return Vec::new();
        }
        let start = if locator.is_relative() {
            context
        } else {
            self.document_node()
        };

        let order = self.document_order();
        let mut current = vec![start];
        for segment in locator.segments() {
            let mut next = Vec::new();
            for &node in &current {
                let parents = match segment.axis {
                    Axis::Child => vec![node],
                    Axis::Descendant => self.self_and_descendants(node),
                };
                for parent in parents {
                    next.extend(self.step(parent, segment));
                }
            }
            next.sort_by_key(|id| (order[id.index()], *id));
            next.dedup();
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// Whether the locator matches anything.
    pub fn exists(&self, locator: &Locator) -> bool {
        !self.select(locator).is_empty()
    }

    fn step(&self, parent: NodeId, segment: &Segment) -> Vec<NodeId> {
        let mut group: Vec<NodeId> = self
            .child_elements(parent)
            .filter(|&c| self.name(c).map_or(false, |n| segment.matches_name(n)))
            .collect();

        for predicate in &segment.predicates {
            group = match predicate {
                Predicate::Position(n) => n
                    .checked_sub(1)
                    .and_then(|i| group.get(i).copied())
                    .into_iter()
                    .collect(),
                Predicate::HasAttribute(name) => group
                    .into_iter()
                    .filter(|&c| self.attribute(c, name).is_some())
                    .collect(),
                Predicate::AttributeEquals { name, literal } => {
                    let expected = Predicate::expected_value(literal);
                    group
                        .into_iter()
                        .filter(|&c| self.attribute(c, name) == Some(expected))
                        .collect()
                }
            };
            if group.is_empty() {
                break;
            }
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"<library>
        <shelf id="a">
            <book id="1" lang="pl"><title>Lalka</title></book>
            <book id="2"><title>Pan Tadeusz</title></book>
        </shelf>
        <shelf id="b">
            <book id="3" lang="en"><title>Emma</title><book id="3.1"><title>Inner</title></book></book>
        </shelf>
    </library>"#;

    fn titles(doc: &XmlDocument, path: &str) -> Vec<String> {
        doc.select(&Locator::parse(path).unwrap())
            .into_iter()
            .map(|id| doc.text(id))
            .collect()
    }

    fn ids(doc: &XmlDocument, path: &str) -> Vec<String> {
        doc.select(&Locator::parse(path).unwrap())
            .into_iter()
            .filter_map(|id| doc.attribute(id, "id").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_child_paths() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(titles(&doc, "/library/shelf/book/title"), ["Lalka", "Pan Tadeusz", "Emma"]);
        assert_eq!(titles(&doc, "library/shelf/book/title"), ["Lalka", "Pan Tadeusz", "Emma"]);
        assert!(titles(&doc, "/shelf").is_empty());
        assert!(titles(&doc, "/library/nothing/title").is_empty());
    }

    #[test]
    fn test_descendant_paths() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(ids(&doc, "//book"), ["1", "2", "3", "3.1"]);
        assert_eq!(ids(&doc, "/library//book"), ["1", "2", "3", "3.1"]);
        assert_eq!(titles(&doc, "//book/title").len(), 4);
        // the outer book contains the inner one; each is reported once
        assert_eq!(ids(&doc, "//shelf//book"), ["1", "2", "3", "3.1"]);
    }

    #[test]
    fn test_position_is_per_parent() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(ids(&doc, "//book[1]"), ["1", "3", "3.1"]);
        assert_eq!(ids(&doc, "/library/shelf[2]/book"), ["3"]);
        assert_eq!(ids(&doc, "/library/shelf/book[2]"), ["2"]);
        assert!(ids(&doc, "/library/shelf[3]").is_empty());
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(ids(&doc, "//book[@lang]"), ["1", "3"]);
        assert_eq!(ids(&doc, "//book[@id='2']"), ["2"]);
        assert_eq!(ids(&doc, "//book[@id=\"2\"]"), ["2"]);
        assert_eq!(ids(&doc, "//book[@id=2]"), ["2"]);
        // predicates apply left to right
        assert_eq!(ids(&doc, "/library/shelf/book[@lang][2]"), Vec::<String>::new());
        assert_eq!(ids(&doc, "/library/shelf/book[2][@lang]"), Vec::<String>::new());
        assert_eq!(ids(&doc, "/library/shelf/book[@lang][1]"), ["1", "3"]);
    }

    #[test]
    fn test_wildcard() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        assert_eq!(ids(&doc, "/library/*"), ["a", "b"]);
        assert_eq!(ids(&doc, "/*/*[2]"), ["b"]);
    }

    #[test]
    fn test_select_from_context() {
        let doc = XmlDocument::parse(LIBRARY).unwrap();
        let shelf = doc.select(&Locator::parse("/library/shelf[2]").unwrap())[0];
        let titles: Vec<_> = doc
            .select_from(shelf, &Locator::parse("book/title").unwrap())
            .into_iter()
            .map(|id| doc.text(id))
            .collect();
        assert_eq!(titles, ["Emma"]);
        let nested = doc.select_from(shelf, &Locator::parse("//title").unwrap());
        assert_eq!(nested.len(), 4);
        assert_eq!(doc.select_from(shelf, &Locator::relative(Vec::new())), Vec::new());
    }

    #[test]
    fn test_detached_nodes_are_not_selected() {
        let mut doc = XmlDocument::parse(LIBRARY).unwrap();
        let first = doc.select(&Locator::parse("//book[@id='1']").unwrap())[0];
        doc.detach(first);
        assert_eq!(ids(&doc, "//book"), ["2", "3", "3.1"]);
    }
}
