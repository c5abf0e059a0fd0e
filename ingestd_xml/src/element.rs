//! Owned XML element tree produced by [`parse`][crate::parse]

use std::fmt;

use quick_xml::escape::{escape, partial_escape};

/// A child of an [`Element`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its attributes and children, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Self) -> Self {
        self.nodes.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.nodes.push(Node::Text(text.into()));
        self
    }

    pub(crate) fn push_attribute(&mut self, key: String, value: String) {
        self.attributes.push((key, value));
    }

    pub(crate) fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Qualified name, including any namespace prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Child elements, skipping text
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named(&self, name: &str) -> impl Iterator<Item = &Self> {
        self.children().filter(move |c| c.name == name)
    }

    /// First child element called `name`
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children_named(name).next()
    }

    /// All text below this element concatenated in document order
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Elements reached by following `path` down from this element.
    ///
    /// `path` is a `/` separated list of child names where `*` matches any name, so
    /// `"book/title"` selects the `title` of every `book` child. An empty path selects this
    /// element.
    pub fn select(&self, path: &str) -> Vec<&Self> {
        let mut current = vec![self];
        for segment in segments(path) {
            current = current
                .into_iter()
                .flat_map(|e| e.children().filter(|c| matches_segment(c, segment)))
                .collect();
        }
        current
    }

    /// Owned version of [`select`][Self::select], consuming the tree
    pub fn into_select(self, path: &str) -> Vec<Self> {
        let mut current = vec![self];
        for segment in segments(path) {
            current = current
                .into_iter()
                .flat_map(|e| e.nodes)
                .filter_map(|n| match n {
                    Node::Element(c) if matches_segment(&c, segment) => Some(c),
                    _ => None,
                })
                .collect();
        }
        current
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn matches_segment(element: &Element, segment: &str) -> bool {
    segment == "*" || element.name == segment
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (k, v) in &self.attributes {
            write!(f, " {}=\"{}\"", k, escape(v.as_str()))?;
        }
        if self.nodes.is_empty() {
            return write!(f, "/>");
        }
        write!(f, ">")?;
        for node in &self.nodes {
            match node {
                Node::Element(e) => write!(f, "{e}")?,
                Node::Text(t) => write!(f, "{}", partial_escape(t.as_str()))?,
            }
        }
        write!(f, "</{}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn catalog() -> Element {
        Element::new("catalog")
            .with_attribute("owner", "library")
            .with_child(
                Element::new("book")
                    .with_attribute("id", "1")
                    .with_child(Element::new("title").with_text("Dune")),
            )
            .with_text("between")
            .with_child(
                Element::new("book")
                    .with_attribute("id", "2")
                    .with_child(Element::new("title").with_text("Emma")),
            )
            .with_child(Element::new("magazine").with_child(Element::new("title").with_text("Wired")))
    }

    #[test]
    fn navigation() {
        let root = catalog();
        assert_eq!(root.name(), "catalog");
        assert_eq!(root.attribute("owner"), Some("library"));
        assert_eq!(root.attribute("missing"), None);
        assert_eq!(root.children().count(), 3);
        assert_eq!(root.nodes().len(), 4);
        assert_eq!(root.children_named("book").count(), 2);
        assert_eq!(root.child("book").unwrap().attribute("id"), Some("1"));
        assert!(root.child("dvd").is_none());
        assert_eq!(root.text(), "DunebetweenEmmaWired");
    }

    #[test]
    fn select_paths() {
        let root = catalog();

        let titles: Vec<_> = root.select("book/title").iter().map(|e| e.text()).collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);

        let titles: Vec<_> = root.select("*/title").iter().map(|e| e.text()).collect();
        assert_eq!(titles, vec!["Dune", "Emma", "Wired"]);

        assert_eq!(root.select("").len(), 1);
        assert_eq!(root.select("/book/").len(), 2);
        assert!(root.select("book/author").is_empty());
    }

    #[test]
    fn into_select_matches_select() {
        let root = catalog();
        let borrowed: Vec<Element> = root.select("book").into_iter().cloned().collect();
        assert_eq!(root.into_select("book"), borrowed);
    }

    #[test]
    fn display_escapes() {
        let e = Element::new("note")
            .with_attribute("by", "\"Tom\" & Jerry")
            .with_text("1 < 2 & 3 > 2")
            .with_child(Element::new("empty"));

        assert_eq!(
            e.to_string(),
            "<note by=\"&quot;Tom&quot; &amp; Jerry\">1 &lt; 2 &amp; 3 &gt; 2<empty/></note>"
        );
    }
}
