//! The template node tree consumed by the renderer.
//!
//! Trees are produced by an external markup parser and are immutable from
//! this crate's point of view: built once, then shared freely across any
//! number of concurrent renders.

/// One node of a template tree: literal SQL text, or a markup element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Element(Element),
}

/// A markup element: `<if test="...">`, `<foreach ...>`, `<where>`, etc.
///
/// `name` is normalized to UPPERCASE at construction so dispatch is
/// case-insensitive. Attributes keep their document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Attribute value by name, first occurrence wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value with a fallback default.
    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }
}

impl Node {
    pub fn text(content: impl Into<String>) -> Node {
        Node::Text(content.into())
    }

    /// Build an element node. The name is upper-cased here so the renderer
    /// can match on it directly.
    pub fn element(
        name: &str,
        attributes: Vec<(String, String)>,
        children: Vec<Node>,
    ) -> Node {
        Node::Element(Element {
            name: name.to_uppercase(),
            attributes,
            children,
        })
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }
}

/// Shorthand for attribute lists: `attrs(&[("test", "a != null")])`.
pub fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
