use crate::browser::virtual_id::VIRTUAL_ID_ATTR;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node of a parsed document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomNode {
    Element(ElementNode),
    Text { text: String },
}

impl DomNode {
    pub fn text(text: impl Into<String>) -> Self {
        DomNode::Text { text: text.into() }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            DomNode::Element(element) => Some(element),
            DomNode::Text { .. } => None,
        }
    }
}

impl From<ElementNode> for DomNode {
    fn from(element: ElementNode) -> Self {
        DomNode::Element(element)
    }
}

/// Represents a DOM element node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// Lower-case HTML tag name (e.g., "div", "button", "input")
    pub tag_name: String,

    /// Element attributes in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self { tag_name: tag_name.into().to_ascii_lowercase(), attributes: IndexMap::new(), children: Vec::new() }
    }

    /// Builder method: set one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: append a text child
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(DomNode::text(text));
        self
    }

    /// Builder method: append an element child
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child.into());
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child node
    pub fn add_child(&mut self, child: DomNode) {
        self.children.push(child);
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute value if present and not blank
    pub fn non_empty_attribute(&self, key: &str) -> Option<&str> {
        self.get_attribute(key).filter(|value| !value.trim().is_empty())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Virtual id written onto the element by the session
    pub fn virtual_id(&self) -> Option<&str> {
        self.non_empty_attribute(VIRTUAL_ID_ATTR)
    }

    /// Descendant text with whitespace runs collapsed
    pub fn text_content(&self) -> String {
        let mut raw = String::new();
        self.collect_text(&mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                DomNode::Text { text } => {
                    out.push_str(text);
                    out.push(' ');
                }
                DomNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Visit this element and all descendant elements in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ElementNode)) {
        visit(self);
        for child in &self.children {
            if let DomNode::Element(element) = child {
                element.walk(visit);
            }
        }
    }
}
