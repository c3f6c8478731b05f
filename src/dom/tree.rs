use crate::dom::element::{DomNode, ElementNode};
use html5ever::{parse_document, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Represents the parsed DOM of a web page
#[derive(Debug, Clone, PartialEq)]
pub struct DomTree {
    /// Top-level nodes of the document (normally a single `html` element)
    pub nodes: Vec<DomNode>,
}

impl DomTree {
    /// Create a tree from already built nodes
    pub fn new(nodes: Vec<DomNode>) -> Self {
        Self { nodes }
    }

    /// Parse an HTML document; malformed markup is recovered the way browsers do
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        if !dom.errors.is_empty() {
            log::debug!("Recovered from {} HTML parse errors", dom.errors.len());
        }
        let nodes = dom.document.children.borrow().iter().filter_map(convert).collect();
        Self { nodes }
    }

    /// Visit every element in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ElementNode)) {
        for node in &self.nodes {
            if let DomNode::Element(element) = node {
                element.walk(visit);
            }
        }
    }
}

fn convert(handle: &Handle) -> Option<DomNode> {
    match &handle.data {
        NodeData::Text { contents } => Some(DomNode::text(contents.borrow().to_string())),
        NodeData::Element { name, attrs, .. } => {
            let mut element = ElementNode::new(name.local.to_string());
            for attr in attrs.borrow().iter() {
                element.add_attribute(attr.name.local.to_string(), attr.value.to_string());
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert(child) {
                    element.add_child(node);
                }
            }
            Some(element.into())
        }
        NodeData::Document
        | NodeData::Doctype { .. }
        | NodeData::Comment { .. }
        | NodeData::ProcessingInstruction { .. } => None,
    }
}
