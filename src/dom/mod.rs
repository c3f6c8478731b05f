//! HTML parsing and rendering
//!
//! This module turns the raw HTML of a page into what the model sees:
//! - DomTree / ElementNode: owned tree parsed with html5ever
//! - interactive: visibility filter, clickable/inputable predicates and labels
//! - markdown: the text renderer that exposes elements by virtual id
//! - pretty: indented HTML used for run logs

pub mod element;
pub mod interactive;
pub mod markdown;
pub mod pretty;
pub mod tree;

pub use element::{DomNode, ElementNode};
pub use interactive::SelectableType;
pub use markdown::{MarkdownRenderer, RenderOptions, cleanup, render_markdown};
pub use pretty::pretty_html;
pub use tree::DomTree;
