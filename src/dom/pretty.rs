use crate::dom::{element::{DomNode, ElementNode},
                 tree::DomTree};

const VOID_TAGS: &[&str] =
    &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Re-serialize an HTML document with one node per line and two-space indentation
pub fn pretty_html(html: &str) -> String {
    let tree = DomTree::parse(html);
    let mut out = String::from("<!DOCTYPE html>\n");
    for node in &tree.nodes {
        write_node(node, 0, false, &mut out);
    }
    out
}

fn write_node(node: &DomNode, depth: usize, raw: bool, out: &mut String) {
    match node {
        DomNode::Text { text } => {
            let text = text.trim();
            if text.is_empty() {
                return;
            }
            indent(depth, out);
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape(text, false));
            }
            out.push('\n');
        }
        DomNode::Element(el) => write_element(el, depth, out),
    }
}

fn write_element(el: &ElementNode, depth: usize, out: &mut String) {
    indent(depth, out);
    out.push('<');
    out.push_str(&el.tag_name);
    for (key, value) in &el.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value, true));
        out.push('"');
    }
    out.push('>');

    let tag = el.tag_name.as_str();
    if VOID_TAGS.contains(&tag) {
        out.push('\n');
        return;
    }

    if el.children.is_empty() {
        out.push_str(&format!("</{}>\n", tag));
        return;
    }

    out.push('\n');
    let raw = RAW_TEXT_TAGS.contains(&tag);
    for child in &el.children {
        write_node(child, depth + 1, raw, out);
    }
    indent(depth, out);
    out.push_str(&format!("</{}>\n", tag));
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
