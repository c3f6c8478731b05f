//! DOM to text rendering
//!
//! Produces a compact Markdown dialect in which every element the model can act
//! on appears as `[label, type=kind](vid-N)` and nothing else is addressable.

use crate::dom::{element::{DomNode, ElementNode},
                 interactive::{self, SelectableType},
                 tree::DomTree};
use std::collections::HashSet;

pub const DEFAULT_MAX_LIST_ITEMS: usize = 5;

/// Renderer settings
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Show at most this many items of a `ul`/`ol` (None = no truncation)
    pub max_list_items: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { max_list_items: Some(DEFAULT_MAX_LIST_ITEMS) }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: truncate lists longer than `max` items, or never with `None`
    pub fn max_list_items(mut self, max: Option<usize>) -> Self {
        self.max_list_items = max;
        self
    }
}

/// Render an HTML document to text
pub fn render_markdown(html: &str, options: &RenderOptions) -> String {
    MarkdownRenderer::new(options).render(&DomTree::parse(html))
}

const BLOCK_TAGS: &[&str] = &[
    "div", "section", "body", "header", "form", "dialog", "ul", "ol", "small", "bdi", "template", "summary",
    "details", "dl", "dt", "dd", "main", "tbody", "thead", "tfoot", "table", "tr", "td", "th", "article", "aside",
];

const INLINE_TAGS: &[&str] =
    &["p", "span", "g", "figure", "desc", "footer", "html", "legend", "fieldset", "center", "picture"];

const DROPPED_TAGS: &[&str] = &[
    "head", "title", "script", "style", "iframe", "svg", "path", "noscript", "link", "meta", "label", "circle",
    "rect", "image", "polygon", "source", "use", "canvas", "meso-native", "meso-display-ad",
    "grammarly-desktop-integration",
];

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_form: bool,
    in_pre: bool,
}

/// Single-pass renderer; virtual ids are emitted at most once per pass
pub struct MarkdownRenderer<'a> {
    options: &'a RenderOptions,
    emitted: HashSet<String>,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(options: &'a RenderOptions) -> Self {
        Self { options, emitted: HashSet::new() }
    }

    /// Render a parsed tree and clean the result up
    pub fn render(mut self, tree: &DomTree) -> String {
        let parts: Vec<String> = tree.nodes.iter().map(|node| self.visit(node, Context::default())).collect();
        cleanup(&parts.join("\n"))
    }

    fn visit(&mut self, node: &DomNode, ctx: Context) -> String {
        match node {
            DomNode::Text { text } if ctx.in_pre => text.clone(),
            DomNode::Text { text } => collapse_inline_whitespace(text),
            DomNode::Element(el) if interactive::should_visit(el) => self.visit_element(el, ctx),
            DomNode::Element(_) => String::new(),
        }
    }

    fn children(&mut self, el: &ElementNode, ctx: Context) -> Vec<String> {
        el.children.iter().map(|child| self.visit(child, ctx)).collect()
    }

    /// Children on separate lines; whitespace-only parts are source formatting and dropped
    fn block(&mut self, el: &ElementNode, ctx: Context) -> String {
        let parts: Vec<String> =
            self.children(el, ctx).into_iter().filter(|part| !part.trim().is_empty()).collect();
        parts.join("\n")
    }

    /// Claim a virtual id for this pass; a duplicate id is treated as absent
    fn claim(&mut self, el: &ElementNode) -> Option<String> {
        let id = el.virtual_id()?;
        self.emitted.insert(id.to_string()).then(|| id.to_string())
    }

    fn visit_element(&mut self, el: &ElementNode, ctx: Context) -> String {
        let tag = el.tag_name.as_str();
        if DROPPED_TAGS.contains(&tag) {
            return String::new();
        }

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                let text = self.children(el, ctx).join(" ");
                let text = text.trim();
                if text.is_empty() { String::new() } else { format!("\n\n{} {}\n", "#".repeat(level), text) }
            }
            "b" | "strong" => wrap(&self.children(el, ctx).join(""), "**", "**"),
            "i" | "em" => wrap(&self.children(el, ctx).join(""), "_", "_"),
            "del" | "s" => wrap(&self.children(el, ctx).join(""), "~~", "~~"),
            "code" if ctx.in_pre => self.children(el, ctx).join(""),
            "code" => wrap(&self.children(el, ctx).join(""), "`", "`"),
            "pre" => {
                let text = self.children(el, Context { in_pre: true, ..ctx }).join("");
                if text.trim().is_empty() {
                    String::new()
                } else {
                    format!("\n```\n{}\n```\n", text.trim_matches('\n'))
                }
            }
            "sup" => wrap(&self.children(el, ctx).join(""), "^{", "}"),
            "br" => "\n".to_string(),
            "hr" => "\n---\n".to_string(),
            "video" => "<video>".to_string(),
            "img" => match el.non_empty_attribute("alt") {
                Some(alt) => format!("![{}](<img>)", alt.trim()),
                None => String::new(),
            },
            "button" => self.visit_button(el, ctx),
            "a" => self.visit_link(el, ctx),
            "input" | "textarea" => self.visit_inputable(el, ctx),
            "li" => {
                let text = self.children(el, ctx).join(" ");
                let text = text.trim();
                if text.is_empty() { String::new() } else { format!("- {}", text) }
            }
            "ul" | "ol" => self.visit_list(el, ctx),
            "nav" => {
                let content = self.children(el, ctx).join("\n");
                let items: Vec<String> = content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| if line.starts_with("- ") { line.to_string() } else { format!("- {}", line) })
                    .collect();
                if items.is_empty() { String::new() } else { format!("\n\n## Nav Bar\n\n{}\n", items.join("\n")) }
            }
            "form" => self.block(el, Context { in_form: true, ..ctx }),
            _ if BLOCK_TAGS.contains(&tag) => self.block(el, ctx),
            _ if INLINE_TAGS.contains(&tag) => self.children(el, ctx).join(" "),
            _ => {
                log::debug!("Rendering unknown element <{}> as a block", tag);
                self.block(el, ctx)
            }
        }
    }

    fn visit_button(&mut self, el: &ElementNode, ctx: Context) -> String {
        if interactive::is_clickable_button(el, ctx.in_form) {
            let label = interactive::button_label(el);
            if let Some(id) = self.claim(el) {
                return interactive::render_selectable(SelectableType::Button, &id, &label, None);
            }
        }
        self.block(el, ctx)
    }

    fn visit_link(&mut self, el: &ElementNode, ctx: Context) -> String {
        if interactive::is_clickable_link(el) {
            let (text, href) = interactive::link_label(el);
            if let Some(id) = self.claim(el) {
                return interactive::render_selectable(SelectableType::Link, &id, &text, Some(&href));
            }
        }
        self.block(el, ctx)
    }

    fn visit_inputable(&mut self, el: &ElementNode, ctx: Context) -> String {
        if interactive::is_inputable(el) {
            let kind = if el.is_tag("textarea") { SelectableType::TextArea } else { SelectableType::Input };
            let label = interactive::input_label(el);
            if let Some(id) = self.claim(el) {
                return interactive::render_selectable(kind, &id, &label, None);
            }
        }
        // textarea text is its current value, which the model sees through the label
        if el.is_tag("textarea") { String::new() } else { self.block(el, ctx) }
    }

    fn visit_list(&mut self, el: &ElementNode, ctx: Context) -> String {
        let rendered: Vec<String> =
            self.children(el, ctx).into_iter().filter(|item| !item.trim().is_empty()).collect();
        match self.options.max_list_items {
            Some(max) if rendered.len() > max => {
                let hidden = rendered.len() - max;
                let mut shown = rendered.into_iter().take(max).collect::<Vec<_>>();
                shown.push(format!("- ... {} more", hidden));
                shown.join("\n")
            }
            _ => rendered.join("\n"),
        }
    }
}

fn wrap(inner: &str, open: &str, close: &str) -> String {
    let inner = inner.trim();
    if inner.is_empty() { String::new() } else { format!("{}{}{}", open, inner, close) }
}

/// Source formatting whitespace inside text nodes carries no meaning outside `pre`
fn collapse_inline_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}

/// Normalize whitespace: single spaces, trimmed lines, at most one blank line in a row
///
/// Idempotent: `cleanup(cleanup(s)) == cleanup(s)`.
pub fn cleanup(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(html: &str) -> String {
        render_markdown(html, &RenderOptions::default())
    }

    #[test]
    fn test_headings_and_inline_formatting() {
        let out = render("<body><h1>Title</h1><p>Some <b>bold</b> and <em>soft</em> <del>old</del> text</p></body>");
        assert_eq!(out, "# Title\n\nSome **bold** and _soft_ ~~old~~ text");
    }

    #[test]
    fn test_heading_levels() {
        let out = render("<h3>Three</h3><h6>Six</h6>");
        assert_eq!(out, "### Three\n\n###### Six");
    }

    #[test]
    fn test_code_and_pre() {
        assert_eq!(render("<p>run <code>ls</code></p>"), "run `ls`");
        assert_eq!(render("<pre><code>a\nb</code></pre>"), "```\na\nb\n```");
    }

    #[test]
    fn test_clickable_button() {
        let out = render(r#"<button data-vid="vid-1" aria-label="Search">icon</button>"#);
        assert_eq!(out, "[Search, type=button](vid-1)");
    }

    #[test]
    fn test_button_without_virtual_id_is_plain_text() {
        assert_eq!(render("<button>Go</button>"), "Go");
    }

    #[test]
    fn test_link_rendering() {
        let out = render(r#"<a data-vid="vid-4" href="https://example.com/docs?ref=nav">Read the docs!</a>"#);
        assert_eq!(out, "[Read the docs, https://example.com/docs, type=link](vid-4)");
        assert_eq!(render(r#"<a data-vid="vid-5">Anchor</a>"#), "Anchor");
    }

    #[test]
    fn test_input_rendering() {
        let out = render(
            r#"<form><input data-vid="vid-2" type="text" placeholder="Email"><textarea data-vid="vid-3" rows="4">draft</textarea></form>"#,
        );
        assert_eq!(out, "[Email, type=input](vid-2)\n[textarea, type=textarea](vid-3)");
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let out = render(
            r#"<div>
                <span aria-hidden="true">secret</span>
                <p style="display: none">gone</p>
                <p style="opacity:0.5">faded</p>
                <input type="hidden" data-vid="vid-9" placeholder="token">
                <script>var x = 1;</script>
                <svg><text>chart</text></svg>
            </div>"#,
        );
        assert_eq!(out, "faded");
    }

    #[test]
    fn test_images_need_alt_text() {
        assert_eq!(render(r#"<img src="a.png"><img src="b.png" alt="Logo">"#), "![Logo](<img>)");
    }

    #[test]
    fn test_lists_and_empty_items() {
        let out = render("<ul><li>One</li><li>  </li><li>Two</li></ul>");
        assert_eq!(out, "- One\n- Two");
    }

    #[test]
    fn test_list_truncation() {
        let options = RenderOptions::new().max_list_items(Some(2));
        let out = render_markdown("<ol><li>a</li><li>b</li><li>c</li><li>d</li></ol>", &options);
        assert_eq!(out, "- a\n- b\n- ... 2 more");
    }

    #[test]
    fn test_long_lists_truncated_by_default() {
        let items: String = (1..=7).map(|i| format!("<li>item {}</li>", i)).collect();
        let out = render(&format!("<ul>{}</ul>", items));
        assert_eq!(out, "- item 1\n- item 2\n- item 3\n- item 4\n- item 5\n- ... 2 more");

        let unlimited = RenderOptions::new().max_list_items(None);
        let out = render_markdown(&format!("<ul>{}</ul>", items), &unlimited);
        assert!(out.ends_with("- item 6\n- item 7"));
    }

    #[test]
    fn test_nav_bar() {
        let out = render(
            r#"<nav><a data-vid="vid-1" href="/home">Home</a><a data-vid="vid-2" href="/about">About</a></nav>"#,
        );
        assert_eq!(out, "## Nav Bar\n\n- [Home, /home, type=link](vid-1)\n- [About, /about, type=link](vid-2)");
    }

    #[test]
    fn test_unknown_tags_keep_content() {
        assert_eq!(render("<my-widget><p>inside</p></my-widget>"), "inside");
    }

    #[test]
    fn test_virtual_ids_are_never_emitted_twice() {
        let out = render(
            r#"<button data-vid="vid-1">First</button><button data-vid="vid-1">Second</button>"#,
        );
        assert_eq!(out.matches("(vid-1)").count(), 1);
        assert!(out.contains("Second"));
    }

    #[test]
    fn test_every_selectable_has_a_virtual_id() {
        let out = render(
            r#"<form><button>No id</button><a href="/x">No id</a><input placeholder="No id"></form>"#,
        );
        assert!(!out.contains("type="));
    }

    #[test]
    fn test_cleanup() {
        assert_eq!(cleanup("  a   b  \n\n\n\n c\t\td \n"), "a b\n\nc d");
        assert_eq!(cleanup("\n\n"), "");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let samples = ["x\n \n \n \ny", "  lead\ttab  ", "a\n\nb\n\n\nc", ""];
        for sample in samples {
            let once = cleanup(sample);
            assert_eq!(cleanup(&once), once);
            assert!(!once.contains("\n\n\n"));
            assert!(!once.contains("  "));
        }
    }
}
