//! Visibility filter, interactivity predicates and labels for rendered elements

use crate::dom::element::ElementNode;
use url::Url;

/// Kinds of element the renderer exposes to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectableType {
    Button,
    Link,
    Input,
    TextArea,
}

impl SelectableType {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectableType::Button => "button",
            SelectableType::Link => "link",
            SelectableType::Input => "input",
            SelectableType::TextArea => "textarea",
        }
    }
}

/// Format an addressable element: `[primary, secondary, type=T](vid)`
pub fn render_selectable(kind: SelectableType, virtual_id: &str, primary: &str, secondary: Option<&str>) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if !primary.is_empty() {
        parts.push(primary);
    }
    if let Some(secondary) = secondary.filter(|s| !s.is_empty()) {
        parts.push(secondary);
    }
    let type_part = format!("type={}", kind.as_str());
    parts.push(&type_part);
    format!("[{}]({})", parts.join(", "), virtual_id)
}

/// Whether a node and its subtree should appear in the rendering at all
pub fn should_visit(el: &ElementNode) -> bool {
    if el.get_attribute("aria-hidden").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")) {
        return false;
    }
    if (el.is_tag("input") || el.is_tag("textarea"))
        && el.get_attribute("type").is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
    {
        return false;
    }
    match el.get_attribute("style") {
        Some(style) => !style_hides(style),
        None => true,
    }
}

/// Inline style declarations that make an element invisible or zero-sized
pub fn style_hides(style: &str) -> bool {
    style.split(';').filter_map(|decl| decl.split_once(':')).any(|(property, value)| {
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
        match property.as_str() {
            "display" => value == "none",
            "visibility" => value == "hidden",
            "opacity" | "font-size" | "width" | "height" => is_zero_length(&value),
            _ => false,
        }
    })
}

fn is_zero_length(value: &str) -> bool {
    let number: String = value.chars().take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
    if number.is_empty() {
        return false;
    }
    let unit = &value[number.len()..];
    let known_unit = unit.is_empty()
        || unit == "%"
        || ["px", "em", "rem", "pt", "vh", "vw", "ex", "ch"].contains(&unit);
    known_unit && number.parse::<f64>().is_ok_and(|n| n == 0.0)
}

/// Whether a button can be offered to the model
pub fn is_clickable_button(el: &ElementNode, in_form: bool) -> bool {
    el.virtual_id().is_some()
        && (el.non_empty_attribute("aria-label").is_some()
            || in_form
            || el.has_attribute("aria-expanded")
            || !el.text_content().is_empty())
}

/// Label shown for a button: aria-label, then title, then text
pub fn button_label(el: &ElementNode) -> String {
    if let Some(label) = el.non_empty_attribute("aria-label").or_else(|| el.non_empty_attribute("title")) {
        return collapse_whitespace(label);
    }
    let text = el.text_content();
    if !text.is_empty() {
        return text;
    }
    el.non_empty_attribute("value").map(collapse_whitespace).unwrap_or_default()
}

/// Whether a link can be offered to the model
pub fn is_clickable_link(el: &ElementNode) -> bool {
    el.virtual_id().is_some() && el.non_empty_attribute("href").is_some()
}

/// Primary and secondary labels of a link: filtered text and query-less href
pub fn link_label(el: &ElementNode) -> (String, String) {
    let filtered: String =
        el.text_content().chars().filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace()).collect();
    let text = collapse_whitespace(&filtered);
    let primary = if text.is_empty() {
        el.non_empty_attribute("aria-label").map(collapse_whitespace).unwrap_or_default()
    } else {
        text
    };
    let href = el.get_attribute("href").map(strip_query).unwrap_or_default();
    (primary, href)
}

/// Whether an input or textarea accepts text from the model
pub fn is_inputable(el: &ElementNode) -> bool {
    if el.virtual_id().is_none() || !(el.is_tag("input") || el.is_tag("textarea")) {
        return false;
    }
    if el.non_empty_attribute("placeholder").is_some()
        || el.non_empty_attribute("aria-label").is_some()
        || el.non_empty_attribute("value").is_some()
    {
        return true;
    }
    if el
        .get_attribute("autocapitalize")
        .is_some_and(|v| matches!(v.trim(), "on" | "sentences" | "words" | "characters"))
    {
        return true;
    }
    if el.non_empty_attribute("autocomplete").is_some_and(|v| !v.trim().eq_ignore_ascii_case("off")) {
        return true;
    }
    if el.get_attribute("spellcheck").is_some_and(|v| v.trim() == "true") {
        return true;
    }
    if el.is_tag("input") {
        el.get_attribute("role").is_some_and(|r| r.trim() == "combobox")
    } else {
        el.get_attribute("rows").and_then(|r| r.trim().parse::<i64>().ok()).is_some_and(|rows| rows > 0)
    }
}

/// Label for an input: placeholder, then aria-label, then autocomplete, then name
pub fn input_label(el: &ElementNode) -> String {
    el.non_empty_attribute("placeholder")
        .or_else(|| el.non_empty_attribute("aria-label"))
        .or_else(|| el.non_empty_attribute("autocomplete").filter(|v| !v.trim().eq_ignore_ascii_case("off")))
        .or_else(|| el.non_empty_attribute("name"))
        .map(collapse_whitespace)
        .unwrap_or_else(|| el.tag_name.clone())
}

/// Drop the query string and fragment of an absolute URL; relative links only lose the query
pub fn strip_query(link: &str) -> String {
    let link = link.trim();
    match Url::parse(link) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => link.split(['?', '#']).next().unwrap_or(link).to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
