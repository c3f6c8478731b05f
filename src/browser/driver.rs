use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Raw browser automation primitives the session builds on
///
/// Implementations may block or fail on any call; the session serializes all
/// calls so an implementation never sees concurrent commands.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load a URL in the controlled page
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a script and return its value
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Click the first element matching a CSS selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Type text into the first element matching a CSS selector
    async fn send_keys(&self, selector: &str, text: &str) -> Result<()>;

    /// Serialized HTML of the whole document
    async fn outer_html(&self) -> Result<String>;

    /// Current document location
    async fn location(&self) -> Result<String>;

    /// Tear the browser down
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Element categories the session distinguishes when validating actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Button,
    Input,
    Link,
    TextArea,
    Other,
}

impl ElementType {
    /// Classify by lower-case tag name
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "button" => ElementType::Button,
            "input" => ElementType::Input,
            "a" => ElementType::Link,
            "textarea" => ElementType::TextArea,
            _ => ElementType::Other,
        }
    }

    pub fn is_clickable(self) -> bool {
        matches!(self, ElementType::Button | ElementType::Link)
    }

    pub fn accepts_text(self) -> bool {
        matches!(self, ElementType::Input | ElementType::TextArea)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Button => "button",
            ElementType::Input => "input",
            ElementType::Link => "a",
            ElementType::TextArea => "textarea",
            ElementType::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_from_tag() {
        assert_eq!(ElementType::from_tag("BUTTON"), ElementType::Button);
        assert_eq!(ElementType::from_tag("a"), ElementType::Link);
        assert_eq!(ElementType::from_tag("textarea"), ElementType::TextArea);
        assert_eq!(ElementType::from_tag("div"), ElementType::Other);
    }

    #[test]
    fn test_element_type_capabilities() {
        assert!(ElementType::Link.is_clickable());
        assert!(!ElementType::Input.is_clickable());
        assert!(ElementType::TextArea.accepts_text());
        assert!(!ElementType::Button.accepts_text());
    }
}
