use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, str::FromStr};

/// Prefix shared by every virtual id
pub const VIRTUAL_ID_PREFIX: &str = "vid-";

/// DOM attribute holding the virtual id of an element
pub const VIRTUAL_ID_ATTR: &str = "data-vid";

/// Stable identifier attached to an interactive element so the model can address it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualId(String);

impl VirtualId {
    /// Build the id for a counter value
    pub fn from_index(index: u64) -> Self {
        Self(format!("{}{}", VIRTUAL_ID_PREFIX, index))
    }

    /// Parse and validate an id received from the model or the page
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(BrowserError::InvalidVirtualId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// CSS selector matching the element carrying this id
    pub fn selector(&self) -> String {
        format!("[{}=\"{}\"]", VIRTUAL_ID_ATTR, self.0)
    }
}

impl fmt::Display for VirtualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VirtualId {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check the `vid-` prefix and a numeric suffix
pub fn is_valid(raw: &str) -> bool {
    match raw.strip_prefix(VIRTUAL_ID_PREFIX) {
        Some(suffix) => !suffix.is_empty() && suffix.parse::<u64>().is_ok(),
        None => false,
    }
}

/// Monotonic id source owned by a browser session
#[derive(Debug, Default)]
pub struct VirtualIdGenerator {
    next: u64,
}

impl VirtualIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id
    pub fn generate(&mut self) -> VirtualId {
        let id = VirtualId::from_index(self.next);
        self.next += 1;
        id
    }

    /// Hand out `count` ids, skipping any already present in the document
    pub fn generate_excluding(&mut self, existing: &HashSet<String>, count: usize) -> Vec<VirtualId> {
        let mut ids = Vec::with_capacity(count);
        while ids.len() < count {
            let id = self.generate();
            if !existing.contains(id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }

    /// Restart the counter; only called when the session itself is reset
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
