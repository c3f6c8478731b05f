//! Page scripts evaluated through the driver
//!
//! Every script is a named function taking one JSON argument and returning a
//! JSON string, so results survive drivers that only return primitives.

use crate::{browser::driver::BrowserDriver,
            error::{BrowserError, Result}};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

/// Elements that receive virtual ids
pub const INTERACTIVE_SELECTOR: &str = "button, input, a, textarea";

/// Scripts the session runs in the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScript {
    CollectVirtualIds,
    AssignVirtualIds,
    InspectElement,
    PageState,
}

impl PageScript {
    /// Name of the JavaScript function, also used to recognise the script
    pub fn function_name(self) -> &'static str {
        match self {
            PageScript::CollectVirtualIds => "collectVirtualIds",
            PageScript::AssignVirtualIds => "assignVirtualIds",
            PageScript::InspectElement => "inspectElement",
            PageScript::PageState => "pageState",
        }
    }

    fn source(self) -> &'static str {
        match self {
            PageScript::CollectVirtualIds => include_str!("js/collect_virtual_ids.js"),
            PageScript::AssignVirtualIds => include_str!("js/assign_virtual_ids.js"),
            PageScript::InspectElement => include_str!("js/inspect_element.js"),
            PageScript::PageState => include_str!("js/page_state.js"),
        }
    }

    /// Build an expression invoking the script with `args`
    pub fn invocation(self, args: &Value) -> String {
        format!("({})({})", self.source().trim(), args)
    }

    /// Identify which script an expression invokes
    pub fn identify(expression: &str) -> Option<Self> {
        [PageScript::CollectVirtualIds, PageScript::AssignVirtualIds, PageScript::InspectElement, PageScript::PageState]
            .into_iter()
            .find(|script| expression.contains(script.function_name()))
    }

    /// Recover the script and its arguments from an expression built by [`PageScript::invocation`]
    #[cfg(test)]
    pub(crate) fn parse_invocation(expression: &str) -> Option<(Self, Value)> {
        let script = Self::identify(expression)?;
        let args = expression.strip_prefix(&format!("({})(", script.source().trim()))?.strip_suffix(')')?;
        Some((script, serde_json::from_str(args).ok()?))
    }
}

/// Ids already present plus the number of visible elements still lacking one
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VirtualIdCensus {
    pub existing: Vec<String>,
    pub missing: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AssignedIds {
    pub assigned: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ElementInfo {
    pub found: bool,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PageStatus {
    pub ready: bool,
    pub location: String,
}

/// Run a page script and decode its JSON result
pub async fn run<T: DeserializeOwned>(driver: &dyn BrowserDriver, script: PageScript, args: Value) -> Result<T> {
    let value = driver.evaluate(&script.invocation(&args)).await?;
    decode(script, value)
}

/// Decode a script result that is either a JSON string or an already-parsed value
pub fn decode<T: DeserializeOwned>(script: PageScript, value: Value) -> Result<T> {
    let parsed = if let Some(json_str) = value.as_str() {
        serde_json::from_str(json_str)
    } else {
        serde_json::from_value(value)
    };
    parsed.map_err(|e| {
        BrowserError::EvaluationFailed(format!("Unexpected result from {}: {}", script.function_name(), e))
    })
}

pub async fn collect_virtual_ids(driver: &dyn BrowserDriver, attr: &str) -> Result<VirtualIdCensus> {
    run(driver, PageScript::CollectVirtualIds, json!({ "attr": attr, "selector": INTERACTIVE_SELECTOR })).await
}

pub async fn assign_virtual_ids(driver: &dyn BrowserDriver, attr: &str, ids: &[String]) -> Result<AssignedIds> {
    run(driver, PageScript::AssignVirtualIds, json!({ "attr": attr, "selector": INTERACTIVE_SELECTOR, "ids": ids }))
        .await
}

pub async fn inspect_element(driver: &dyn BrowserDriver, selector: &str) -> Result<ElementInfo> {
    run(driver, PageScript::InspectElement, json!({ "selector": selector })).await
}

pub async fn page_state(driver: &dyn BrowserDriver) -> Result<PageStatus> {
    run(driver, PageScript::PageState, json!({})).await
}
