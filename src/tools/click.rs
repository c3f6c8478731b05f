use crate::{tools::Tool,
            trajectory::{BrowserAction, TrajectoryItem}};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the click tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClickParams {
    /// The id of the element to click
    pub id: String,
}

/// Tool for clicking buttons and links
#[derive(Default)]
pub struct ClickTool;

impl Tool for ClickTool {
    type Params = ClickParams;

    fn name(&self) -> &str {
        "click"
    }

    fn description(&self) -> &str {
        "Click a button or link on the page"
    }

    fn into_item(&self, params: ClickParams) -> TrajectoryItem {
        BrowserAction::Click { id: params.id }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_params() {
        let params: ClickParams = serde_json::from_value(serde_json::json!({ "id": "vid-5" })).unwrap();
        assert_eq!(params.id, "vid-5");
    }

    #[test]
    fn test_click_tool_metadata() {
        let function = Tool::function_def(&ClickTool);
        assert_eq!(function.name, "click");
        assert_eq!(function.parameters.required, vec!["id".to_string()]);
        assert_eq!(function.parameters.properties["id"]["description"], "The id of the element to click");
    }
}
