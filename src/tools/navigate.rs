use crate::{tools::Tool,
            trajectory::{BrowserAction, TrajectoryItem}};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the navigate tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NavigateParams {
    /// The url to navigate the browser to
    pub url: String,
}

/// Tool for navigating to a URL
#[derive(Default)]
pub struct NavigateTool;

impl Tool for NavigateTool {
    type Params = NavigateParams;

    fn name(&self) -> &str {
        "navigate"
    }

    fn description(&self) -> &str {
        "Load a URL in the browser"
    }

    fn into_item(&self, params: NavigateParams) -> TrajectoryItem {
        // canonicalized by the session, so the trajectory keeps what the model asked for
        BrowserAction::Navigate { url: params.url }.into()
    }
}
