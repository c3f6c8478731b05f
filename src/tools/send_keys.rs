use crate::{tools::Tool,
            trajectory::{BrowserAction, TrajectoryItem}};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SendKeysParams {
    /// The id of the element to send keys to
    pub id: String,

    /// The text to send to the element
    pub text: String,
}

/// Tool for typing into inputs and text areas
#[derive(Default)]
pub struct SendKeysTool;

impl Tool for SendKeysTool {
    type Params = SendKeysParams;

    fn name(&self) -> &str {
        "send_keys"
    }

    fn description(&self) -> &str {
        "Type text into an input or text area on the page"
    }

    fn into_item(&self, params: SendKeysParams) -> TrajectoryItem {
        BrowserAction::SendKeys { id: params.id, text: params.text }.into()
    }
}
