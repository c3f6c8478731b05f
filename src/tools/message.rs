use crate::{tools::Tool, trajectory::TrajectoryItem};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MessageParams {
    /// The text to send to the user. This function should be called when you want to respond to the user.
    pub text: String,
}

/// Tool for replying to the user, which hands control back
#[derive(Default)]
pub struct MessageTool;

impl MessageTool {
    pub const NAME: &'static str = "message";
}

impl Tool for MessageTool {
    type Params = MessageParams;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Send a message to the user, e.g. to answer or to ask for missing information"
    }

    fn into_item(&self, params: MessageParams) -> TrajectoryItem {
        TrajectoryItem::agent_message(params.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_hands_off() {
        let item = MessageTool.into_item(MessageParams { text: "Which size?".into() });
        assert!(item.should_handoff());
        assert_eq!(item.text(), "agent: Which size?");
    }
}
