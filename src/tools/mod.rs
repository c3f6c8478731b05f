//! Actions the agent may take
//!
//! Each tool is a named function with typed parameters. Its JSON schema is offered to the model
//! and its parameters turn into a [`TrajectoryItem`] once the model has chosen it.

pub mod click;
pub mod message;
pub mod navigate;
pub mod send_keys;
pub mod task;

pub use click::{ClickParams, ClickTool};
pub use message::{MessageParams, MessageTool};
pub use navigate::{NavigateParams, NavigateTool};
pub use send_keys::{SendKeysParams, SendKeysTool};
pub use task::{TaskCompleteTool, TaskNotPossibleTool, TaskReasonParams};

use crate::{error::{AgentError, AgentResult},
            llm::FunctionDef,
            trajectory::TrajectoryItem};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// An action with typed parameters
pub trait Tool: Send + Sync + Default {
    type Params: DeserializeOwned + JsonSchema;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Build the trajectory item for validated parameters
    fn into_item(&self, params: Self::Params) -> TrajectoryItem;

    fn function_def(&self) -> FunctionDef {
        FunctionDef::for_params::<Self::Params>(self.name(), self.description())
    }
}

/// Object-safe view of a [`Tool`]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;

    fn function_def(&self) -> FunctionDef;

    /// Deserialize already shape-checked arguments into an item
    fn parse(&self, args: Value) -> AgentResult<TrajectoryItem>;
}

impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn function_def(&self) -> FunctionDef {
        Tool::function_def(self)
    }

    fn parse(&self, args: Value) -> AgentResult<TrajectoryItem> {
        let params: T::Params = serde_json::from_value(args).map_err(|e| AgentError::InvalidArguments {
            action: Tool::name(self).to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.into_item(params))
    }
}

struct Entry {
    tool: Box<dyn DynTool>,
    function: FunctionDef,
}

/// Ordered catalogue of tools, keyed by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All browser actions plus `message`, `task_complete` and `task_not_possible`
    pub fn with_defaults() -> Self {
        Self::new()
            .with(ClickTool)
            .with(SendKeysTool)
            .with(NavigateTool)
            .with(MessageTool)
            .with(TaskCompleteTool)
            .with(TaskNotPossibleTool)
    }

    /// Builder method: add a tool
    pub fn with(mut self, tool: impl DynTool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Add a tool, replacing any tool of the same name
    pub fn register(&mut self, tool: impl DynTool + 'static) {
        let function = tool.function_def();
        self.tools.insert(tool.name().to_string(), Entry { tool: Box::new(tool), function });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function catalogue in registration order
    pub fn functions(&self) -> Vec<FunctionDef> {
        self.tools.values().map(|entry| entry.function.clone()).collect()
    }

    /// Turn a function call into a trajectory item
    ///
    /// Checks, in order: the action exists, every required argument is present, no argument is
    /// unknown, and the values have the right types.
    pub fn parse(&self, name: &str, arguments: &str) -> AgentResult<TrajectoryItem> {
        let entry = self.tools.get(name).ok_or_else(|| AgentError::UnsupportedAction(name.to_string()))?;

        let args: serde_json::Map<String, Value> = match serde_json::from_str::<Value>(arguments) {
            Ok(Value::Object(args)) => args,
            Ok(Value::String(text)) if name == MessageTool::NAME && !text.trim().is_empty() => {
                return Ok(TrajectoryItem::agent_message(text));
            }
            Ok(other) => {
                return Err(AgentError::InvalidArguments {
                    action: name.to_string(),
                    reason: format!("expected an object, got {}", other),
                });
            }
            // models sometimes answer `message` with the bare text
            Err(_) if name == MessageTool::NAME && !arguments.trim().is_empty() => {
                return Ok(TrajectoryItem::agent_message(arguments));
            }
            Err(e) => return Err(AgentError::InvalidArguments { action: name.to_string(), reason: e.to_string() }),
        };

        let parameters = &entry.function.parameters;
        if let Some(missing) = parameters.required.iter().find(|required| !args.contains_key(*required)) {
            return Err(AgentError::MissingArgument { action: name.to_string(), argument: missing.clone() });
        }
        if let Some(unexpected) = args.keys().find(|arg| !parameters.has_property(arg)) {
            return Err(AgentError::UnexpectedArgument { action: name.to_string(), argument: unexpected.clone() });
        }

        entry.tool.parse(Value::Object(args))
    }
}
