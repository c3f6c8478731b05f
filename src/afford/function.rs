use crate::{afford::{AffordanceStrategy, Affordances, render_state},
            browser::{BrowserSession, RenderLanguage},
            error::AgentResult,
            llm::{FunctionDef, Message},
            tools::ToolRegistry,
            trajectory::{Trajectory, TrajectoryItem}};
use async_trait::async_trait;

const SYSTEM_PROMPT: &str = include_str!("prompts/act_on_browser.txt");

/// Baseline strategy: the whole page, the history and a fixed function catalogue
pub struct FunctionAfforder {
    registry: ToolRegistry,
}

impl FunctionAfforder {
    pub fn new() -> Self {
        Self::with_registry(ToolRegistry::with_defaults())
    }

    /// Offer a custom catalogue instead of the default actions
    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Prompt for an already rendered page
    pub fn prompt(&self, display: &str, trajectory: &Trajectory) -> Vec<Message> {
        let state = render_state(display, trajectory);
        vec![
            Message::system(SYSTEM_PROMPT.trim()),
            Message::user(format!("{}\n\nLook at the Trajectory to inform your next action.", state.trim())),
        ]
    }
}

impl Default for FunctionAfforder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AffordanceStrategy for FunctionAfforder {
    async fn affordances(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<Affordances> {
        let display = session.render(RenderLanguage::Markdown).await?;
        Ok(Affordances { messages: self.prompt(&display, trajectory), functions: self.registry.functions() })
    }

    fn parse_next_action(&self, name: &str, arguments: &str) -> AgentResult<TrajectoryItem> {
        self.registry.parse(name, arguments)
    }

    fn does_action_exist(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    fn functions(&self) -> Vec<FunctionDef> {
        self.registry.functions()
    }
}
