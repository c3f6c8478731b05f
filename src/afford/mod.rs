//! Affordances: what the model is shown and which functions it may call
//!
//! An [`AffordanceStrategy`] builds the prompt for the next model call from the trajectory and the
//! browser, and maps the function the model picked back onto a trajectory item.

pub mod filter;
pub mod function;

pub use filter::FilterAfforder;
pub use function::FunctionAfforder;

use crate::{browser::BrowserSession,
            error::{AgentError, AgentResult},
            llm::{ChatCompletion, FunctionDef, Message},
            trajectory::{Trajectory, TrajectoryItem}};
use async_trait::async_trait;
use std::{fmt, str::FromStr, sync::Arc};

/// Prompt and function catalogue for one model call
#[derive(Debug, Clone, PartialEq)]
pub struct Affordances {
    pub messages: Vec<Message>,
    pub functions: Vec<FunctionDef>,
}

#[async_trait]
pub trait AffordanceStrategy: Send + Sync {
    /// Build the prompt from the current page and history
    async fn affordances(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<Affordances>;

    /// Turn the model's function call into a trajectory item
    fn parse_next_action(&self, name: &str, arguments: &str) -> AgentResult<TrajectoryItem>;

    fn does_action_exist(&self, name: &str) -> bool;

    /// Full function catalogue, independent of page content
    fn functions(&self) -> Vec<FunctionDef>;
}

/// Selects an [`AffordanceStrategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AffordanceStrategyId {
    #[default]
    Function,
    Filter,
}

impl AffordanceStrategyId {
    pub fn build(self, model: Arc<dyn ChatCompletion>) -> Arc<dyn AffordanceStrategy> {
        match self {
            AffordanceStrategyId::Function => Arc::new(FunctionAfforder::new()),
            AffordanceStrategyId::Filter => Arc::new(FilterAfforder::new(model)),
        }
    }
}

impl FromStr for AffordanceStrategyId {
    type Err = AgentError;

    fn from_str(s: &str) -> AgentResult<Self> {
        match s {
            "function" | "function_afforder" => Ok(AffordanceStrategyId::Function),
            "filter" | "filter_afforder" => Ok(AffordanceStrategyId::Filter),
            other => Err(AgentError::InvalidStrategy(format!("unknown afforder strategy: {}", other))),
        }
    }
}

impl fmt::Display for AffordanceStrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffordanceStrategyId::Function => f.write_str("function_afforder"),
            AffordanceStrategyId::Filter => f.write_str("filter_afforder"),
        }
    }
}

/// Page and history between the section markers the prompts refer to
pub(crate) fn render_state(display: &str, trajectory: &Trajectory) -> String {
    format!(
        "----- START BROWSER -----\n{}\n----- END BROWSER -----\n\n----- START TRAJECTORY -----\n{}\n----- END TRAJECTORY -----",
        display,
        trajectory.text()
    )
}
