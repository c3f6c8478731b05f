//! Self-critique: a second model call grades each proposed action before it is returned
//!
//! Rejected proposals are fed back as internal feedback on a private copy of the trajectory, so
//! the caller's history never sees them.

use crate::{actor::ActorStrategy,
            afford::AffordanceStrategy,
            browser::BrowserSession,
            error::{AgentError, AgentResult},
            llm::{ChatCompletion, FunctionDef, Message, call_function},
            trajectory::{Trajectory, TrajectoryItem}};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_MAX_NUM_ITERATIONS: usize = 3;

const SYSTEM_PROMPT: &str = include_str!("prompts/reflect.txt");
const BROWSER_SUMMARY: &str = include_str!("prompts/browser_summary.txt");

#[derive(Debug, Deserialize, JsonSchema)]
struct ActionReward {
    /// The reason for the binary classification that will follow
    reason: String,

    /// Whether the proposed action is correct or not
    classification: bool,

    /// [Optional] If the proposed action is incorrect, the correct action to take
    #[serde(default)]
    correct_action: Option<String>,
}

pub struct ReflexionActor {
    inner: Arc<dyn ActorStrategy>,
    model: Arc<dyn ChatCompletion>,
    afforder: Arc<dyn AffordanceStrategy>,
    max_num_iterations: usize,
}

impl ReflexionActor {
    pub fn new(
        inner: Arc<dyn ActorStrategy>,
        model: Arc<dyn ChatCompletion>,
        afforder: Arc<dyn AffordanceStrategy>,
    ) -> Self {
        Self { inner, model, afforder, max_num_iterations: DEFAULT_MAX_NUM_ITERATIONS }
    }

    /// Builder method: at least one round always runs
    pub fn max_num_iterations(mut self, max: usize) -> Self {
        self.max_num_iterations = max.max(1);
        self
    }

    /// Grade `candidate`; returns whether it is correct and why
    async fn reflect(&self, trajectory: &Trajectory, candidate: &TrajectoryItem) -> AgentResult<ActionReward> {
        let action_space = serde_json::to_string_pretty(&self.afforder.functions())?;
        let messages = vec![
            Message::system(SYSTEM_PROMPT.trim()),
            Message::user(format!(
                "----- START CONTEXT -----\n{}\n\n{}\n\naction space: {}\n\naction choice: {}\n----- END CONTEXT -----",
                BROWSER_SUMMARY.trim(),
                trajectory.text(),
                action_space,
                candidate.text()
            )),
        ];
        let function = FunctionDef::for_params::<ActionReward>(
            "action_reward",
            "Determines whether the proposed action is correct or not.",
        );
        call_function(self.model.as_ref(), &messages, function).await
    }
}

/// Two consecutive messages, or two consecutive actions with the same text
fn converged(previous: &TrajectoryItem, next: &TrajectoryItem) -> bool {
    match (is_message(previous), is_message(next)) {
        (true, true) => true,
        (false, false) => previous.text() == next.text(),
        _ => false,
    }
}

fn is_message(item: &TrajectoryItem) -> bool {
    matches!(item, TrajectoryItem::AgentMessage { .. })
}

#[async_trait]
impl ActorStrategy for ReflexionActor {
    async fn next_action(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<TrajectoryItem> {
        let mut local = trajectory.clone();
        let mut previous: Option<TrajectoryItem> = None;

        for iteration in 0..self.max_num_iterations {
            let candidate = self.inner.next_action(&local, session).await?;
            if candidate.is_error() {
                return Ok(candidate);
            }
            if previous.as_ref().is_some_and(|previous| converged(previous, &candidate)) {
                log::debug!("Reflexion converged after {} rounds on {}", iteration + 1, candidate.text());
                return Ok(candidate);
            }

            let reward = self.reflect(&local, &candidate).await?;
            if reward.classification {
                return Ok(candidate);
            }
            log::debug!(
                "Rejected {} ({}), suggested: {}",
                candidate.text(),
                reward.reason,
                reward.correct_action.as_deref().unwrap_or("none")
            );
            local.push(TrajectoryItem::internal_feedback(format!(
                "wrong action: {}, feedback: {}",
                candidate.text(),
                reward.reason
            )));
            previous = Some(candidate);
        }

        previous.ok_or(AgentError::NoValidAction)
    }
}
