//! Sample, verify, and resample without the rejected action until one is accepted

use crate::{actor::{ActorStrategy, BaseActor},
            browser::BrowserSession,
            error::{AgentError, AgentResult},
            llm::{ChatCompletion, FunctionDef, Message, MessageRole, call_function},
            tools::MessageTool,
            trajectory::{Trajectory, TrajectoryItem}};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = include_str!("prompts/verify.txt");

#[derive(Debug, Deserialize, JsonSchema)]
struct Verdict {
    /// Why the proposed action should be accepted or rejected
    reason: String,

    /// Whether the proposed action is accepted
    accept: bool,
}

pub struct VerificationActor {
    base: Arc<BaseActor>,
    model: Arc<dyn ChatCompletion>,
}

impl VerificationActor {
    pub fn new(base: Arc<BaseActor>, model: Arc<dyn ChatCompletion>) -> Self {
        Self { base, model }
    }

    async fn verify(&self, messages: &[Message], candidate: &TrajectoryItem) -> AgentResult<Verdict> {
        let context = messages
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        let messages = vec![
            Message::system(SYSTEM_PROMPT.trim()),
            Message::user(format!("{}\n\nproposed action: {}", context, candidate.text())),
        ];
        let function = FunctionDef::for_params::<Verdict>("verify_action", "Accept or reject the proposed action.");
        call_function(self.model.as_ref(), &messages, function).await
    }
}

/// Catalogue entry a candidate was sampled from
fn function_name(candidate: &TrajectoryItem) -> Option<&str> {
    match candidate {
        TrajectoryItem::BrowserAction(action) => Some(action.name()),
        TrajectoryItem::AgentMessage { .. } => Some(MessageTool::NAME),
        _ => None,
    }
}

#[async_trait]
impl ActorStrategy for VerificationActor {
    async fn next_action(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<TrajectoryItem> {
        let affordances = self.base.afforder().affordances(trajectory, session).await?;
        let mut functions = affordances.functions;

        while !functions.is_empty() {
            let candidate = self.base.next_action_with_functions(&affordances.messages, &functions).await?;
            if candidate.is_error() {
                return Ok(candidate);
            }

            let verdict = self.verify(&affordances.messages, &candidate).await?;
            if verdict.accept {
                return Ok(candidate);
            }
            log::debug!("Verifier rejected {}: {}", candidate.text(), verdict.reason);

            let name = function_name(&candidate).ok_or(AgentError::NoValidAction)?;
            let before = functions.len();
            functions.retain(|function| function.name != name);
            if functions.len() == before {
                // free text from the model with `message` already removed
                return Err(AgentError::NoValidAction);
            }
        }

        Err(AgentError::NoValidAction)
    }
}
