use crate::{actor::ActorStrategy,
            afford::AffordanceStrategy,
            browser::BrowserSession,
            error::{AgentError, AgentResult},
            llm::{ChatCompletion, FunctionDef, Message, MessageOptions, estimate_tokens},
            trajectory::{DebugDisplayKind, Trajectory, TrajectoryItem}};
use async_trait::async_trait;
use std::sync::Arc;

/// Share of the context window kept free for the reply
pub const DEFAULT_CONTEXT_MARGIN: f64 = 0.1;

/// One model call over the afforder's prompt and catalogue
pub struct BaseActor {
    model: Arc<dyn ChatCompletion>,
    afforder: Arc<dyn AffordanceStrategy>,
    context_margin: f64,
}

impl BaseActor {
    pub fn new(model: Arc<dyn ChatCompletion>, afforder: Arc<dyn AffordanceStrategy>) -> Self {
        Self { model, afforder, context_margin: DEFAULT_CONTEXT_MARGIN }
    }

    /// Builder method: fraction of the context window left unused, clamped to `0.0..1.0`
    pub fn context_margin(mut self, margin: f64) -> Self {
        self.context_margin = margin.clamp(0.0, 0.99);
        self
    }

    pub fn afforder(&self) -> &Arc<dyn AffordanceStrategy> {
        &self.afforder
    }

    /// Sample the next action from a prepared prompt, offering only `functions`
    ///
    /// An over-long prompt yields an `ErrorMaxContextExceeded` item without calling the model.
    pub async fn next_action_with_functions(
        &self,
        messages: &[Message],
        functions: &[FunctionDef],
    ) -> AgentResult<TrajectoryItem> {
        let context_length = self.model.context_length();
        let approx_tokens = estimate_tokens(messages, functions);
        let budget = (context_length as f64 * (1.0 - self.context_margin)) as usize;
        if approx_tokens > budget {
            log::warn!("Prompt of ~{} tokens exceeds the budget of {} tokens", approx_tokens, budget);
            return Ok(TrajectoryItem::ErrorMaxContextExceeded { allowed: context_length, received: approx_tokens });
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("{}", debug_display(messages, functions).text());
        }
        let options = MessageOptions::new().temperature(0.0).functions(functions.to_vec());
        let reply = self.model.message(messages, &options).await?;

        let Some(call) = reply.function_call else {
            return Ok(TrajectoryItem::agent_message(reply.content));
        };
        if !functions.iter().any(|f| f.name == call.name) || !self.afforder.does_action_exist(&call.name) {
            return Err(AgentError::UnsupportedAction(call.name));
        }
        self.afforder.parse_next_action(&call.name, &call.arguments)
    }
}

#[async_trait]
impl ActorStrategy for BaseActor {
    async fn next_action(&self, trajectory: &Trajectory, session: &BrowserSession) -> AgentResult<TrajectoryItem> {
        let affordances = self.afforder.affordances(trajectory, session).await?;
        self.next_action_with_functions(&affordances.messages, &affordances.functions).await
    }
}

/// The exact prompt of a model call, for logs
pub fn debug_display(messages: &[Message], functions: &[FunctionDef]) -> TrajectoryItem {
    let messages: Vec<String> = messages
        .iter()
        .map(|message| match &message.function_call {
            Some(call) => format!("{}({})", call.name, call.arguments),
            None => format!("{}: {}", message.role, message.content),
        })
        .collect();
    let functions = serde_json::to_string_pretty(functions).unwrap_or_default();
    TrajectoryItem::debug(DebugDisplayKind::LlmMessages, format!("{}\n\n{}", messages.join("\n"), functions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{afford::FunctionAfforder,
                browser::SessionOptions,
                testing::{FakeDriver, FakeElement, ScriptedModel},
                trajectory::BrowserAction};

    fn session() -> BrowserSession {
        let driver = FakeDriver::with_page(
            "https://example.com/",
            vec![FakeElement::new("button").attr("aria-label", "Sign in").text("Sign in")],
        );
        BrowserSession::new(driver, SessionOptions::new().resolve_redirects(false))
    }

    fn actor(model: Arc<ScriptedModel>) -> BaseActor {
        BaseActor::new(model, Arc::new(FunctionAfforder::new()))
    }

    fn task() -> Trajectory {
        vec![TrajectoryItem::user_message("sign in")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_function_call_becomes_action() {
        let model = Arc::new(ScriptedModel::new(vec![Message::function_call("click", r#"{"id": "vid-0"}"#)]));
        let item = actor(model.clone()).next_action(&task(), &session()).await.unwrap();

        assert_eq!(item, TrajectoryItem::BrowserAction(BrowserAction::Click { id: "vid-0".into() }));
        let options = &model.options()[0];
        assert_eq!(options.temperature, 0.0);
        assert_eq!(options.functions.len(), 6);
        assert!(options.function_call.is_none());
    }

    #[tokio::test]
    async fn test_free_text_becomes_agent_message() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("Which account should I use?")]));
        let item = actor(model).next_action(&task(), &session()).await.unwrap();
        assert_eq!(item, TrajectoryItem::agent_message("Which account should I use?"));
        assert!(item.should_handoff());
    }

    #[tokio::test]
    async fn test_missing_argument_is_reported() {
        let model = Arc::new(ScriptedModel::new(vec![Message::function_call("click", "{}")]));
        let driver_session = session();
        let err = actor(model).next_action(&task(), &driver_session).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingArgument { ref argument, .. } if argument == "id"));
    }

    #[tokio::test]
    async fn test_invented_action_is_unsupported() {
        let model = Arc::new(ScriptedModel::new(vec![Message::function_call("scroll", r#"{"dy": 10}"#)]));
        let err = actor(model).next_action(&task(), &session()).await.unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedAction(ref name) if name == "scroll"));
    }

    #[tokio::test]
    async fn test_context_overflow_skips_model() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("unused")]).with_context_length(50));
        let item = actor(model.clone()).next_action(&task(), &session()).await.unwrap();

        assert!(matches!(item, TrajectoryItem::ErrorMaxContextExceeded { allowed: 50, received } if received > 45));
        assert!(item.should_handoff());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_call_outside_offered_functions_is_unsupported() {
        let model = Arc::new(ScriptedModel::new(vec![Message::function_call("click", r#"{"id": "vid-0"}"#)]));
        let actor = actor(model);
        let offered: Vec<FunctionDef> =
            actor.afforder().functions().into_iter().filter(|f| f.name != "click").collect();

        let err = actor.next_action_with_functions(&[Message::user("sign in")], &offered).await.unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedAction(_)));
    }

    #[test]
    fn test_debug_display() {
        let messages = vec![Message::system("be brief"), Message::function_call("click", r#"{"id":"vid-1"}"#)];
        let item = debug_display(&messages, &[]);
        assert!(!item.should_render());
        assert_eq!(item.text(), "debug[llm_messages]: system: be brief\nclick({\"id\":\"vid-1\"})\n\n[]");
    }
}
