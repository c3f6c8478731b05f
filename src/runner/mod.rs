//! The control loop
//!
//! Each step asks the actor for the next item and appends it. A handoff item stops the loop;
//! anything else is executed against the browser and its observation appended. After
//! `max_num_steps` steps without a handoff an `ErrorMaxStepsReached` item is appended instead.

pub mod run_log;
pub mod stream;

pub use run_log::write_run_log;
pub use stream::TrajectoryStream;

use crate::{actor::ActorStrategy,
            browser::BrowserSession,
            error::{AgentError, AgentResult},
            trajectory::{BrowserAction, SharedTrajectory, Trajectory, TrajectoryItem}};
use std::{future::Future, path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_NUM_STEPS: usize = 5;
pub const DEFAULT_LOG_DIR: &str = "log";

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Steps per turn before the run hands back control
    pub max_num_steps: usize,

    /// Where the run log is written after every step; `None` disables it
    pub log_dir: Option<PathBuf>,

    /// Capacity of the channel behind [`Runner::run_and_stream`]
    pub stream_buffer: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self { max_num_steps: DEFAULT_MAX_NUM_STEPS, log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)), stream_buffer: 16 }
    }
}

impl RunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_num_steps(mut self, max: usize) -> Self {
        self.max_num_steps = max;
        self
    }

    pub fn log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The item that returned control to the human
    Handoff(TrajectoryItem),
    StepLimitReached,
}

#[derive(Clone)]
pub struct Runner {
    session: Arc<BrowserSession>,
    actor: Arc<dyn ActorStrategy>,
    trajectory: SharedTrajectory,
    options: RunnerOptions,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        session: Arc<BrowserSession>,
        actor: Arc<dyn ActorStrategy>,
        trajectory: SharedTrajectory,
        options: RunnerOptions,
    ) -> Self {
        Self { session, actor, trajectory, options, cancel: CancellationToken::new() }
    }

    /// Start on `url`, recording the visit as if the user had asked for it
    pub async fn from_initial_page(
        url: &str,
        session: Arc<BrowserSession>,
        actor: Arc<dyn ActorStrategy>,
        options: RunnerOptions,
    ) -> AgentResult<Self> {
        let action = BrowserAction::Navigate { url: url.to_string() };
        let observation = session.accept_action(&action).await?;
        let trajectory: Trajectory = vec![
            TrajectoryItem::user_message(format!("Please go to {}", url)),
            action.into(),
            TrajectoryItem::observation(observation),
        ]
        .into_iter()
        .collect();
        log::debug!("Runner starting on {} with at most {} steps per turn", url, options.max_num_steps);
        Ok(Self::new(session, actor, SharedTrajectory::new(trajectory), options))
    }

    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Current trajectory snapshot
    pub fn trajectory(&self) -> Arc<Trajectory> {
        self.trajectory.snapshot()
    }

    /// Handle other front-ends use to read and extend the same trajectory
    pub fn shared_trajectory(&self) -> SharedTrajectory {
        self.trajectory.clone()
    }

    pub fn add_user_message(&self, text: impl Into<String>) {
        self.trajectory.push(TrajectoryItem::user_message(text));
    }

    /// Run until a handoff, the step limit, or an error
    pub async fn run(&self) -> AgentResult<RunOutcome> {
        self.drive(None).await
    }

    /// Run in a background task, yielding every appended item
    pub fn run_and_stream(&self) -> TrajectoryStream {
        let (tx, rx) = mpsc::channel(self.options.stream_buffer);
        let token = self.cancel.child_token();
        let runner = Runner { cancel: token.clone(), ..self.clone() };

        tokio::spawn(async move {
            if let Err(e) = runner.drive(Some(&tx)).await {
                if !runner.cancel.is_cancelled() {
                    let _ = tx.send(Err(e)).await;
                }
            }
        });
        TrajectoryStream::new(rx, token)
    }

    /// Write the run log now, regardless of the per-step setting
    pub async fn log(&self) -> AgentResult<()> {
        let dir = self.options.log_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
        write_run_log(&dir, &self.trajectory.snapshot(), &self.session.display().await).await
    }

    /// Stop any run in progress and shut the browser down
    pub async fn terminate(&self) -> AgentResult<()> {
        self.cancel.cancel();
        self.session.shutdown().await?;
        Ok(())
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn drive(&self, sink: Option<&mpsc::Sender<AgentResult<TrajectoryItem>>>) -> AgentResult<RunOutcome> {
        for step in 0..self.options.max_num_steps {
            let snapshot = self.trajectory.snapshot();
            let item = self.cancellable(self.actor.next_action(&snapshot, &self.session)).await??;
            log::debug!("Step {}: {}", step + 1, item.text());
            self.append(item.clone(), sink).await?;

            if item.should_handoff() {
                self.log_step().await;
                return Ok(RunOutcome::Handoff(item));
            }
            if let Some(action) = item.as_action() {
                let observation = self.cancellable(self.session.accept_action(action)).await??;
                self.append(TrajectoryItem::observation(observation), sink).await?;
            }
            self.log_step().await;
        }

        self.append(TrajectoryItem::ErrorMaxStepsReached { max_num_steps: self.options.max_num_steps }, sink).await?;
        self.log_step().await;
        Ok(RunOutcome::StepLimitReached)
    }

    async fn append(
        &self,
        item: TrajectoryItem,
        sink: Option<&mpsc::Sender<AgentResult<TrajectoryItem>>>,
    ) -> AgentResult<()> {
        self.trajectory.push(item.clone());
        if let Some(tx) = sink {
            // a closed channel means the consumer is gone
            self.cancellable(tx.send(Ok(item))).await?.map_err(|_| AgentError::Cancelled)?;
        }
        Ok(())
    }

    /// Await `future` unless the runner or the browser is cancelled first
    async fn cancellable<T>(&self, future: impl Future<Output = T>) -> AgentResult<T> {
        if self.cancel.is_cancelled() || self.session.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let session_cancel = self.session.cancellation_token();
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            _ = session_cancel.cancelled() => Err(AgentError::Cancelled),
            output = future => Ok(output),
        }
    }

    async fn log_step(&self) {
        let Some(dir) = &self.options.log_dir else { return };
        let display = self.session.display().await;
        if let Err(e) = write_run_log(dir, &self.trajectory.snapshot(), &display).await {
            log::warn!("Failed to write run log to {}: {}", dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{actor::BaseActor,
                afford::FunctionAfforder,
                browser::SessionOptions,
                error::BrowserError,
                llm::Message,
                testing::{FakeDriver, FakeElement, ScriptedModel}};

    fn driver() -> FakeDriver {
        let driver = FakeDriver::with_page("about:blank", vec![]);
        driver.add_page(
            "https://example.com/",
            vec![FakeElement::new("h1").text("Example Domain"), FakeElement::new("button").text("More")],
        );
        driver
    }

    fn runner(driver: FakeDriver, replies: Vec<Message>, options: RunnerOptions) -> (Runner, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(replies));
        let session = Arc::new(BrowserSession::new(driver, SessionOptions::new().resolve_redirects(false)));
        let actor = Arc::new(BaseActor::new(model.clone(), Arc::new(FunctionAfforder::new())));
        let trajectory = SharedTrajectory::new(
            vec![TrajectoryItem::user_message("go to example.com")].into_iter().collect(),
        );
        (Runner::new(session, actor, trajectory, options), model)
    }

    fn quiet() -> RunnerOptions {
        RunnerOptions::new().log_dir(None)
    }

    fn navigate(url: &str) -> Message {
        Message::function_call("navigate", serde_json::json!({ "url": url }).to_string())
    }

    #[tokio::test]
    async fn test_navigate_appends_action_then_observation() {
        let (runner, _) = runner(driver(), vec![navigate("https://example.com"), Message::assistant("Done")], quiet());
        let outcome = runner.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::Handoff(TrajectoryItem::agent_message("Done")));
        let trajectory = runner.trajectory();
        assert_eq!(
            &trajectory.items()[1..3],
            &[
                TrajectoryItem::from(BrowserAction::Navigate { url: "https://example.com".into() }),
                TrajectoryItem::observation("navigated to https://example.com/"),
            ]
        );
        assert_eq!(trajectory.len(), 4);
    }

    #[tokio::test]
    async fn test_step_limit() {
        let driver = driver();
        let (runner, _) = runner(
            driver,
            vec![navigate("https://example.com"), Message::function_call("click", r#"{"id": "vid-0"}"#)],
            quiet().max_num_steps(2),
        );
        let outcome = runner.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::StepLimitReached);
        let trajectory = runner.trajectory();
        let actions = trajectory.items().iter().filter(|item| item.as_action().is_some()).count();
        assert_eq!(actions, 2);
        let last = trajectory.last().unwrap();
        assert_eq!(last, &TrajectoryItem::ErrorMaxStepsReached { max_num_steps: 2 });
        assert!(last.should_handoff());
    }

    #[tokio::test]
    async fn test_terminal_action_hands_off_without_browser_call() {
        let driver = driver();
        let (runner, _) = runner(
            driver.clone(),
            vec![Message::function_call("task_complete", r#"{"reason": "nothing to do"}"#)],
            quiet(),
        );
        let before = driver.calls().iter().filter(|call| call.starts_with("navigate")).count();
        let outcome = runner.run().await.unwrap();

        let RunOutcome::Handoff(item) = outcome else { panic!("expected a handoff") };
        assert!(matches!(item.as_action(), Some(BrowserAction::TaskComplete { .. })));
        assert_eq!(driver.calls().iter().filter(|call| call.starts_with("navigate")).count(), before);
    }

    #[tokio::test]
    async fn test_browser_error_aborts_run() {
        let (runner, _) =
            runner(driver(), vec![Message::function_call("click", r#"{"id": "vid-9"}"#)], quiet());
        let err = runner.run().await.unwrap_err();

        assert!(matches!(err, AgentError::Browser(BrowserError::ElementNotFound(_))));
        assert!(runner.trajectory().last().unwrap().as_action().is_some());
    }

    #[tokio::test]
    async fn test_model_error_aborts_run() {
        let (runner, _) = runner(driver(), vec![], quiet());
        assert!(matches!(runner.run().await, Err(AgentError::Model(_))));
        assert_eq!(runner.trajectory().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_runner_stops() {
        let (runner, model) = runner(driver(), vec![Message::assistant("unused")], quiet());
        runner.cancellation_token().cancel();

        let err = runner.run().await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_yields_items_in_order() {
        let (runner, _) = runner(driver(), vec![navigate("https://example.com"), Message::assistant("Done")], quiet());
        let mut stream = runner.run_and_stream();

        let mut items = Vec::new();
        while let Some(item) = stream.next_item().await {
            items.push(item.unwrap());
        }
        assert_eq!(items.len(), 3);
        assert!(items[0].as_action().is_some());
        assert_eq!(items[1], TrajectoryItem::observation("navigated to https://example.com/"));
        assert_eq!(items[2], TrajectoryItem::agent_message("Done"));
        assert_eq!(runner.trajectory().len(), 4);
    }

    #[tokio::test]
    async fn test_stream_reports_errors() {
        let (runner, _) = runner(driver(), vec![], quiet());
        let mut stream = runner.run_and_stream();
        assert!(matches!(stream.next_item().await, Some(Err(AgentError::Model(_)))));
        assert!(stream.next_item().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_run() {
        let (runner, _) = runner(driver(), vec![navigate("https://example.com")], quiet());
        let stream = runner.run_and_stream();
        let token = stream.cancellation_token();
        drop(stream);

        assert!(token.is_cancelled());
        assert!(!runner.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_from_initial_page() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let session = Arc::new(BrowserSession::new(driver(), SessionOptions::new().resolve_redirects(false)));
        let actor = Arc::new(BaseActor::new(model, Arc::new(FunctionAfforder::new())));
        let runner = Runner::from_initial_page("https://example.com", session, actor, quiet()).await.unwrap();

        let text = runner.trajectory().full_text();
        assert_eq!(
            text,
            "user: Please go to https://example.com\naction: navigate(url=\"https://example.com\")\n\
             observation: navigated to https://example.com/"
        );
    }

    #[tokio::test]
    async fn test_log_writes_files() {
        let dir = std::env::temp_dir().join(format!("browser-pilot-log-{}", std::process::id()));
        let options = RunnerOptions::new().log_dir(Some(dir.clone()));
        let (runner, _) = runner(driver(), vec![navigate("https://example.com"), Message::assistant("Done")], options);
        runner.run().await.unwrap();

        let traj = std::fs::read_to_string(dir.join("traj.txt")).unwrap();
        assert!(traj.starts_with("user: go to example.com\naction: navigate"));
        let markdown = std::fs::read_to_string(dir.join("display.md")).unwrap();
        assert!(markdown.contains("# Example Domain"));
        assert!(std::fs::read_to_string(dir.join("display.html")).unwrap().contains("<h1>"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
