//! # browser-pilot
//!
//! A natural-language browser agent. The page is rendered to compact text in which every element the
//! agent can act on carries a stable virtual id; a chat model picks the next action from a fixed
//! function catalogue, and the action is carried out in Chrome over the DevTools Protocol.
//!
//! ## Running a task
//!
//! ```rust,no_run
//! use browser_pilot::{actor::{ActorConfig, build_actor},
//!                     browser::{BrowserSession, LaunchOptions, SessionOptions},
//!                     llm::{OpenAiChatModel, OpenAiConfig},
//!                     runner::{Runner, RunnerOptions}};
//! use std::sync::Arc;
//!
//! # async fn run() -> browser_pilot::AgentResult<()> {
//! let model = Arc::new(OpenAiChatModel::new(OpenAiConfig::new("sk-...").model("gpt-4"))?);
//! let actor = build_actor(&ActorConfig::new(), model)?;
//! let session = Arc::new(BrowserSession::launch(LaunchOptions::default(), SessionOptions::new())?);
//!
//! let runner = Runner::from_initial_page("https://example.com", session, actor, RunnerOptions::new()).await?;
//! runner.add_user_message("Open the more information link");
//! runner.run().await?;
//! println!("{}", runner.trajectory().full_text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: browser session, virtual ids and the Chrome driver
//! - [`dom`]: HTML parsing and the page-to-text renderer
//! - [`trajectory`]: the append-only history of a run
//! - [`llm`]: chat model interface and the OpenAI client
//! - [`tools`]: the typed action catalogue offered to the model
//! - [`afford`]: what the model is shown for each step
//! - [`actor`]: strategies that choose the next action
//! - [`runner`]: the control loop, streaming and run logs
//! - [`relay`]: key/value store shared with other front-ends (HTTP with the `relay` feature)
//! - [`error`]: error types and result aliases

pub mod actor;
pub mod afford;
pub mod browser;
pub mod dom;
pub mod error;
pub mod llm;
pub mod relay;
pub mod runner;
pub mod tools;
pub mod trajectory;

#[cfg(test)]
pub(crate) mod testing;

pub use actor::{ActorConfig, ActorStrategy, ActorStrategyId, build_actor};
pub use afford::{AffordanceStrategy, AffordanceStrategyId};
pub use browser::{BrowserDisplay, BrowserSession, ConnectionOptions, LaunchOptions, SessionOptions};
pub use error::{AgentError, AgentResult, BrowserError, Result};
pub use llm::{ChatCompletion, OpenAiChatModel, OpenAiConfig};
pub use runner::{RunOutcome, Runner, RunnerOptions, TrajectoryStream};
pub use trajectory::{BrowserAction, SharedTrajectory, Trajectory, TrajectoryItem};
