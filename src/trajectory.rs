//! Append-only history of a task run
//!
//! Every message, action, observation and terminal marker becomes a
//! [`TrajectoryItem`]. The text the model conditions on is a fold over the
//! whole sequence, so items are never edited or removed once pushed.

use serde::{Deserialize, Serialize};
use std::{fmt,
          sync::{Arc, RwLock}};

/// Length after which agent messages and observations are abbreviated
pub const ABBREVIATION_LENGTH: usize = 100;

/// Action the agent asks the browser (or the human) to carry out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    Click { id: String },
    SendKeys { id: String, text: String },
    Navigate { url: String },
    TaskComplete { reason: String },
    TaskNotPossible { reason: String },
}

impl BrowserAction {
    /// Action name as exposed to the model
    pub fn name(&self) -> &'static str {
        match self {
            BrowserAction::Click { .. } => "click",
            BrowserAction::SendKeys { .. } => "send_keys",
            BrowserAction::Navigate { .. } => "navigate",
            BrowserAction::TaskComplete { .. } => "task_complete",
            BrowserAction::TaskNotPossible { .. } => "task_not_possible",
        }
    }

    /// Whether this action ends the run instead of touching the browser
    pub fn is_terminal(&self) -> bool {
        matches!(self, BrowserAction::TaskComplete { .. } | BrowserAction::TaskNotPossible { .. })
    }
}

impl fmt::Display for BrowserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserAction::Click { id } => write!(f, "click(id={})", id),
            BrowserAction::SendKeys { id, text } => write!(f, "send_keys(id={}, text=\"{}\")", id, text),
            BrowserAction::Navigate { url } => write!(f, "navigate(url=\"{}\")", url),
            BrowserAction::TaskComplete { reason } => write!(f, "task_complete(reason=\"{}\")", reason),
            BrowserAction::TaskNotPossible { reason } => write!(f, "task_not_possible(reason=\"{}\")", reason),
        }
    }
}

/// Which internal state a debug item captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugDisplayKind {
    Browser,
    Trajectory,
    LlmMessages,
}

impl fmt::Display for DebugDisplayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DebugDisplayKind::Browser => "browser",
            DebugDisplayKind::Trajectory => "trajectory",
            DebugDisplayKind::LlmMessages => "llm_messages",
        };
        f.write_str(name)
    }
}

/// One entry of the trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TrajectoryItem {
    UserMessage { text: String },
    AgentMessage { text: String },
    InternalFeedbackMessage { text: String },
    BrowserAction(BrowserAction),
    BrowserObservation { text: String },
    DebugDisplay { kind: DebugDisplayKind, text: String },
    ErrorMaxStepsReached { max_num_steps: usize },
    ErrorMaxContextExceeded { allowed: usize, received: usize },
}

impl TrajectoryItem {
    pub fn user_message(text: impl Into<String>) -> Self {
        TrajectoryItem::UserMessage { text: text.into() }
    }

    pub fn agent_message(text: impl Into<String>) -> Self {
        TrajectoryItem::AgentMessage { text: text.into() }
    }

    pub fn internal_feedback(text: impl Into<String>) -> Self {
        TrajectoryItem::InternalFeedbackMessage { text: text.into() }
    }

    pub fn observation(text: impl Into<String>) -> Self {
        TrajectoryItem::BrowserObservation { text: text.into() }
    }

    pub fn debug(kind: DebugDisplayKind, text: impl Into<String>) -> Self {
        TrajectoryItem::DebugDisplay { kind, text: text.into() }
    }

    /// Full text of the item
    pub fn text(&self) -> String {
        match self {
            TrajectoryItem::UserMessage { text } => format!("user: {}", text),
            TrajectoryItem::AgentMessage { text } => format!("agent: {}", text),
            TrajectoryItem::InternalFeedbackMessage { text } => format!("internal_feedback: {}", text),
            TrajectoryItem::BrowserAction(action) => format!("action: {}", action),
            TrajectoryItem::BrowserObservation { text } => format!("observation: {}", text),
            TrajectoryItem::DebugDisplay { kind, text } => format!("debug[{}]: {}", kind, text),
            TrajectoryItem::ErrorMaxStepsReached { max_num_steps } => {
                format!("max num steps reached: {}", max_num_steps)
            }
            TrajectoryItem::ErrorMaxContextExceeded { allowed, received } => {
                format!("max context length exceeded: allowed {}, received {}", allowed, received)
            }
        }
    }

    /// Text shortened for history views; only long agent messages and observations are cut
    pub fn abbreviated_text(&self) -> String {
        match self {
            TrajectoryItem::AgentMessage { text } => format!("agent: {}", abbreviate(text, ABBREVIATION_LENGTH)),
            TrajectoryItem::BrowserObservation { text } => {
                format!("observation: {}", abbreviate(text, ABBREVIATION_LENGTH))
            }
            _ => self.text(),
        }
    }

    /// Whether the run stops here and control returns to the human
    pub fn should_handoff(&self) -> bool {
        match self {
            TrajectoryItem::AgentMessage { .. }
            | TrajectoryItem::ErrorMaxStepsReached { .. }
            | TrajectoryItem::ErrorMaxContextExceeded { .. } => true,
            TrajectoryItem::BrowserAction(action) => action.is_terminal(),
            TrajectoryItem::UserMessage { .. }
            | TrajectoryItem::InternalFeedbackMessage { .. }
            | TrajectoryItem::BrowserObservation { .. }
            | TrajectoryItem::DebugDisplay { .. } => false,
        }
    }

    /// Whether the item is part of the model-visible history
    pub fn should_render(&self) -> bool {
        !matches!(self, TrajectoryItem::DebugDisplay { .. })
    }

    /// Whether this is a budget marker
    pub fn is_error(&self) -> bool {
        matches!(self, TrajectoryItem::ErrorMaxStepsReached { .. } | TrajectoryItem::ErrorMaxContextExceeded { .. })
    }

    pub fn as_action(&self) -> Option<&BrowserAction> {
        match self {
            TrajectoryItem::BrowserAction(action) => Some(action),
            _ => None,
        }
    }
}

impl From<BrowserAction> for TrajectoryItem {
    fn from(action: BrowserAction) -> Self {
        TrajectoryItem::BrowserAction(action)
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub fn abbreviate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Ordered, append-only sequence of items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    items: Vec<TrajectoryItem>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: TrajectoryItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = TrajectoryItem>) {
        self.items.extend(items);
    }

    pub fn items(&self) -> &[TrajectoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectoryItem> {
        self.items.last()
    }

    /// Model-facing view: rendered items abbreviated, except the last which is always shown in full
    pub fn text(&self) -> String {
        let Some((last, history)) = self.items.split_last() else {
            return String::new();
        };
        let mut lines: Vec<String> =
            history.iter().filter(|item| item.should_render()).map(TrajectoryItem::abbreviated_text).collect();
        lines.push(last.text());
        lines.join("\n")
    }

    /// Every rendered item in full, one per line
    pub fn full_text(&self) -> String {
        self.items.iter().filter(|item| item.should_render()).map(TrajectoryItem::text).collect::<Vec<_>>().join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl FromIterator<TrajectoryItem> for Trajectory {
    fn from_iter<I: IntoIterator<Item = TrajectoryItem>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

/// Trajectory shared between the agent loop and other front-ends
///
/// Readers always get a whole snapshot; a push never exposes a partially
/// written item, and concurrent writers resolve last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct SharedTrajectory {
    inner: Arc<RwLock<Arc<Trajectory>>>,
}

impl SharedTrajectory {
    pub fn new(trajectory: Trajectory) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(trajectory))) }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Trajectory> {
        let guard = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Append an item; snapshots already handed out are unaffected
    pub fn push(&self, item: TrajectoryItem) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::make_mut(&mut *guard).push(item);
    }

    /// Replace the whole trajectory
    pub fn replace(&self, trajectory: Trajectory) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(trajectory);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(id: &str) -> TrajectoryItem {
        BrowserAction::Click { id: id.to_string() }.into()
    }

    #[test]
    fn test_item_text() {
        assert_eq!(TrajectoryItem::user_message("hi").text(), "user: hi");
        assert_eq!(click("vid-1").text(), "action: click(id=vid-1)");
        let keys: TrajectoryItem = BrowserAction::SendKeys { id: "vid-2".into(), text: "rust".into() }.into();
        assert_eq!(keys.text(), "action: send_keys(id=vid-2, text=\"rust\")");
        let nav: TrajectoryItem = BrowserAction::Navigate { url: "https://example.com".into() }.into();
        assert_eq!(nav.text(), "action: navigate(url=\"https://example.com\")");
        assert_eq!(
            TrajectoryItem::ErrorMaxStepsReached { max_num_steps: 5 }.text(),
            "max num steps reached: 5"
        );
    }

    #[test]
    fn test_abbreviation() {
        let long = "x".repeat(150);
        let item = TrajectoryItem::observation(long.clone());
        assert_eq!(item.abbreviated_text(), format!("observation: {}...", "x".repeat(100)));
        assert_eq!(item.text(), format!("observation: {}", long));

        let user = TrajectoryItem::user_message(long.clone());
        assert_eq!(user.abbreviated_text(), user.text());

        assert_eq!(abbreviate("héllo", 2), "hé...");
        assert_eq!(abbreviate("hi", 2), "hi");
    }

    #[test]
    fn test_handoff_flags() {
        assert!(TrajectoryItem::agent_message("done?").should_handoff());
        assert!(TrajectoryItem::from(BrowserAction::TaskComplete { reason: "ok".into() }).should_handoff());
        assert!(TrajectoryItem::from(BrowserAction::TaskNotPossible { reason: "no".into() }).should_handoff());
        assert!(TrajectoryItem::ErrorMaxStepsReached { max_num_steps: 5 }.should_handoff());
        assert!(TrajectoryItem::ErrorMaxContextExceeded { allowed: 1, received: 2 }.should_handoff());
        assert!(!click("vid-1").should_handoff());
        assert!(!TrajectoryItem::observation("clicked").should_handoff());
        assert!(!TrajectoryItem::user_message("go").should_handoff());
        assert!(!TrajectoryItem::internal_feedback("wrong").should_handoff());
    }

    #[test]
    fn test_empty_trajectory_text() {
        assert_eq!(Trajectory::new().text(), "");
    }

    #[test]
    fn test_last_item_is_never_abbreviated() {
        let long = "y".repeat(120);
        let traj: Trajectory = vec![
            TrajectoryItem::observation(long.clone()),
            TrajectoryItem::debug(DebugDisplayKind::Browser, "page"),
            TrajectoryItem::observation(long.clone()),
        ]
        .into_iter()
        .collect();

        let text = traj.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("..."));
        assert_eq!(lines[1], format!("observation: {}", long));
    }

    #[test]
    fn test_last_debug_item_is_still_shown() {
        let traj: Trajectory =
            vec![TrajectoryItem::debug(DebugDisplayKind::Trajectory, "state")].into_iter().collect();
        assert_eq!(traj.text(), "debug[trajectory]: state");
        assert_eq!(traj.full_text(), "");
    }

    #[test]
    fn test_json_shape() {
        let traj: Trajectory =
            vec![TrajectoryItem::user_message("go"), click("vid-3"), TrajectoryItem::observation("clicked vid-3")]
                .into_iter()
                .collect();
        let json = traj.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "user_message");
        assert_eq!(value[1]["type"], "browser_action");
        assert_eq!(value[1]["data"]["action"], "click");
        assert_eq!(value[1]["data"]["id"], "vid-3");
        assert_eq!(Trajectory::from_json(&json).unwrap(), traj);
    }

    #[test]
    fn test_shared_trajectory_snapshots() {
        let shared = SharedTrajectory::default();
        shared.push(TrajectoryItem::user_message("one"));
        let before = shared.snapshot();
        shared.push(TrajectoryItem::user_message("two"));

        assert_eq!(before.len(), 1);
        assert_eq!(shared.len(), 2);

        shared.replace(Trajectory::new());
        assert!(shared.is_empty());
    }
}
