use thiserror::Error;

/// Errors raised by the browser session, the renderer and the driver underneath
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("invalid virtual id: {0}")]
    InvalidVirtualId(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("cannot {action} element of type {element_type}")]
    UnsupportedElementType { action: String, element_type: String },

    #[error("keys cannot be empty")]
    EmptyText,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("browser cannot accept action: {0}")]
    UnsupportedAction(String),

    #[error("unsupported render language: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Driver operation failed: {0}")]
    DriverFailed(String),

    #[error("browser session was cancelled")]
    Cancelled,
}

/// Errors raised while choosing or parsing the next action
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("action {action} is missing required argument {argument}")]
    MissingArgument { action: String, argument: String },

    #[error("action {action} got unexpected argument {argument}")]
    UnexpectedArgument { action: String, argument: String },

    #[error("invalid arguments for {action}: {reason}")]
    InvalidArguments { action: String, reason: String },

    #[error("model call failed: {0}")]
    Model(String),

    #[error("could not find a valid action")]
    NoValidAction,

    #[error("invalid strategy configuration: {0}")]
    InvalidStrategy(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether this error means the browser context was torn down
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled | AgentError::Browser(BrowserError::Cancelled))
    }
}

/// Result type alias for browser operations
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Result type alias for agent operations
pub type AgentResult<T> = std::result::Result<T, AgentError>;
