//! Chat model interface
//!
//! The agent only needs whole-message completions with function calling. [`ChatCompletion`] is that
//! seam; [`OpenAiChatModel`] implements it over the chat-completions API.

use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;

/// Rough characters-per-token ratio for English prompts
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Function,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Function => "function",
        };
        f.write_str(role)
    }
}

/// A function the model chose to call; `arguments` is the raw JSON text it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), function_call: None }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Assistant reply that calls a function
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Function,
            content: String::new(),
            function_call: Some(FunctionCall { name: name.into(), arguments: arguments.into() }),
        }
    }
}

/// JSON-schema object describing a function's arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub properties: IndexMap<String, Value>,

    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self { kind: "object".to_string(), properties: IndexMap::new(), required: Vec::new() }
    }
}

impl Parameters {
    /// Derive parameters from a type's JSON schema; field doc comments become descriptions
    pub fn for_type<T: JsonSchema>() -> Self {
        let schema = schemars::schema_for!(T);
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        Self { kind: "object".to_string(), properties, required }
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

/// One entry of the function catalogue offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Parameters,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Parameters) -> Self {
        Self { name: name.into(), description: description.into(), parameters }
    }

    /// Function whose arguments deserialize into `T`
    pub fn for_params<T: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, Parameters::for_type::<T>())
    }
}

/// Sampling options for one completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    pub temperature: f32,

    /// Functions the model may call
    pub functions: Vec<FunctionDef>,

    /// Force a call to this function
    pub function_call: Option<String>,
}

impl MessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn functions(mut self, functions: Vec<FunctionDef>) -> Self {
        self.functions = functions;
        self
    }

    pub fn force_function(mut self, name: impl Into<String>) -> Self {
        self.function_call = Some(name.into());
        self
    }
}

/// A chat model that returns whole messages, possibly containing a function call
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn message(&self, messages: &[Message], options: &MessageOptions) -> AgentResult<Message>;

    /// Context window size in tokens
    fn context_length(&self) -> usize;
}

/// Approximate token count of a prompt and its function catalogue
pub fn estimate_tokens(messages: &[Message], functions: &[FunctionDef]) -> usize {
    let message_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    let function_chars: usize =
        functions.iter().map(|f| serde_json::to_string(f).map(|s| s.chars().count()).unwrap_or(0)).sum();
    (message_chars + function_chars).div_ceil(CHARS_PER_TOKEN)
}

/// Call `function` with a forced function call and decode its arguments
pub async fn call_function<T: DeserializeOwned>(
    model: &dyn ChatCompletion,
    messages: &[Message],
    function: FunctionDef,
) -> AgentResult<T> {
    let name = function.name.clone();
    let options = MessageOptions::new().temperature(0.0).functions(vec![function]).force_function(&name);
    let reply = model.message(messages, &options).await?;

    let call = reply.function_call.ok_or_else(|| AgentError::Model(format!("expected a call to {}", name)))?;
    if call.name != name {
        return Err(AgentError::Model(format!("expected a call to {}, got {}", name, call.name)));
    }
    serde_json::from_str(&call.arguments)
        .map_err(|e| AgentError::InvalidArguments { action: name, reason: e.to_string() })
}

/// OpenAI endpoint configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub context_length: usize,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            context_length: 8192,
            timeout: Duration::from_secs(120),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty())?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config = config.model(model);
        }
        Some(config)
    }

    /// Builder method: choose the model; known models also set their context length
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if let Some(context_length) = known_context_length(&self.model) {
            self.context_length = context_length;
        }
        self
    }

    pub fn context_length(mut self, context_length: usize) -> Self {
        self.context_length = context_length;
        self
    }
}

fn known_context_length(model: &str) -> Option<usize> {
    match model {
        "gpt-3.5-turbo" => Some(4096),
        "gpt-3.5-turbo-16k" => Some(16384),
        "gpt-4" => Some(8192),
        "gpt-4-32k" => Some(32768),
        m if m.starts_with("gpt-4o") || m.starts_with("gpt-4-turbo") => Some(128_000),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a FunctionDef,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

/// [`ChatCompletion`] over the OpenAI chat-completions API
pub struct OpenAiChatModel {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Model(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn build_request<'a>(&'a self, messages: &[Message], options: &'a MessageOptions) -> ApiRequest<'a> {
        let messages = messages
            .iter()
            .map(|message| match (&message.role, &message.function_call) {
                (_, Some(call)) => {
                    ApiMessage { role: "assistant", content: format!("{}({})", call.name, call.arguments) }
                }
                (MessageRole::System, None) => ApiMessage { role: "system", content: message.content.clone() },
                (MessageRole::User, None) => ApiMessage { role: "user", content: message.content.clone() },
                (MessageRole::Assistant | MessageRole::Function, None) => {
                    ApiMessage { role: "assistant", content: message.content.clone() }
                }
            })
            .collect();
        let tools = options.functions.iter().map(|function| ApiTool { tool_type: "function", function }).collect();
        let tool_choice = options
            .function_call
            .as_ref()
            .map(|name| serde_json::json!({ "type": "function", "function": { "name": name } }));

        ApiRequest { model: &self.config.model, messages, temperature: options.temperature, tools, tool_choice }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChatModel {
    async fn message(&self, messages: &[Message], options: &MessageOptions) -> AgentResult<Message> {
        let request = self.build_request(messages, options);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        log::debug!("Requesting completion from {} ({} messages)", url, messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Model(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Model(format!("API error {}: {}", status, text)));
        }

        let body: ApiResponse =
            response.json().await.map_err(|e| AgentError::Model(format!("Invalid response: {}", e)))?;
        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AgentError::Model("Response contained no choices".to_string()))?;

        match message.tool_calls.into_iter().next() {
            Some(call) => Ok(Message::function_call(call.function.name, call.function.arguments)),
            None => Ok(Message::assistant(message.content.unwrap_or_default())),
        }
    }

    fn context_length(&self) -> usize {
        self.config.context_length
    }
}
