//! In-memory stand-ins for the browser and the model, used by unit tests

use crate::{browser::{driver::BrowserDriver,
                      scripts::PageScript,
                      virtual_id::VIRTUAL_ID_ATTR},
            error::{AgentError, AgentResult, BrowserError, Result},
            llm::{ChatCompletion, Message, MessageOptions}};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::{collections::{HashMap, VecDeque},
          sync::{Arc, Mutex, MutexGuard}};

const INTERACTIVE_TAGS: &[&str] = &["button", "input", "a", "textarea"];

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    tag: String,
    attrs: IndexMap<String, String>,
    text: String,
    visible: bool,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string(), attrs: IndexMap::new(), text: String::new(), visible: true }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn vid(&self) -> Option<&str> {
        self.attrs.get(VIRTUAL_ID_ATTR).map(String::as_str)
    }

    fn needs_vid(&self) -> bool {
        self.visible && self.vid().is_none() && INTERACTIVE_TAGS.contains(&self.tag.as_str())
    }

    fn to_html(&self) -> String {
        let mut attrs: String = self
            .attrs
            .iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, v.replace('&', "&amp;").replace('"', "&quot;")))
            .collect();
        if !self.visible {
            attrs.push_str(" style=\"display: none\"");
        }
        if self.tag == "input" {
            format!("<input{}>", attrs)
        } else {
            format!("<{tag}{}>{}</{tag}>", attrs, self.text, tag = self.tag)
        }
    }
}

#[derive(Debug, Default)]
struct FakePage {
    location: String,
    elements: Vec<FakeElement>,
    pages: HashMap<String, Vec<FakeElement>>,
    ready: bool,
    calls: Vec<String>,
}

impl FakePage {
    fn load(&mut self, url: &str) {
        self.location = url.to_string();
        self.elements = self.pages.get(url).cloned().unwrap_or_default();
    }

    fn find(&mut self, selector: &str) -> Option<&mut FakeElement> {
        let id = selector.strip_prefix(&format!("[{}=\"", VIRTUAL_ID_ATTR))?.strip_suffix("\"]")?;
        self.elements.iter_mut().find(|el| el.vid() == Some(id))
    }

    fn answer(&mut self, script: PageScript, args: &Value) -> Value {
        match script {
            PageScript::CollectVirtualIds => {
                let existing: Vec<&str> = self.elements.iter().filter_map(FakeElement::vid).collect();
                let missing = self.elements.iter().filter(|el| el.needs_vid()).count();
                // real pages hand back a JSON string
                Value::String(json!({ "existing": existing, "missing": missing }).to_string())
            }
            PageScript::AssignVirtualIds => {
                let ids: Vec<String> = args["ids"]
                    .as_array()
                    .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                let mut ids = ids.into_iter();
                let mut assigned = 0;
                for el in self.elements.iter_mut().filter(|el| el.needs_vid()) {
                    let Some(id) = ids.next() else { break };
                    el.attrs.insert(VIRTUAL_ID_ATTR.to_string(), id);
                    assigned += 1;
                }
                json!({ "assigned": assigned })
            }
            PageScript::InspectElement => {
                let selector = args["selector"].as_str().unwrap_or_default().to_string();
                match self.find(&selector) {
                    Some(el) => json!({ "found": true, "tag": el.tag }),
                    None => json!({ "found": false, "tag": "" }),
                }
            }
            PageScript::PageState => json!({ "ready": self.ready, "location": self.location }),
        }
    }
}

/// [`BrowserDriver`] over an in-memory element list that records every call
#[derive(Debug, Clone)]
pub(crate) struct FakeDriver {
    page: Arc<Mutex<FakePage>>,
}

impl FakeDriver {
    pub fn with_page(location: &str, elements: Vec<FakeElement>) -> Self {
        let mut page = FakePage { ready: true, ..FakePage::default() };
        page.pages.insert(location.to_string(), elements);
        page.load(location);
        Self { page: Arc::new(Mutex::new(page)) }
    }

    /// Register a page that `navigate` or a link click can load
    pub fn add_page(&self, url: &str, elements: Vec<FakeElement>) {
        self.lock().pages.insert(url.to_string(), elements);
    }

    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    /// Calls made so far, e.g. `navigate https://example.com/` or `evaluate pageState`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakePage> {
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut page = self.lock();
        page.calls.push(format!("navigate {}", url));
        page.load(url);
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let (script, args) = PageScript::parse_invocation(script)
            .ok_or_else(|| BrowserError::EvaluationFailed(format!("unknown script: {}", script)))?;
        let mut page = self.lock();
        page.calls.push(format!("evaluate {}", script.function_name()));
        Ok(page.answer(script, &args))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut page = self.lock();
        page.calls.push(format!("click {}", selector));
        let href = {
            let el = page.find(selector).ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))?;
            if el.tag == "a" { el.attrs.get("href").cloned() } else { None }
        };
        if let Some(href) = href.filter(|href| page.pages.contains_key(href)) {
            page.load(&href);
        }
        Ok(())
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<()> {
        let mut page = self.lock();
        page.calls.push(format!("send_keys {} {}", selector, text));
        let el = page.find(selector).ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))?;
        el.attrs.insert("value".to_string(), text.to_string());
        Ok(())
    }

    async fn outer_html(&self) -> Result<String> {
        let mut page = self.lock();
        page.calls.push("outer_html".to_string());
        let body: String = page.elements.iter().map(FakeElement::to_html).collect();
        Ok(format!("<html><head><title>fake</title></head><body>{}</body></html>", body))
    }

    async fn location(&self) -> Result<String> {
        let mut page = self.lock();
        page.calls.push("location".to_string());
        Ok(page.location.clone())
    }
}

/// [`ChatCompletion`] that replays queued replies and records every request
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<(Vec<Message>, MessageOptions)>>,
    context_length: usize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()), context_length: 100_000 }
    }

    pub fn with_context_length(mut self, context_length: usize) -> Self {
        self.context_length = context_length;
        self
    }

    /// Options passed with each request, in call order
    pub fn options(&self) -> Vec<MessageOptions> {
        self.lock_requests().iter().map(|(_, options)| options.clone()).collect()
    }

    /// Messages passed with each request, in call order
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.lock_requests().iter().map(|(messages, _)| messages.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn lock_requests(&self) -> MutexGuard<'_, Vec<(Vec<Message>, MessageOptions)>> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ChatCompletion for ScriptedModel {
    async fn message(&self, messages: &[Message], options: &MessageOptions) -> AgentResult<Message> {
        self.lock_requests().push((messages.to_vec(), options.clone()));
        self.replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .ok_or_else(|| AgentError::Model("no scripted reply left".to_string()))
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}
