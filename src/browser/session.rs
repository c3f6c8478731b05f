use crate::{browser::{chrome::ChromeDriver,
                      config::{ConnectionOptions, LaunchOptions, SessionOptions},
                      driver::{BrowserDriver, ElementType},
                      scripts,
                      url::UrlResolver,
                      virtual_id::{VIRTUAL_ID_ATTR, VirtualId, VirtualIdGenerator}},
            dom::{DomTree, MarkdownRenderer},
            error::{BrowserError, Result},
            trajectory::{BrowserAction, abbreviate}};
use serde::Serialize;
use std::{collections::HashSet, fmt, str::FromStr};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How much of the typed text the confirmation echoes back
const SENT_KEYS_PREVIEW: usize = 10;

/// Output format of [`BrowserSession::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderLanguage {
    #[default]
    Markdown,
    Html,
}

impl FromStr for RenderLanguage {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(RenderLanguage::Markdown),
            "html" => Ok(RenderLanguage::Html),
            other => Err(BrowserError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for RenderLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderLanguage::Markdown => f.write_str("markdown"),
            RenderLanguage::Html => f.write_str("html"),
        }
    }
}

/// Snapshot of the page after the last state change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrowserDisplay {
    /// Raw document HTML, including the virtual id attributes
    pub html: String,

    /// Rendered text shown to the model
    pub text: String,

    /// Document location
    pub location: String,

    /// Number of elements carrying an aria-label
    pub aria_labels: usize,
}

impl BrowserDisplay {
    pub fn in_language(&self, language: RenderLanguage) -> &str {
        match language {
            RenderLanguage::Markdown => &self.text,
            RenderLanguage::Html => &self.html,
        }
    }
}

struct SessionState {
    driver: Box<dyn BrowserDriver>,
    ids: VirtualIdGenerator,
    display: BrowserDisplay,
}

/// Live browser context the agent acts on
///
/// All driver calls go through one lock, so actions never interleave.
pub struct BrowserSession {
    state: Mutex<SessionState>,
    resolver: UrlResolver,
    options: SessionOptions,
    cancel: CancellationToken,
}

impl BrowserSession {
    /// Wrap an existing driver
    pub fn new(driver: impl BrowserDriver + 'static, options: SessionOptions) -> Self {
        Self::from_boxed(Box::new(driver), options)
    }

    fn from_boxed(driver: Box<dyn BrowserDriver>, options: SessionOptions) -> Self {
        let resolver = UrlResolver::new(options.resolve_redirects, options.try_www);
        Self {
            state: Mutex::new(SessionState {
                driver,
                ids: VirtualIdGenerator::new(),
                display: BrowserDisplay::default(),
            }),
            resolver,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Launch a new Chrome instance
    pub fn launch(launch: LaunchOptions, options: SessionOptions) -> Result<Self> {
        Ok(Self::new(ChromeDriver::launch(launch)?, options))
    }

    /// Connect to a running Chrome instance
    pub fn connect(connection: ConnectionOptions, options: SessionOptions) -> Result<Self> {
        Ok(Self::new(ChromeDriver::connect(connection)?, options))
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Click a button or link by virtual id
    pub async fn click(&self, id: &str) -> Result<String> {
        self.ensure_active()?;
        let id = VirtualId::parse(id)?;

        let mut state = self.state.lock().await;
        self.require_element(&state, &id, "click", ElementType::is_clickable).await?;

        let before = state.display.location.clone();
        state.driver.click(&id.selector()).await?;
        self.wait_for_page_load(state.driver.as_ref()).await;
        self.refresh(&mut state).await?;
        if state.display.location != before {
            warn_if_unlabeled(&state.display);
        }

        Ok(format!("clicked {}", id))
    }

    /// Type text into an input or textarea by virtual id
    pub async fn send_keys(&self, id: &str, text: &str) -> Result<String> {
        self.ensure_active()?;
        if text.is_empty() {
            return Err(BrowserError::EmptyText);
        }
        let id = VirtualId::parse(id)?;

        let mut state = self.state.lock().await;
        self.require_element(&state, &id, "send keys to", ElementType::accepts_text).await?;

        state.driver.send_keys(&id.selector(), text).await?;
        self.refresh(&mut state).await?;

        Ok(format!("sent keys \"{}\" to {}", abbreviate(text, SENT_KEYS_PREVIEW), id))
    }

    /// Load a URL, adding a scheme and following one redirect if needed
    pub async fn navigate(&self, url: &str) -> Result<String> {
        self.ensure_active()?;
        let target = self.resolver.canonicalize(url).await?;

        let mut state = self.state.lock().await;
        state.driver.navigate(target.as_str()).await?;
        self.wait_for_page_load(state.driver.as_ref()).await;
        self.refresh(&mut state).await?;
        warn_if_unlabeled(&state.display);

        Ok(format!("navigated to {}", state.display.location))
    }

    /// Assign ids to new elements, re-render and return the page in `language`
    pub async fn render(&self, language: RenderLanguage) -> Result<String> {
        self.ensure_active()?;
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await?;
        Ok(state.display.in_language(language).to_string())
    }

    /// Last display snapshot, without touching the page
    pub async fn display(&self) -> BrowserDisplay {
        self.state.lock().await.display.clone()
    }

    /// Execute an action produced by the agent and describe the outcome
    pub async fn accept_action(&self, action: &BrowserAction) -> Result<String> {
        match action {
            BrowserAction::Click { id } => self.click(id).await,
            BrowserAction::SendKeys { id, text } => self.send_keys(id, text).await,
            BrowserAction::Navigate { url } => self.navigate(url).await,
            BrowserAction::TaskComplete { .. } | BrowserAction::TaskNotPossible { .. } => {
                Err(BrowserError::UnsupportedAction(action.name().to_string()))
            }
        }
    }

    /// Restart virtual id numbering
    pub async fn reset_virtual_ids(&self) {
        self.state.lock().await.ids.reset();
    }

    /// Swap the underlying driver (e.g. headless to headful) and reopen the current page
    pub async fn replace_driver(&self, driver: Box<dyn BrowserDriver>) -> Result<()> {
        self.ensure_active()?;
        let mut state = self.state.lock().await;
        let location = state.display.location.clone();

        if let Err(e) = state.driver.close().await {
            log::debug!("Failed to close previous driver: {}", e);
        }
        state.driver = driver;

        if !location.is_empty() && location != "about:blank" {
            log::warn!("Reopening {}; page state other than the location is lost", location);
            state.driver.navigate(&location).await?;
            self.wait_for_page_load(state.driver.as_ref()).await;
        }
        self.refresh(&mut state).await
    }

    /// Stop the session; every later call fails with [`BrowserError::Cancelled`]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token cancelled together with the session
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel and tear the browser down
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel();
        self.state.lock().await.driver.close().await
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() { Err(BrowserError::Cancelled) } else { Ok(()) }
    }

    async fn require_element(
        &self,
        state: &SessionState,
        id: &VirtualId,
        action: &str,
        allowed: fn(ElementType) -> bool,
    ) -> Result<()> {
        let info = scripts::inspect_element(state.driver.as_ref(), &id.selector()).await?;
        if !info.found {
            return Err(BrowserError::ElementNotFound(id.to_string()));
        }
        let element_type = ElementType::from_tag(&info.tag);
        if !allowed(element_type) {
            return Err(BrowserError::UnsupportedElementType {
                action: action.to_string(),
                element_type: info.tag,
            });
        }
        Ok(())
    }

    /// Poll until the document is complete; a timeout only degrades the snapshot
    async fn wait_for_page_load(&self, driver: &dyn BrowserDriver) {
        let deadline = tokio::time::Instant::now() + self.options.page_load_timeout;
        loop {
            match scripts::page_state(driver).await {
                Ok(status) if status.ready => return,
                Ok(_) => {}
                Err(e) => {
                    log::debug!("Could not read page state: {}", e);
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                log::warn!("Page did not finish loading within {:?}", self.options.page_load_timeout);
                return;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }
    }

    /// Give fresh ids to unlabelled interactive elements and rebuild the display
    async fn refresh(&self, state: &mut SessionState) -> Result<()> {
        let driver = state.driver.as_ref();
        let census = scripts::collect_virtual_ids(driver, VIRTUAL_ID_ATTR).await?;
        if census.missing > 0 {
            let existing: HashSet<String> = census.existing.into_iter().collect();
            let ids: Vec<String> =
                state.ids.generate_excluding(&existing, census.missing).iter().map(|id| id.to_string()).collect();
            let assigned = scripts::assign_virtual_ids(driver, VIRTUAL_ID_ATTR, &ids).await?;
            if assigned.assigned < ids.len() {
                log::debug!("Page changed while assigning ids: {} of {} used", assigned.assigned, ids.len());
            }
        }

        let html = driver.outer_html().await?;
        let location = driver.location().await?;
        let tree = DomTree::parse(&html);
        let mut aria_labels = 0;
        tree.walk(&mut |el| {
            if el.non_empty_attribute("aria-label").is_some() {
                aria_labels += 1;
            }
        });
        let text = MarkdownRenderer::new(&self.options.render).render(&tree);

        state.display = BrowserDisplay { html, text, location, aria_labels };
        Ok(())
    }
}

fn warn_if_unlabeled(display: &BrowserDisplay) {
    if display.aria_labels == 0 {
        log::warn!("{} has no aria-labels; element labels may be poor", display.location);
    }
}
