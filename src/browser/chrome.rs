use crate::{browser::{config::{ConnectionOptions, LaunchOptions},
                      driver::BrowserDriver},
            error::{BrowserError, Result}};
use async_trait::async_trait;
use headless_chrome::{Browser, Tab};
use serde_json::Value;
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// [`BrowserDriver`] backed by a Chrome/Chromium instance over the DevTools Protocol
pub struct ChromeDriver {
    /// Keeps the browser process alive for as long as the driver exists
    _browser: Browser,

    /// The single tab the agent controls
    tab: Arc<Tab>,
}

impl ChromeDriver {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        if options.disable_automation_banner {
            // Ignore default arguments to prevent detection by anti-bot services
            launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
            launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));
        }

        // Set the browser's idle timeout to 1 hour (default is 30 seconds) so long model calls don't close it
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        let tab = browser.new_tab().map_err(|e| BrowserError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { _browser: browser, tab })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url, Duration::from_millis(options.timeout))
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
        let tab =
            browser.new_tab().map_err(|e| BrowserError::ConnectionFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { _browser: browser, tab })
    }

    /// Run a blocking tab operation off the async runtime
    async fn with_tab<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| BrowserError::DriverFailed(format!("Driver task failed: {}", e)))?
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url)
                .map_err(|e| BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let script = script.to_string();
        self.with_tab(move |tab| {
            let result = tab.evaluate(&script, false).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e)))?;
            element.click().map_err(|e| BrowserError::DriverFailed(format!("Failed to click {}: {}", selector, e)))?;
            Ok(())
        })
        .await
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e)))?;
            element
                .focus()
                .and_then(|element| element.type_into(&text))
                .map_err(|e| BrowserError::DriverFailed(format!("Failed to type into {}: {}", selector, e)))?;
            Ok(())
        })
        .await
    }

    async fn outer_html(&self) -> Result<String> {
        self.with_tab(|tab| tab.get_content().map_err(|e| BrowserError::DriverFailed(e.to_string()))).await
    }

    async fn location(&self) -> Result<String> {
        self.with_tab(|tab| Ok(tab.get_url())).await
    }

    async fn close(&self) -> Result<()> {
        self.with_tab(|tab| {
            // The browser process itself exits when the driver is dropped
            tab.close(false).map_err(|e| BrowserError::DriverFailed(format!("Failed to close tab: {}", e)))?;
            Ok(())
        })
        .await
    }
}
