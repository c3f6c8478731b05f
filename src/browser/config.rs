use crate::dom::RenderOptions;
use std::{path::PathBuf, time::Duration};

/// Options for launching a new browser instance
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run browser in headless mode
    pub headless: bool,

    /// Window width in pixels
    pub window_width: u32,

    /// Window height in pixels
    pub window_height: u32,

    /// Path to Chrome/Chromium binary (None = auto-detect)
    pub chrome_path: Option<PathBuf>,

    /// User data directory for browser profile
    pub user_data_dir: Option<PathBuf>,

    /// Enable sandbox mode
    pub sandbox: bool,

    /// Hide the "controlled by automated software" signals from pages
    pub disable_automation_banner: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 800,
            chrome_path: None,
            user_data_dir: None,
            sandbox: true,
            disable_automation_banner: true,
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Builder method: set window size
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Builder method: set Chrome binary path
    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    /// Builder method: set user data directory
    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    /// Builder method: set sandbox mode
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

/// Options for connecting to an existing browser instance
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// WebSocket URL of the DevTools endpoint
    pub ws_url: String,

    /// Connection timeout in milliseconds
    pub timeout: u64,
}

impl ConnectionOptions {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self { ws_url: ws_url.into(), timeout: 30_000 }
    }

    /// Builder method: set connection timeout
    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Behaviour of a [`BrowserSession`](super::BrowserSession)
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Upper bound on waiting for a page to finish loading
    pub page_load_timeout: Duration,

    /// Interval between page readiness polls
    pub poll_interval: Duration,

    /// Follow one redirect hop with a HEAD request before navigating
    pub resolve_redirects: bool,

    /// Retry unreachable hosts with a `www.` prefix
    pub try_www: bool,

    /// Renderer settings used for the display snapshot
    pub render: RenderOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(100),
            resolve_redirects: true,
            try_www: true,
            render: RenderOptions::default(),
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set page load timeout
    pub fn page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Builder method: toggle network probing of navigation targets
    pub fn resolve_redirects(mut self, resolve: bool) -> Self {
        self.resolve_redirects = resolve;
        self
    }

    /// Builder method: toggle the `www.` retry
    pub fn try_www(mut self, try_www: bool) -> Self {
        self.try_www = try_www;
        self
    }

    /// Builder method: set renderer options
    pub fn render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_builder() {
        let opts = LaunchOptions::new().headless(false).window_size(800, 600).sandbox(false);
        assert!(!opts.headless);
        assert_eq!(opts.window_width, 800);
        assert_eq!(opts.window_height, 600);
        assert!(!opts.sandbox);
    }

    #[test]
    fn test_session_options_defaults() {
        let opts = SessionOptions::default();
        assert_eq!(opts.page_load_timeout, Duration::from_secs(10));
        assert!(opts.resolve_redirects);
        assert_eq!(opts.render.max_list_items, Some(5));
    }
}
