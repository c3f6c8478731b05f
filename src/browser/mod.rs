//! Browser session management
//!
//! [`BrowserSession`] owns the page the agent acts on. All page access goes through the
//! [`BrowserDriver`] trait; [`ChromeDriver`] implements it over the Chrome DevTools Protocol.

pub mod chrome;
pub mod config;
pub mod driver;
pub mod scripts;
pub mod session;
pub mod url;
pub mod virtual_id;

pub use chrome::ChromeDriver;
pub use config::{ConnectionOptions, LaunchOptions, SessionOptions};
pub use driver::{BrowserDriver, ElementType};
pub use session::{BrowserDisplay, BrowserSession, RenderLanguage};
pub use url::UrlResolver;
pub use virtual_id::{VIRTUAL_ID_ATTR, VirtualId, VirtualIdGenerator};
