//! Page-automation boundary.
//!
//! Everything above this module drives the browser through [`PageDriver`];
//! the CDP adapter in [`cdp`] is the one production implementation and test
//! suites substitute scripted fakes.

pub mod cdp;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
	#[error("browser launch failed: {0}")]
	Launch(String),

	#[error("timeout after {ms}ms waiting for: {what}")]
	Timeout { ms: u64, what: String },

	/// Locator matched nothing actionable on the live page.
	#[error("no element matched {0}")]
	NoMatch(String),

	#[error("{0}")]
	Backend(String),
}

/// One way to locate a UI element on the driven page.
///
/// Handlers list several plausible locators per action and the resolver
/// probes them in rank order, so a markup change breaks one candidate
/// instead of the whole workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
	/// CSS selector, handed to the page's query engine verbatim.
	Css(String),
	/// Case-insensitive substring over the text of clickable elements.
	Text(String),
	/// Element with the given role whose accessible name contains `name`
	/// (case-insensitive).
	Role { role: String, name: String },
}

impl Locator {
	pub fn css(selector: impl Into<String>) -> Self {
		Self::Css(selector.into())
	}

	pub fn text(needle: impl Into<String>) -> Self {
		Self::Text(needle.into())
	}

	pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
		Self::Role {
			role: role.into(),
			name: name.into(),
		}
	}
}

impl fmt::Display for Locator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Css(selector) => write!(f, "css={selector}"),
			Self::Text(needle) => write!(f, "text={needle}"),
			Self::Role { role, name } => write!(f, "role={role}[name={name}]"),
		}
	}
}

/// Everything a driver needs to start the one persistent session.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
	pub profile_dir: PathBuf,
	/// Explicit browser binary; `None` lets the driver pick its default.
	pub executable: Option<PathBuf>,
	/// Window size the driven UI is laid out for.
	pub window: (u32, u32),
}

/// Minimal page-automation surface the engine requires.
#[async_trait]
pub trait PageDriver: Send + Sync {
	async fn goto(&self, url: &str) -> DriverResult<()>;

	async fn go_back(&self) -> DriverResult<()>;

	async fn url(&self) -> DriverResult<String>;

	/// Inner text of the first element matching a CSS selector; empty when
	/// the selector matches nothing.
	async fn inner_text(&self, selector: &str) -> DriverResult<String>;

	/// Resolves once the locator has a visible match, polling up to `timeout`.
	async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> DriverResult<()>;

	async fn click(&self, locator: &Locator, timeout: Duration) -> DriverResult<()>;

	async fn fill(&self, locator: &Locator, text: &str) -> DriverResult<()>;

	/// Whether the locator's match is a rich-text editable region.
	async fn editable_region(&self, locator: &Locator) -> DriverResult<bool>;

	async fn press(&self, key: &str) -> DriverResult<()>;

	/// Types into the focused element one character at a time.
	async fn type_text(&self, text: &str, per_char_delay: Duration) -> DriverResult<()>;

	/// Tears down the underlying context. The session is considered gone
	/// whether or not this reports an error.
	async fn close(&self) -> DriverResult<()>;
}

/// Launches the persistent browser context behind a [`PageDriver`].
#[async_trait]
pub trait DriverFactory: Send + Sync {
	async fn launch(&self, spec: &LaunchSpec) -> DriverResult<Box<dyn PageDriver>>;
}
