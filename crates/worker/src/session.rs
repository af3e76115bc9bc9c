//! Lifecycle of the single persistent browser session.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::browser::{DriverFactory, LaunchSpec, PageDriver};
use crate::error::{Result, WorkerError};

/// Fixed window size the driven UI is laid out for.
const WINDOW: (u32, u32) = (1400, 960);

/// Startup configuration resolved from process arguments.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub profile_dir: PathBuf,
	pub browser_path: Option<PathBuf>,
}

impl SessionConfig {
	/// Applies defaults for arguments the host did not pass.
	pub fn resolve(profile_dir: Option<PathBuf>, browser_path: Option<PathBuf>) -> Self {
		Self {
			profile_dir: profile_dir.unwrap_or_else(default_profile_dir),
			browser_path,
		}
	}
}

fn default_profile_dir() -> PathBuf {
	dirs::home_dir()
		.unwrap_or_else(|| PathBuf::from("."))
		.join(".nlm-bridge")
		.join("profile")
}

/// Owns the at-most-one live page and the rules for (re)creating it.
pub struct SessionController {
	factory: Box<dyn DriverFactory>,
	config: SessionConfig,
	page: Option<Box<dyn PageDriver>>,
}

impl SessionController {
	pub fn new(factory: Box<dyn DriverFactory>, config: SessionConfig) -> Self {
		Self {
			factory,
			config,
			page: None,
		}
	}

	/// Launches the persistent context if none is live. Safe to call on
	/// every command; an existing session is reused untouched. A failed
	/// launch leaves the session absent so the next call retries from
	/// scratch.
	pub async fn ensure_ready(&mut self) -> Result<()> {
		if self.page.is_some() {
			return Ok(());
		}
		fs::create_dir_all(&self.config.profile_dir)?;
		let spec = LaunchSpec {
			profile_dir: self.config.profile_dir.clone(),
			executable: self.config.browser_path.clone().or_else(find_browser),
			window: WINDOW,
		};
		debug!(
			target = "nlm.session",
			profile = %spec.profile_dir.display(),
			executable = ?spec.executable,
			"launching persistent context"
		);
		let page = self.factory.launch(&spec).await?;
		self.page = Some(page);
		Ok(())
	}

	/// The live page; commands that skipped `connect` get a clean error.
	pub fn page(&self) -> Result<&dyn PageDriver> {
		self.page.as_deref().ok_or(WorkerError::NotReady)
	}

	pub fn is_ready(&self) -> bool {
		self.page.is_some()
	}

	/// Closes the context when present. Close errors are logged and
	/// swallowed; state is cleared either way so a later `ensure_ready`
	/// starts fresh.
	pub async fn close(&mut self) {
		if let Some(page) = self.page.take() {
			if let Err(err) = page.close().await {
				warn!(target = "nlm.session", error = %err, "context close failed");
			}
		}
	}
}

/// Known-install-location fallback used when no executable was configured.
/// Returning `None` leaves the choice to the driver's own default lookup.
fn find_browser() -> Option<PathBuf> {
	for candidate in install_candidates() {
		if candidate.exists() {
			return Some(candidate);
		}
	}
	for name in [
		"google-chrome",
		"google-chrome-stable",
		"chromium",
		"chromium-browser",
		"msedge",
	] {
		if let Ok(path) = which::which(name) {
			return Some(path);
		}
	}
	None
}

#[cfg(target_os = "windows")]
fn install_candidates() -> Vec<PathBuf> {
	vec![
		PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
		PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
		PathBuf::from(r"C:\Program Files\Microsoft\Edge\Application\msedge.exe"),
		PathBuf::from(r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe"),
	]
}

#[cfg(target_os = "macos")]
fn install_candidates() -> Vec<PathBuf> {
	vec![PathBuf::from(
		"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
	)]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn install_candidates() -> Vec<PathBuf> {
	Vec::new()
}
