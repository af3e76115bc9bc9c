//! CDP-backed driver over a persistent Chromium profile.
//!
//! Locator queries run as evaluated JavaScript against the live document;
//! keyboard input goes through raw CDP key events so rich-text editors see
//! real keystrokes.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{DriverError, DriverFactory, DriverResult, LaunchSpec, Locator, PageDriver};

const VISIBILITY_POLL: Duration = Duration::from_millis(100);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches headful Chromium bound to the on-disk profile.
pub struct CdpFactory;

#[async_trait]
impl DriverFactory for CdpFactory {
	async fn launch(&self, spec: &LaunchSpec) -> DriverResult<Box<dyn PageDriver>> {
		let mut builder = BrowserConfig::builder()
			.with_head()
			.user_data_dir(&spec.profile_dir)
			.window_size(spec.window.0, spec.window.1)
			.viewport(None)
			.arg("--disable-blink-features=AutomationControlled")
			.arg("--no-first-run")
			.arg("--no-default-browser-check");
		if let Some(executable) = &spec.executable {
			builder = builder.chrome_executable(executable);
		}
		let config = builder.build().map_err(DriverError::Launch)?;

		let (browser, mut handler) = Browser::launch(config)
			.await
			.map_err(|err| DriverError::Launch(err.to_string()))?;
		let events = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if event.is_err() {
					break;
				}
			}
		});

		let page = match browser.pages().await.map_err(backend)?.into_iter().next() {
			Some(page) => page,
			None => browser.new_page("about:blank").await.map_err(backend)?,
		};
		debug!(target = "nlm.driver", profile = %spec.profile_dir.display(), "persistent context up");

		Ok(Box::new(CdpPage {
			browser: Mutex::new(browser),
			page,
			events,
		}))
	}
}

pub struct CdpPage {
	browser: Mutex<Browser>,
	page: Page,
	events: JoinHandle<()>,
}

#[async_trait]
impl PageDriver for CdpPage {
	async fn goto(&self, url: &str) -> DriverResult<()> {
		match tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.goto(url)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(backend(err)),
			Err(_) => Err(DriverError::Timeout {
				ms: NAVIGATION_TIMEOUT.as_millis() as u64,
				what: format!("navigation to {url}"),
			}),
		}
	}

	async fn go_back(&self) -> DriverResult<()> {
		self.page.evaluate("history.back()").await.map_err(backend)?;
		Ok(())
	}

	async fn url(&self) -> DriverResult<String> {
		Ok(self.page.url().await.map_err(backend)?.unwrap_or_default())
	}

	async fn inner_text(&self, selector: &str) -> DriverResult<String> {
		let js = format!(
			"(() => {{ const el = document.querySelector({}); return el ? el.innerText : ''; }})()",
			js_string(selector)
		);
		self.eval_string(js).await
	}

	async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
		let deadline = Instant::now() + timeout;
		loop {
			if self.eval_bool(probe_js(locator)).await? {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(DriverError::Timeout {
					ms: timeout.as_millis() as u64,
					what: locator.to_string(),
				});
			}
			tokio::time::sleep(VISIBILITY_POLL).await;
		}
	}

	async fn click(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
		let deadline = Instant::now() + timeout;
		loop {
			if self.eval_bool(click_js(locator)).await? {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(DriverError::Timeout {
					ms: timeout.as_millis() as u64,
					what: format!("click on {locator}"),
				});
			}
			tokio::time::sleep(VISIBILITY_POLL).await;
		}
	}

	async fn fill(&self, locator: &Locator, text: &str) -> DriverResult<()> {
		if self.eval_bool(fill_js(locator, text)).await? {
			Ok(())
		} else {
			Err(DriverError::NoMatch(locator.to_string()))
		}
	}

	async fn editable_region(&self, locator: &Locator) -> DriverResult<bool> {
		self.eval_bool(editable_js(locator)).await
	}

	async fn press(&self, key: &str) -> DriverResult<()> {
		self.page
			.execute(key_event(DispatchKeyEventType::KeyDown, key)?)
			.await
			.map_err(backend)?;
		self.page
			.execute(key_event(DispatchKeyEventType::KeyUp, key)?)
			.await
			.map_err(backend)?;
		Ok(())
	}

	async fn type_text(&self, text: &str, per_char_delay: Duration) -> DriverResult<()> {
		for ch in text.chars() {
			let event = DispatchKeyEventParams::builder()
				.r#type(DispatchKeyEventType::Char)
				.text(ch.to_string())
				.build()
				.map_err(DriverError::Backend)?;
			self.page.execute(event).await.map_err(backend)?;
			tokio::time::sleep(per_char_delay).await;
		}
		Ok(())
	}

	async fn close(&self) -> DriverResult<()> {
		let mut browser = self.browser.lock().await;
		let closed = browser.close().await;
		self.events.abort();
		if let Err(err) = &closed {
			warn!(target = "nlm.driver", error = %err, "browser close reported an error");
		}
		closed.map(|_| ()).map_err(backend)
	}
}

impl CdpPage {
	async fn eval_bool(&self, js: String) -> DriverResult<bool> {
		let result = self.page.evaluate(js).await.map_err(backend)?;
		result
			.into_value::<bool>()
			.map_err(|err| DriverError::Backend(err.to_string()))
	}

	async fn eval_string(&self, js: String) -> DriverResult<String> {
		let result = self.page.evaluate(js).await.map_err(backend)?;
		result
			.into_value::<String>()
			.map_err(|err| DriverError::Backend(err.to_string()))
	}
}

impl Drop for CdpPage {
	fn drop(&mut self) {
		self.events.abort();
	}
}

fn backend(err: CdpError) -> DriverError {
	DriverError::Backend(err.to_string())
}

fn key_event(kind: DispatchKeyEventType, key: &str) -> DriverResult<DispatchKeyEventParams> {
	let is_down = matches!(kind, DispatchKeyEventType::KeyDown);
	let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
	// Without the carriage-return text payload, inputs receive the key event
	// but never commit it.
	if is_down && key == "Enter" {
		builder = builder.text("\r");
	}
	builder.build().map_err(DriverError::Backend)
}

/// Embeds arbitrary text as a JS string literal.
fn js_string(value: &str) -> String {
	serde_json::Value::String(value.to_string()).to_string()
}

const VISIBLE_FN: &str = "const visible = (el) => { if (!el) return false; \
	const r = el.getBoundingClientRect(); \
	return r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden'; };";

/// Expression yielding the first visible element the locator matches, or null.
fn find_snippet(locator: &Locator) -> String {
	match locator {
		Locator::Css(selector) => format!(
			"([...document.querySelectorAll({})].find(visible) || null)",
			js_string(selector)
		),
		Locator::Text(needle) => format!(
			"([...document.querySelectorAll('button, a, [role=\"button\"], [role=\"tab\"], span, div, p, label')]\
			.find((el) => visible(el) && (el.innerText || '').toLowerCase().includes({})) || null)",
			js_string(&needle.to_lowercase())
		),
		Locator::Role { role, name } => {
			let query = match role.as_str() {
				"button" => "button, [role=\"button\"]".to_string(),
				"tab" => "[role=\"tab\"]".to_string(),
				"textbox" => "textarea, input, [role=\"textbox\"]".to_string(),
				other => format!("[role=\"{other}\"]"),
			};
			format!(
				"([...document.querySelectorAll({})]\
				.find((el) => visible(el) && (((el.innerText || '') + ' ' + (el.getAttribute('aria-label') || '')).toLowerCase().includes({}))) || null)",
				js_string(&query),
				js_string(&name.to_lowercase())
			)
		}
	}
}

fn probe_js(locator: &Locator) -> String {
	format!(
		"(() => {{ {VISIBLE_FN} return {} !== null; }})()",
		find_snippet(locator)
	)
}

fn click_js(locator: &Locator) -> String {
	format!(
		"(() => {{ {VISIBLE_FN} const el = {}; if (!el) return false; el.click(); return true; }})()",
		find_snippet(locator)
	)
}

fn fill_js(locator: &Locator, text: &str) -> String {
	format!(
		"(() => {{ {VISIBLE_FN} const el = {}; if (!el) return false; el.focus(); \
		if (el.isContentEditable) {{ el.textContent = {text}; }} else {{ el.value = {text}; }} \
		el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
		el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
		find_snippet(locator),
		text = js_string(text)
	)
}

fn editable_js(locator: &Locator) -> String {
	format!(
		"(() => {{ {VISIBLE_FN} const el = {}; return !!(el && el.isContentEditable); }})()",
		find_snippet(locator)
	)
}
