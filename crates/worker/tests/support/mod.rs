//! Scripted page driver and harness used by the protocol-level tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::BufReader;

use nlm_worker::browser::{DriverError, DriverFactory, DriverResult, LaunchSpec, Locator, PageDriver};
use nlm_worker::dispatch;
use nlm_worker::session::{SessionConfig, SessionController};

/// Behavior of the fake page, keyed by locator display strings
/// (`css=...`, `text=...`, `role=...[name=...]`).
#[derive(Debug, Clone, Default)]
pub struct Script {
	/// Locators that count as visible (and clickable).
	pub visible: Vec<String>,
	/// Locators whose fill fails.
	pub fill_fails: Vec<String>,
	/// Locators that report a rich-text editable region.
	pub editable: Vec<String>,
	/// Body inner-text snapshots handed out in order; the last one repeats.
	pub body_texts: Vec<String>,
	/// What `page.url()` reports.
	pub url: String,
}

pub struct FakePage {
	script: Script,
	snapshots: Mutex<VecDeque<String>>,
	last_snapshot: Mutex<String>,
	actions: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
	fn record(&self, action: String) {
		self.actions.lock().unwrap().push(action);
	}

	fn hit(&self, list: &[String], locator: &Locator) -> bool {
		list.contains(&locator.to_string())
	}
}

#[async_trait]
impl PageDriver for FakePage {
	async fn goto(&self, url: &str) -> DriverResult<()> {
		self.record(format!("goto {url}"));
		Ok(())
	}

	async fn go_back(&self) -> DriverResult<()> {
		self.record("go_back".to_string());
		Ok(())
	}

	async fn url(&self) -> DriverResult<String> {
		Ok(self.script.url.clone())
	}

	async fn inner_text(&self, _selector: &str) -> DriverResult<String> {
		if let Some(next) = self.snapshots.lock().unwrap().pop_front() {
			*self.last_snapshot.lock().unwrap() = next;
		}
		Ok(self.last_snapshot.lock().unwrap().clone())
	}

	async fn wait_visible(&self, locator: &Locator, _timeout: Duration) -> DriverResult<()> {
		self.record(format!("probe {locator}"));
		if self.hit(&self.script.visible, locator) {
			Ok(())
		} else {
			Err(DriverError::Timeout {
				ms: 0,
				what: locator.to_string(),
			})
		}
	}

	async fn click(&self, locator: &Locator, _timeout: Duration) -> DriverResult<()> {
		self.record(format!("click {locator}"));
		if self.hit(&self.script.visible, locator) {
			Ok(())
		} else {
			Err(DriverError::NoMatch(locator.to_string()))
		}
	}

	async fn fill(&self, locator: &Locator, text: &str) -> DriverResult<()> {
		self.record(format!("fill {locator} {text}"));
		if self.hit(&self.script.fill_fails, locator) {
			Err(DriverError::NoMatch(locator.to_string()))
		} else {
			Ok(())
		}
	}

	async fn editable_region(&self, locator: &Locator) -> DriverResult<bool> {
		Ok(self.hit(&self.script.editable, locator))
	}

	async fn press(&self, key: &str) -> DriverResult<()> {
		self.record(format!("press {key}"));
		Ok(())
	}

	async fn type_text(&self, text: &str, _per_char_delay: Duration) -> DriverResult<()> {
		self.record(format!("type {text}"));
		Ok(())
	}

	async fn close(&self) -> DriverResult<()> {
		self.record("close".to_string());
		Ok(())
	}
}

pub struct FakeFactory {
	script: Script,
	pub launches: Arc<AtomicUsize>,
	pub actions: Arc<Mutex<Vec<String>>>,
}

impl FakeFactory {
	pub fn new(script: Script) -> Self {
		Self {
			script,
			launches: Arc::new(AtomicUsize::new(0)),
			actions: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

#[async_trait]
impl DriverFactory for FakeFactory {
	async fn launch(&self, _spec: &LaunchSpec) -> DriverResult<Box<dyn PageDriver>> {
		self.launches.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(FakePage {
			snapshots: Mutex::new(self.script.body_texts.iter().cloned().collect()),
			last_snapshot: Mutex::new(String::new()),
			script: self.script.clone(),
			actions: self.actions.clone(),
		}))
	}
}

/// Feeds `input` through the dispatch loop against a scripted session and
/// returns every outbound line parsed as JSON.
pub async fn run_worker(factory: FakeFactory, preready: bool, input: &str) -> Vec<Value> {
	let dir = tempfile::tempdir().expect("tempdir");
	let config = SessionConfig {
		profile_dir: dir.path().join("profile"),
		browser_path: None,
	};
	let mut session = SessionController::new(Box::new(factory), config);
	if preready {
		session.ensure_ready().await.expect("ensure_ready");
	}

	let mut out: Vec<u8> = Vec::new();
	dispatch::serve(BufReader::new(input.as_bytes()), &mut out, session)
		.await
		.expect("serve");

	String::from_utf8(out)
		.expect("utf-8 output")
		.lines()
		.map(|line| serde_json::from_str(line).expect("outbound line is JSON"))
		.collect()
}

/// Outbound lines carrying a terminal response (`id` present, no `event`).
pub fn responses(lines: &[Value]) -> Vec<Value> {
	lines
		.iter()
		.filter(|v| v.get("event").is_none())
		.cloned()
		.collect()
}

/// Outbound progress events.
pub fn progress_events(lines: &[Value]) -> Vec<Value> {
	lines
		.iter()
		.filter(|v| v["event"] == "progress")
		.cloned()
		.collect()
}
