//! `create_notebook`: click the create affordance and optionally title it.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use nlm_protocol::{CreateNotebookData, CreateNotebookParams, Envelope, Progress};

use crate::browser::{Locator, PageDriver};
use crate::dispatch::EventSink;
use crate::error::{Result, WorkerError};
use crate::resolve::{self, Candidate};
use crate::session::SessionController;

use super::HOME_URL;

const DEFAULT_TITLE: &str = "Auto Notebook";
const CREATE_WAIT: Duration = Duration::from_millis(1500);
const CREATE_CLICK_TIMEOUT: Duration = Duration::from_secs(5);
/// The editor view needs a moment to replace the home screen.
const POST_CREATE_SETTLE: Duration = Duration::from_millis(1200);
const TITLE_WAIT: Duration = Duration::from_millis(1500);

pub(super) async fn run(
	envelope: &Envelope,
	session: &mut SessionController,
	sink: &mut dyn EventSink,
) -> Result<Value> {
	let params: CreateNotebookParams = envelope.decode()?;
	let title = params
		.title
		.filter(|t| !t.is_empty())
		.unwrap_or_else(|| DEFAULT_TITLE.to_string());

	sink.progress(Progress::new("create", "opening notebook home"));
	session.ensure_ready().await?;
	let page = session.page()?;
	page.goto(HOME_URL).await?;

	if !resolve::resolve_and_click(page, &create_candidates(), CREATE_CLICK_TIMEOUT).await {
		return Err(WorkerError::ElementNotFound("New notebook button"));
	}
	tokio::time::sleep(POST_CREATE_SETTLE).await;

	if !set_title(page, &title).await {
		debug!(target = "nlm.create", "title not set; notebook keeps its generated name");
	}

	let data = CreateNotebookData {
		created: true,
		title,
		url: page.url().await?,
	};
	Ok(serde_json::to_value(data)?)
}

/// Ranked locators for the create-notebook affordance; also used by
/// `connect` as its readiness probe.
pub(super) fn create_candidates() -> Vec<Candidate> {
	vec![
		Candidate::new(Locator::role("button", "new notebook"), CREATE_WAIT),
		Candidate::new(Locator::text("new notebook"), CREATE_WAIT),
		Candidate::new(Locator::css(r#"[aria-label*="new notebook" i]"#), CREATE_WAIT),
	]
}

/// Best-effort: the rename surface moves around between releases, and a
/// notebook with its generated name is still usable.
async fn set_title(page: &dyn PageDriver, title: &str) -> bool {
	let candidates = [
		Candidate::new(Locator::css(r#"input[aria-label*="title" i]"#), TITLE_WAIT),
		Candidate::new(Locator::css(r#"textarea[aria-label*="title" i]"#), TITLE_WAIT),
		Candidate::new(Locator::css(r#"input[type="text"]"#), TITLE_WAIT),
	];
	for candidate in &candidates {
		if page.wait_visible(&candidate.locator, candidate.wait).await.is_err() {
			continue;
		}
		if page.fill(&candidate.locator, title).await.is_err() {
			continue;
		}
		return page.press("Enter").await.is_ok();
	}
	false
}
