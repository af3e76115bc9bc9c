//! `import_urls`: batch URL import with per-item failure collection.
//!
//! The batch never aborts: each URL either counts as imported or lands in
//! the failure list with a reason, so the caller can always reconcile the
//! result against its input.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use nlm_protocol::{Envelope, ImportOutcome, ImportUrlsParams, Progress};

use crate::browser::{Locator, PageDriver};
use crate::dispatch::EventSink;
use crate::error::{Result, WorkerError};
use crate::resolve::{self, Candidate};
use crate::session::SessionController;

const SOURCES_TAB: &str = "sources";
const INPUT_WAIT: Duration = Duration::from_millis(800);
const REOPENED_INPUT_WAIT: Duration = Duration::from_millis(1500);
const OPENER_WAIT: Duration = Duration::from_millis(1000);
const OPENER_CLICK_TIMEOUT: Duration = Duration::from_secs(4);
/// Dialog animation time after clicking an opener.
const OPEN_SETTLE: Duration = Duration::from_millis(400);
/// Per-URL settle so the UI registers the submission before the next fill.
const IMPORT_SETTLE: Duration = Duration::from_millis(900);

pub(super) async fn run(
	envelope: &Envelope,
	session: &mut SessionController,
	sink: &mut dyn EventSink,
) -> Result<Value> {
	let params: ImportUrlsParams = envelope.decode()?;
	let urls = params.urls;
	sink.progress(
		Progress::new("import", "starting import")
			.with("current", 0u64)
			.with("total", urls.len() as u64),
	);

	let page = session.page()?;
	super::switch_tab(page, SOURCES_TAB).await;

	let mut outcome = ImportOutcome::default();
	for (index, raw) in urls.iter().enumerate() {
		let url = raw.trim();
		sink.progress(
			Progress::new("import", "importing url")
				.with("current", (index + 1) as u64)
				.with("total", urls.len() as u64)
				.with("url", url),
		);

		if url.is_empty() {
			outcome.record_failure(url, "empty url");
			continue;
		}

		match import_one(page, url).await {
			Ok(()) => outcome.record_imported(),
			Err(err) => {
				debug!(target = "nlm.import", url, error = %err, "url not imported");
				outcome.record_failure(url, err.to_string());
			}
		}
	}

	Ok(serde_json::to_value(outcome)?)
}

async fn import_one(page: &dyn PageDriver, url: &str) -> Result<()> {
	let input = open_source_input(page).await?;
	page.fill(&input, url).await?;
	page.press("Enter").await?;
	tokio::time::sleep(IMPORT_SETTLE).await;
	Ok(())
}

/// Finds the URL input, clicking through an "Add source" affordance first
/// when the input is not already on screen.
async fn open_source_input(page: &dyn PageDriver) -> Result<Locator> {
	if let Some(candidate) = resolve::resolve(page, &input_candidates(INPUT_WAIT)).await {
		return Ok(candidate.locator.clone());
	}

	let openers = [
		Candidate::new(Locator::role("button", "add source"), OPENER_WAIT),
		Candidate::new(Locator::text("add source"), OPENER_WAIT),
		Candidate::new(Locator::role("button", "website"), OPENER_WAIT),
		Candidate::new(Locator::text("website"), OPENER_WAIT),
	];
	if resolve::resolve_and_click(page, &openers, OPENER_CLICK_TIMEOUT).await {
		tokio::time::sleep(OPEN_SETTLE).await;
	}

	match resolve::resolve(page, &input_candidates(REOPENED_INPUT_WAIT)).await {
		Some(candidate) => Ok(candidate.locator.clone()),
		None => Err(WorkerError::ElementNotFound("source input field")),
	}
}

fn input_candidates(wait: Duration) -> Vec<Candidate> {
	vec![
		Candidate::new(Locator::css(r#"input[type="url"]"#), wait),
		Candidate::new(Locator::css(r#"input[placeholder*="paste" i]"#), wait),
		Candidate::new(Locator::css(r#"input[placeholder*="link" i]"#), wait),
		Candidate::new(Locator::css(r#"input[type="text"]"#), wait),
	]
}
