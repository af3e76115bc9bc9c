//! `ask`: submit a chat prompt and capture the streamed answer.

use std::time::Duration;

use serde_json::Value;

use nlm_protocol::{AskData, AskParams, Envelope, Progress};

use crate::browser::Locator;
use crate::detect::StableGrowth;
use crate::dispatch::EventSink;
use crate::error::{Result, WorkerError};
use crate::resolve::{self, Candidate};
use crate::session::SessionController;

const CHAT_TAB: &str = "chat";
const INPUT_WAIT: Duration = Duration::from_millis(1500);
const INPUT_CLICK_TIMEOUT: Duration = Duration::from_secs(4);
const TYPE_DELAY: Duration = Duration::from_millis(10);
const ANSWER_WAIT: Duration = Duration::from_secs(90);

pub(super) async fn run(
	envelope: &Envelope,
	session: &mut SessionController,
	sink: &mut dyn EventSink,
) -> Result<Value> {
	let params: AskParams = envelope.decode()?;
	let prompt = params.prompt.trim().to_string();
	if prompt.is_empty() {
		return Err(WorkerError::EmptyPrompt);
	}

	let page = session.page()?;
	super::switch_tab(page, CHAT_TAB).await;

	let candidates = [
		Candidate::new(Locator::css("textarea"), INPUT_WAIT),
		Candidate::new(Locator::css(r#"[contenteditable="true"]"#), INPUT_WAIT),
		Candidate::new(Locator::css(r#"div[role="textbox"]"#), INPUT_WAIT),
	];
	let Some(winner) = resolve::resolve(page, &candidates).await else {
		return Err(WorkerError::ElementNotFound("chat input"));
	};
	let input = winner.locator.clone();

	let baseline = page.inner_text("body").await?;
	page.click(&input, INPUT_CLICK_TIMEOUT).await?;

	// Rich-text editors drop programmatic value writes; type into those.
	if page.editable_region(&input).await? {
		page.type_text(&prompt, TYPE_DELAY).await?;
	} else {
		page.fill(&input, &prompt).await?;
	}
	page.press("Enter").await?;
	sink.progress(Progress::new("ask", "prompt submitted"));

	let answer = StableGrowth::default()
		.await_stable_growth(page, &baseline, ANSWER_WAIT)
		.await?;

	Ok(serde_json::to_value(AskData { answer })?)
}
