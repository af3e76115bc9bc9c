//! `connect`: open the application home and wait for a signed-in state.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use nlm_protocol::{ConnectData, ConnectStatus, Progress};

use crate::browser::{Locator, PageDriver};
use crate::dispatch::EventSink;
use crate::error::Result;
use crate::resolve::{self, Candidate};
use crate::session::SessionController;

use super::HOME_URL;
use super::notebook::create_candidates;

/// Sign-in may need a human in the opened window, so the ready poll is
/// generous.
const READY_WAIT: Duration = Duration::from_secs(180);
const READY_POLL: Duration = Duration::from_secs(1);
const PASSIVE_CHECK_WAIT: Duration = Duration::from_millis(500);
const PROBE_CLICK_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) async fn run(session: &mut SessionController, sink: &mut dyn EventSink) -> Result<Value> {
	sink.progress(Progress::new("connect", "opening notebooklm"));
	session.ensure_ready().await?;
	let page = session.page()?;
	page.goto(HOME_URL).await?;

	sink.progress(Progress::new("connect", "waiting for login or ready state"));
	let ready = wait_for_ready(page, READY_WAIT).await;

	let data = ConnectData {
		status: if ready {
			ConnectStatus::Connected
		} else {
			ConnectStatus::ConnectedOrTimeout
		},
		url: page.url().await?,
	};
	Ok(serde_json::to_value(data)?)
}

/// The app counts as ready once the create-notebook affordance works.
/// Proving that means actually triggering it, so a successful probe click is
/// reverted with a back navigation. A timeout is not an error: the session
/// stays open for the human to finish signing in.
async fn wait_for_ready(page: &dyn PageDriver, budget: Duration) -> bool {
	let deadline = Instant::now() + budget;
	while Instant::now() < deadline {
		if resolve::resolve_and_click(page, &create_candidates(), PROBE_CLICK_TIMEOUT).await {
			if let Err(err) = page.go_back().await {
				debug!(target = "nlm.connect", error = %err, "revert after probe click failed");
			}
			return true;
		}

		let passive = Candidate::new(Locator::text("new notebook"), PASSIVE_CHECK_WAIT);
		if resolve::resolve(page, std::slice::from_ref(&passive)).await.is_some() {
			return true;
		}

		tokio::time::sleep(READY_POLL).await;
	}
	false
}
