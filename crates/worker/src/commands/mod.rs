//! One handler per protocol command.
//!
//! Handlers compose the session controller, element resolver, and completion
//! detector into UI workflows. Steps are either required (their failure
//! fails the command) or explicitly best-effort (failure is logged and
//! execution continues); nothing is swallowed silently at this level.

mod ask;
mod connect;
mod import;
mod notebook;

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use nlm_protocol::{CloseData, Command, Envelope};

use crate::browser::{Locator, PageDriver};
use crate::dispatch::EventSink;
use crate::error::Result;
use crate::resolve::{self, Candidate};
use crate::session::SessionController;

/// Home address of the driven application.
pub(crate) const HOME_URL: &str = "https://notebooklm.google.com/";

const TAB_WAIT: Duration = Duration::from_millis(1000);
const TAB_CLICK_TIMEOUT: Duration = Duration::from_secs(4);

/// Runs one command to completion and returns its response payload.
pub async fn run(
	command: Command,
	envelope: &Envelope,
	session: &mut SessionController,
	sink: &mut dyn EventSink,
) -> Result<Value> {
	match command {
		Command::Connect => connect::run(session, sink).await,
		Command::CreateNotebook => notebook::run(envelope, session, sink).await,
		Command::ImportUrls => import::run(envelope, session, sink).await,
		Command::Ask => ask::run(envelope, session, sink).await,
		Command::Close => close(session).await,
	}
}

/// Best-effort close; state is reset even when teardown misbehaves.
async fn close(session: &mut SessionController) -> Result<Value> {
	session.close().await;
	Ok(serde_json::to_value(CloseData { closed: true })?)
}

/// Best-effort switch to a named tab. The tab bar is one of the less stable
/// parts of the driven UI, so a miss only means we stay on the current view.
pub(crate) async fn switch_tab(page: &dyn PageDriver, name: &str) -> bool {
	let candidates = [
		Candidate::new(Locator::role("tab", name), TAB_WAIT),
		Candidate::new(Locator::role("button", name), TAB_WAIT),
		Candidate::new(Locator::text(name), TAB_WAIT),
	];
	let switched = resolve::resolve_and_click(page, &candidates, TAB_CLICK_TIMEOUT).await;
	if !switched {
		debug!(target = "nlm.commands", tab = name, "tab not found; staying on current view");
	}
	switched
}
