//! Ordered-fallback element resolution.
//!
//! The driven UI ships markup changes without notice, so each action carries
//! a ranked list of plausible locators instead of one brittle selector.
//! Candidates are probed strictly in rank order with short per-candidate
//! budgets; the first visible one wins and nothing after it is attempted.

use std::time::Duration;

use tracing::debug;

use crate::browser::{Locator, PageDriver};

/// One ranked way to find an element, with its own visibility budget.
#[derive(Debug, Clone)]
pub struct Candidate {
	pub locator: Locator,
	pub wait: Duration,
}

impl Candidate {
	pub fn new(locator: Locator, wait: Duration) -> Self {
		Self { locator, wait }
	}
}

/// Returns the first candidate that becomes visible within its own budget.
/// Probe errors count as misses; `None` once the list is exhausted.
pub async fn resolve<'c>(page: &dyn PageDriver, candidates: &'c [Candidate]) -> Option<&'c Candidate> {
	for candidate in candidates {
		match page.wait_visible(&candidate.locator, candidate.wait).await {
			Ok(()) => return Some(candidate),
			Err(err) => {
				debug!(target = "nlm.resolve", locator = %candidate.locator, error = %err, "candidate miss");
			}
		}
	}
	None
}

/// Like [`resolve`], but clicks the winning candidate. A click failure is
/// treated like a miss and probing continues with the next candidate.
pub async fn resolve_and_click(page: &dyn PageDriver, candidates: &[Candidate], click_timeout: Duration) -> bool {
	for candidate in candidates {
		if page.wait_visible(&candidate.locator, candidate.wait).await.is_err() {
			continue;
		}
		match page.click(&candidate.locator, click_timeout).await {
			Ok(()) => return true,
			Err(err) => {
				debug!(target = "nlm.resolve", locator = %candidate.locator, error = %err, "click miss");
			}
		}
	}
	false
}
