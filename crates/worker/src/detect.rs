//! Stable-growth completion detection for streamed page output.
//!
//! The driven UI renders answers incrementally with no completion signal,
//! so the detector watches overall page text: once it has grown past a
//! threshold beyond the pre-action baseline, one settle delay is granted
//! for trailing tokens and capture stops. Bounded latency wins over
//! completeness; a slow answer may be captured mid-stream.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::browser::{DriverResult, PageDriver};

/// Tunable stable-growth policy.
#[derive(Debug, Clone)]
pub struct StableGrowth {
	/// Interval between text snapshots.
	pub poll_interval: Duration,
	/// Extra wait after growth is first observed.
	pub settle_delay: Duration,
	/// Characters beyond the baseline that count as growth.
	pub growth_threshold: usize,
	/// Hard cap on the captured answer, in characters.
	pub max_answer_chars: usize,
}

impl Default for StableGrowth {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_millis(1000),
			settle_delay: Duration::from_millis(1500),
			growth_threshold: 20,
			max_answer_chars: 16_000,
		}
	}
}

impl StableGrowth {
	/// Polls the page text until growth beyond `baseline` exceeds the
	/// threshold (then settles once) or `max_wait` elapses. Returns the
	/// text beyond the baseline, trimmed and hard-truncated to the cap;
	/// empty when nothing grew.
	pub async fn await_stable_growth(
		&self,
		page: &dyn PageDriver,
		baseline: &str,
		max_wait: Duration,
	) -> DriverResult<String> {
		let deadline = Instant::now() + max_wait;
		let mut latest = baseline.to_string();

		while Instant::now() < deadline {
			let snapshot = page.inner_text("body").await?;
			if snapshot.len() > latest.len() {
				latest = snapshot;
			}
			if latest.len() > baseline.len() + self.growth_threshold {
				tokio::time::sleep(self.settle_delay).await;
				// One more snapshot so the settle window actually captures
				// the trailing tokens it waited for.
				if let Ok(settled) = page.inner_text("body").await {
					if settled.len() > latest.len() {
						latest = settled;
					}
				}
				break;
			}
			tokio::time::sleep(self.poll_interval).await;
		}

		let answer = self.diff(baseline, &latest);
		debug!(target = "nlm.detect", captured = answer.len(), "growth window closed");
		Ok(answer)
	}

	/// Text-prefix diff against the baseline.
	fn diff(&self, baseline: &str, latest: &str) -> String {
		let grown = latest.strip_prefix(baseline).unwrap_or(latest);
		truncate_chars(grown.trim(), self.max_answer_chars)
	}
}

/// Truncation by character count, never splitting a code point.
fn truncate_chars(text: &str, limit: usize) -> String {
	match text.char_indices().nth(limit) {
		Some((index, _)) => text[..index].to_string(),
		None => text.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::Mutex;

	use async_trait::async_trait;

	use super::*;
	use crate::browser::{DriverResult, Locator};

	/// Page whose body text advances through scripted snapshots; the last
	/// snapshot repeats forever.
	struct GrowingPage {
		snapshots: Mutex<VecDeque<String>>,
		last: Mutex<String>,
	}

	impl GrowingPage {
		fn new(snapshots: &[&str]) -> Self {
			Self {
				snapshots: Mutex::new(snapshots.iter().map(|s| s.to_string()).collect()),
				last: Mutex::new(String::new()),
			}
		}
	}

	#[async_trait]
	impl PageDriver for GrowingPage {
		async fn goto(&self, _url: &str) -> DriverResult<()> {
			Ok(())
		}
		async fn go_back(&self) -> DriverResult<()> {
			Ok(())
		}
		async fn url(&self) -> DriverResult<String> {
			Ok(String::new())
		}
		async fn inner_text(&self, _selector: &str) -> DriverResult<String> {
			if let Some(next) = self.snapshots.lock().unwrap().pop_front() {
				*self.last.lock().unwrap() = next;
			}
			Ok(self.last.lock().unwrap().clone())
		}
		async fn wait_visible(&self, _locator: &Locator, _timeout: Duration) -> DriverResult<()> {
			Ok(())
		}
		async fn click(&self, _locator: &Locator, _timeout: Duration) -> DriverResult<()> {
			Ok(())
		}
		async fn fill(&self, _locator: &Locator, _text: &str) -> DriverResult<()> {
			Ok(())
		}
		async fn editable_region(&self, _locator: &Locator) -> DriverResult<bool> {
			Ok(false)
		}
		async fn press(&self, _key: &str) -> DriverResult<()> {
			Ok(())
		}
		async fn type_text(&self, _text: &str, _delay: Duration) -> DriverResult<()> {
			Ok(())
		}
		async fn close(&self) -> DriverResult<()> {
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn captures_suffix_after_growth_settles() {
		let baseline = "HOME chat";
		let page = GrowingPage::new(&[
			"HOME chat",
			"HOME chat The answer is 42 because the question",
			"HOME chat The answer is 42 because the question says so.",
		]);

		let detector = StableGrowth::default();
		let answer = detector
			.await_stable_growth(&page, baseline, Duration::from_secs(90))
			.await
			.unwrap();
		assert_eq!(answer, "The answer is 42 because the question says so.");
	}

	#[tokio::test(start_paused = true)]
	async fn no_growth_yields_empty_answer() {
		let baseline = "HOME chat";
		let page = GrowingPage::new(&["HOME chat"]);

		let detector = StableGrowth {
			poll_interval: Duration::from_millis(100),
			..StableGrowth::default()
		};
		let answer = detector
			.await_stable_growth(&page, baseline, Duration::from_secs(2))
			.await
			.unwrap();
		assert_eq!(answer, "");
	}

	#[tokio::test(start_paused = true)]
	async fn growth_below_threshold_is_not_completion() {
		let baseline = "HOME";
		let page = GrowingPage::new(&["HOME ok"]);

		let detector = StableGrowth::default();
		let answer = detector
			.await_stable_growth(&page, baseline, Duration::from_secs(5))
			.await
			.unwrap();
		// Window closes on timeout; whatever little grew is still returned.
		assert_eq!(answer, "ok");
	}

	#[tokio::test(start_paused = true)]
	async fn threshold_is_tunable() {
		let baseline = "HOME";
		let page = GrowingPage::new(&["HOME ok"]);

		let detector = StableGrowth {
			growth_threshold: 1,
			..StableGrowth::default()
		};
		let answer = detector
			.await_stable_growth(&page, baseline, Duration::from_secs(90))
			.await
			.unwrap();
		assert_eq!(answer, "ok");
	}

	#[tokio::test(start_paused = true)]
	async fn unrelated_text_is_returned_whole_when_baseline_is_not_a_prefix() {
		let baseline = "OLD VIEW";
		let page = GrowingPage::new(&["A completely different page body text"]);

		let detector = StableGrowth::default();
		let answer = detector
			.await_stable_growth(&page, baseline, Duration::from_secs(90))
			.await
			.unwrap();
		assert_eq!(answer, "A completely different page body text");
	}

	#[test]
	fn truncation_respects_character_boundaries() {
		let text = "héllo wörld";
		let truncated = truncate_chars(text, 7);
		assert_eq!(truncated, "héllo w");

		assert_eq!(truncate_chars("short", 100), "short");
	}

	#[tokio::test(start_paused = true)]
	async fn long_answers_are_hard_truncated() {
		let baseline = "X";
		let body = format!("X{}", "a".repeat(500));
		let page = GrowingPage::new(&[body.as_str()]);

		let detector = StableGrowth {
			max_answer_chars: 100,
			..StableGrowth::default()
		};
		let answer = detector
			.await_stable_growth(&page, baseline, Duration::from_secs(90))
			.await
			.unwrap();
		assert_eq!(answer.chars().count(), 100);
	}
}
