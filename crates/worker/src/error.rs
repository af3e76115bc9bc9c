use thiserror::Error;

use crate::browser::DriverError;

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Command-level failures. The `Display` text of each variant is what the
/// host sees in the `error` field of a failure response, so wording here is
/// part of the wire contract.
#[derive(Debug, Error)]
pub enum WorkerError {
	/// Prompt was blank after trimming.
	#[error("empty prompt")]
	EmptyPrompt,

	/// No candidate strategy produced a visible element for a required
	/// affordance.
	#[error("cannot find {0}")]
	ElementNotFound(&'static str),

	/// Command name did not match any handler.
	#[error("unknown cmd: {0}")]
	UnknownCommand(String),

	/// A command that needs a live page arrived before the session existed.
	#[error("browser session not started")]
	NotReady,

	#[error(transparent)]
	Driver(#[from] DriverError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
