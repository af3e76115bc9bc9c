//! Wire types for the worker's line-delimited JSON protocol.
//!
//! Inbound lines are [`Envelope`]s; outbound lines are either a correlated
//! [`Response`] or an uncorrelated [`Progress`] event. Every accepted
//! envelope is answered by exactly one terminal response; progress events
//! are advisory and carry no acknowledgment.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Command names the worker routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	Connect,
	CreateNotebook,
	ImportUrls,
	Ask,
	Close,
}

impl Command {
	/// Resolves a wire-level command name; `None` for anything unrecognized.
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"connect" => Some(Self::Connect),
			"create_notebook" => Some(Self::CreateNotebook),
			"import_urls" => Some(Self::ImportUrls),
			"ask" => Some(Self::Ask),
			"close" => Some(Self::Close),
			_ => None,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Connect => "connect",
			Self::CreateNotebook => "create_notebook",
			Self::ImportUrls => "import_urls",
			Self::Ask => "ask",
			Self::Close => "close",
		}
	}
}

/// One inbound request line.
///
/// `id` and `cmd` are both required for the envelope to be routable; the
/// dispatcher drops envelopes where either is missing or empty without
/// emitting anything.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub cmd: Option<String>,
	/// Command-specific fields, kept verbatim until a handler decodes them.
	#[serde(flatten)]
	pub params: Map<String, Value>,
}

impl Envelope {
	/// Parses one protocol line; `None` for anything that is not a JSON object.
	pub fn parse(line: &str) -> Option<Self> {
		serde_json::from_str(line).ok()
	}

	/// Returns `(id, cmd)` when both are present and non-empty.
	pub fn correlated(&self) -> Option<(&str, &str)> {
		let id = self.id.as_deref().filter(|s| !s.is_empty())?;
		let cmd = self.cmd.as_deref().filter(|s| !s.is_empty())?;
		Some((id, cmd))
	}

	/// Decodes the command-specific fields into a typed parameter struct.
	pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
		serde_json::from_value(Value::Object(self.params.clone()))
	}
}

/// Terminal response correlated to one envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: String,
	pub ok: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl Response {
	pub fn ok(id: impl Into<String>, data: Value) -> Self {
		Self {
			id: id.into(),
			ok: true,
			data: Some(data),
			error: None,
		}
	}

	pub fn fail(id: impl Into<String>, error: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			ok: false,
			data: None,
			error: Some(error.into()),
		}
	}
}

/// Out-of-band status line emitted while a command is still executing.
///
/// Distinguished from [`Response`] on the wire by the `event` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
	pub event: String,
	pub phase: String,
	pub message: String,
	/// Optional structured counters (`current`/`total`/`url` for batches).
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Progress {
	pub fn new(phase: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			event: "progress".to_string(),
			phase: phase.into(),
			message: message.into(),
			extra: Map::new(),
		}
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.extra.insert(key.into(), value.into());
		self
	}
}

/// Parameters accepted by `create_notebook`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNotebookParams {
	#[serde(default)]
	pub title: Option<String>,
}

/// Parameters accepted by `import_urls`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportUrlsParams {
	#[serde(default)]
	pub urls: Vec<String>,
}

/// Parameters accepted by `ask`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskParams {
	#[serde(default)]
	pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectStatus {
	/// The ready affordance was observed within the wait budget.
	Connected,
	/// The wait budget elapsed; the session is open but sign-in state is unknown.
	ConnectedOrTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectData {
	pub status: ConnectStatus,
	pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotebookData {
	pub created: bool,
	pub title: String,
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
	pub url: String,
	pub reason: String,
}

/// Aggregate result of a URL import batch.
///
/// Every input URL is accounted for: `imported + failed.len()` always equals
/// the batch size.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
	pub imported: usize,
	pub failed: Vec<ImportFailure>,
}

impl ImportOutcome {
	pub fn record_imported(&mut self) {
		self.imported += 1;
	}

	pub fn record_failure(&mut self, url: impl Into<String>, reason: impl Into<String>) {
		self.failed.push(ImportFailure {
			url: url.into(),
			reason: reason.into(),
		});
	}

	/// Number of input URLs this outcome accounts for.
	pub fn accounted(&self) -> usize {
		self.imported + self.failed.len()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskData {
	pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseData {
	pub closed: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn command_names_round_trip() {
		for cmd in [
			Command::Connect,
			Command::CreateNotebook,
			Command::ImportUrls,
			Command::Ask,
			Command::Close,
		] {
			assert_eq!(Command::parse(cmd.name()), Some(cmd));
		}
		assert_eq!(Command::parse("frobnicate"), None);
	}

	#[test]
	fn envelope_parses_flattened_params() {
		let envelope = Envelope::parse(r#"{"id":"1","cmd":"ask","prompt":"hello"}"#).unwrap();
		assert_eq!(envelope.correlated(), Some(("1", "ask")));
		let params: AskParams = envelope.decode().unwrap();
		assert_eq!(params.prompt, "hello");
	}

	#[test]
	fn envelope_without_id_or_cmd_is_not_correlated() {
		let no_id = Envelope::parse(r#"{"cmd":"close"}"#).unwrap();
		assert_eq!(no_id.correlated(), None);

		let no_cmd = Envelope::parse(r#"{"id":"7"}"#).unwrap();
		assert_eq!(no_cmd.correlated(), None);

		let empty_id = Envelope::parse(r#"{"id":"","cmd":"close"}"#).unwrap();
		assert_eq!(empty_id.correlated(), None);
	}

	#[test]
	fn non_object_lines_do_not_parse() {
		assert!(Envelope::parse("not json").is_none());
		assert!(Envelope::parse("[1,2]").is_none());
		assert!(Envelope::parse("42").is_none());
	}

	#[test]
	fn response_wire_shapes() {
		let ok = Response::ok("1", serde_json::json!({"closed": true}));
		assert_eq!(
			serde_json::to_string(&ok).unwrap(),
			r#"{"id":"1","ok":true,"data":{"closed":true}}"#
		);

		let fail = Response::fail("9", "unknown cmd: frobnicate");
		assert_eq!(
			serde_json::to_string(&fail).unwrap(),
			r#"{"id":"9","ok":false,"error":"unknown cmd: frobnicate"}"#
		);
	}

	#[test]
	fn progress_carries_event_tag_and_counters() {
		let progress = Progress::new("import", "importing url")
			.with("current", 2u64)
			.with("total", 5u64);
		let value = serde_json::to_value(&progress).unwrap();
		assert_eq!(value["event"], "progress");
		assert_eq!(value["phase"], "import");
		assert_eq!(value["current"], 2);
		assert_eq!(value["total"], 5);
	}

	#[test]
	fn connect_status_uses_snake_case_literals() {
		assert_eq!(
			serde_json::to_value(ConnectStatus::ConnectedOrTimeout).unwrap(),
			serde_json::json!("connected_or_timeout")
		);
	}

	#[test]
	fn import_outcome_accounts_for_every_url() {
		let mut outcome = ImportOutcome::default();
		outcome.record_imported();
		outcome.record_failure("", "empty url");
		outcome.record_failure("https://b.test", "cannot find source input field");
		assert_eq!(outcome.accounted(), 3);
		assert_eq!(
			serde_json::to_value(&outcome).unwrap(),
			serde_json::json!({
				"imported": 1,
				"failed": [
					{"url": "", "reason": "empty url"},
					{"url": "https://b.test", "reason": "cannot find source input field"},
				],
			})
		);
	}

	#[test]
	fn missing_params_decode_to_defaults() {
		let envelope = Envelope::parse(r#"{"id":"1","cmd":"import_urls"}"#).unwrap();
		let params: ImportUrlsParams = envelope.decode().unwrap();
		assert!(params.urls.is_empty());

		let envelope = Envelope::parse(r#"{"id":"2","cmd":"ask"}"#).unwrap();
		let params: AskParams = envelope.decode().unwrap();
		assert!(params.prompt.is_empty());
	}
}
