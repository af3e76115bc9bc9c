//! Line-delimited command loop.
//!
//! One envelope in, one terminal response out, progress interleaved. The
//! loop processes commands strictly in arrival order and never starts one
//! before the previous handler returned; that serialization is the only
//! guard the shared page needs.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info};

use nlm_protocol::{Command, Envelope, Progress, Response};

use crate::commands;
use crate::error::{Result, WorkerError};
use crate::session::SessionController;

/// Where handlers push out-of-band progress lines.
pub trait EventSink {
	fn progress(&mut self, progress: Progress);
}

/// NDJSON writer over the outbound byte stream, flushed per line so the
/// host sees progress while a command is still running.
pub struct LineSink<W: Write> {
	out: W,
}

impl<W: Write> LineSink<W> {
	pub fn new(out: W) -> Self {
		Self { out }
	}

	fn write_json(&mut self, record: &impl Serialize) {
		match serde_json::to_string(record) {
			Ok(json) => {
				let _ = writeln!(self.out, "{json}");
				let _ = self.out.flush();
			}
			Err(err) => error!(target = "nlm.dispatch", error = %err, "unserializable outbound record"),
		}
	}
}

impl<W: Write> EventSink for LineSink<W> {
	fn progress(&mut self, progress: Progress) {
		self.write_json(&progress);
	}
}

/// Reads envelopes until EOF, processing one command at a time.
///
/// Malformed lines and envelopes without a usable `id`/`cmd` pair are
/// dropped without a response; everything else gets exactly one.
pub async fn serve<R, W>(mut reader: R, writer: W, mut session: SessionController) -> std::io::Result<()>
where
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let mut sink = LineSink::new(writer);
	let mut line = String::new();

	loop {
		line.clear();
		match reader.read_line(&mut line).await {
			Ok(0) => break,
			Ok(_) => {}
			Err(err) => {
				error!(target = "nlm.dispatch", error = %err, "inbound read failed");
				break;
			}
		}

		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}

		let Some(envelope) = Envelope::parse(trimmed) else {
			debug!(target = "nlm.dispatch", "ignoring unparseable line");
			continue;
		};
		let Some((id, cmd)) = envelope.correlated() else {
			debug!(target = "nlm.dispatch", "ignoring envelope without id/cmd");
			continue;
		};
		let (id, cmd) = (id.to_string(), cmd.to_string());
		info!(target = "nlm.dispatch", %id, %cmd, "command accepted");

		let response = match execute(&cmd, &envelope, &mut session, &mut sink).await {
			Ok(data) => Response::ok(id, data),
			Err(err) => Response::fail(id, err.to_string()),
		};
		sink.write_json(&response);
	}

	Ok(())
}

async fn execute<W: Write>(
	cmd: &str,
	envelope: &Envelope,
	session: &mut SessionController,
	sink: &mut LineSink<W>,
) -> Result<Value> {
	let Some(command) = Command::parse(cmd) else {
		return Err(WorkerError::UnknownCommand(cmd.to_string()));
	};
	commands::run(command, envelope, session, sink).await
}
