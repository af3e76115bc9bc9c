use std::path::PathBuf;

use clap::Parser;

/// NotebookLM session worker: drives one persistent browser session and
/// speaks newline-delimited JSON over stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "nlm-worker")]
#[command(version)]
pub struct Args {
	/// Browser profile directory (created when missing).
	#[arg(long, value_name = "DIR")]
	pub profile_dir: Option<PathBuf>,

	/// Browser executable override; known install locations are searched
	/// when absent.
	#[arg(long, value_name = "PATH")]
	pub browser_path: Option<PathBuf>,

	/// Increase verbosity (-v info, -vv debug). Logs go to stderr.
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}
