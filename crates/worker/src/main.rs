use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;

use nlm_worker::browser::cdp::CdpFactory;
use nlm_worker::cli::Args;
use nlm_worker::session::{SessionConfig, SessionController};
use nlm_worker::{dispatch, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	logging::init_logging(args.verbose);

	let config = SessionConfig::resolve(args.profile_dir, args.browser_path);
	let session = SessionController::new(Box::new(CdpFactory), config);

	let stdin = BufReader::new(tokio::io::stdin());
	dispatch::serve(stdin, std::io::stdout(), session)
		.await
		.context("command loop failed")?;
	Ok(())
}
