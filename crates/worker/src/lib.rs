//! NotebookLM session worker.
//!
//! A long-lived process that owns one persistent browser session and exposes
//! it to a host over a line-delimited JSON protocol: commands arrive on
//! stdin, responses and progress events leave on stdout, logs on stderr.
//! The driven UI is third-party and changes without notice, so element
//! lookup goes through ranked candidate strategies and answer capture is
//! inferred from text growth rather than an explicit completion signal.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod resolve;
pub mod session;
