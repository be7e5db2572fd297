//! Homewarden entry point.
//!
//! Takes no flags: reads the environment, performs exactly one run, and
//! exits. Only a log directory that cannot be opened fails the process; a
//! missing access token is logged as an abort and still exits 0.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use tracing::info;

use homewarden::config::{AgentConfig, AgentPaths};
use homewarden::{logging, orchestrator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let paths = AgentPaths::resolve(|key| std::env::var(key).ok());
    let _logging_guard = logging::init(&paths.logs_dir)?;

    let config = AgentConfig::from_env();
    let summary = orchestrator::run_once(&config).await;
    info!(stage = %summary.stage, "exiting");
    Ok(())
}
