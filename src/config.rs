use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Line-delimited JSON sidecar for the school records desktop app.
#[derive(Debug, Parser)]
#[command(name = "schoold", version)]
pub struct Cli {
    /// Workspace directory to open at startup. Without it the client must
    /// call `workspace.select` first.
    #[arg(long, env = "SCHOOLD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter directives, e.g. `info` or `schoold=debug`.
    #[arg(long = "log", env = "SCHOOLD_LOG", default_value = "info")]
    pub log: String,
}

/// stdout carries responses, so logs go to stderr.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
