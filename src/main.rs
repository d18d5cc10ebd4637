mod calc;
mod config;
mod db;
mod ipc;
mod model;
mod planner;
mod report;
mod store;
mod validate;

use std::io::{self, BufRead, Write};

use clap::Parser;

fn main() {
    let cli = config::Cli::parse();
    config::init_tracing(&cli.log);

    let mut state = ipc::AppState::default();
    if let Some(path) = cli.workspace.as_deref() {
        // A bad startup workspace is not fatal; the client can pick another.
        if let Err(e) = state.open_workspace(path) {
            tracing::error!(workspace = %path.display(), error = %e, "failed to open workspace");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                let resp = ipc::bad_json(e.to_string());
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(stdout, "{}", resp);
        let _ = stdout.flush();
    }
    tracing::debug!("stdin closed, exiting");
}
