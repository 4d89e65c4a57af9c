//! `studentd`: a JSON-lines sidecar over a SQLite workspace of student records.

mod config;
mod db;
mod error;
mod gate;
mod grid;
mod ipc;
mod password;
mod records;

use std::io::{self, BufRead, Write};

use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(level: &str) {
    // stdout carries the protocol; logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_level(true)
                .with_target(false),
        )
        .init();
}

fn main() {
    let (cfg, cfg_err) = match config::Config::load() {
        Ok(c) => (c, None),
        Err(e) => (config::Config::default(), Some(e)),
    };
    init_logging(&cfg.log_level);
    if let Some(e) = cfg_err {
        warn!(error = %format!("{e:#}"), "configuration rejected; using defaults");
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        password_scheme = ?cfg.password_scheme,
        "studentd starting"
    );

    let startup_workspace = cfg.workspace.clone();
    let mut state = ipc::AppState::new(cfg);
    if let Some(path) = startup_workspace {
        if let Err(e) = ipc::select_workspace(&mut state, &path) {
            error!(workspace = %path.display(), error = %format!("{e:#}"), "startup workspace unavailable");
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
                // Can't reply without id.
                let _ = writeln!(
                    stdout,
                    "{}",
                    json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed; shutting down");
}
