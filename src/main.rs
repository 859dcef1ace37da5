//! pos - Personal OS CLI
//!
//! Ranks tasks by leverage, urgency and effort, and manages the clients,
//! projects, onboarding templates, saved views and inbox around them.

use clap::Parser;
use pos::cli::Cli;
use pos::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `POS_LOG` wins over `RUST_LOG`. Unusable values mean no logging.
fn log_filter() -> EnvFilter {
    ["POS_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"))
}

fn main() {
    // stdout carries the --json envelope, so logs always go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter())
        .init();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
