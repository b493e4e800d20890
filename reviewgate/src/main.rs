//! reviewgate CLI entry point.
//!
//! Dispatches to `demo` (human review walkthrough) or `check` (full guardrail
//! chain on one input) subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reviewgate_core::config::load_or_default;

use reviewgate::check::run_check;
use reviewgate::cli::{CheckArgs, DemoArgs};
use reviewgate::demo::run_demo;
use reviewgate::error::CliError;

/// Exit code when a check completed but at least one guardrail failed.
const EXIT_VIOLATIONS: i32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// reviewgate: guardrails with human-in-the-loop review.
#[derive(Parser)]
#[command(name = "reviewgate", version)]
struct Cli {
    /// JSON config file (falls back to $REVIEWGATE_CONFIG, then defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sample prompts through human review with a simulated reviewer.
    Demo(DemoArgs),
    /// Run every guardrail against one piece of content.
    Check(CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("reviewgate: {e}");
            1
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    let config = load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo(args) => {
            for outcome in run_demo(config, &args).await? {
                println!("{}", serde_json::to_string(&outcome)?);
            }
            Ok(0)
        }
        Commands::Check(args) => {
            let report = run_check(config, &args).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.passed { 0 } else { EXIT_VIOLATIONS })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing Init
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise tracing subscriber with stderr output.
///
/// When `verbose` is true, sets filter to `debug`. Otherwise, respects
/// `RUST_LOG` environment variable (defaulting to no output).
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
