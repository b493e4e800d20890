//! CLI argument types for `reviewgate demo` and `reviewgate check`.
//!
//! These types are defined separately from `main.rs` so that integration tests
//! can construct them directly.

use clap::{Args, ValueEnum};

use crate::reviewer::{Decision, ReviewerPolicy};

// ─────────────────────────────────────────────────────────────────────────────
// Demo Subcommand Args
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `reviewgate demo`.
///
/// Runs a fixed set of prompts through human review with a simulated reviewer
/// that escalates destructive requests, rejects toxic ones and approves the rest.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Seconds each request waits for the reviewer.
    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,

    /// Milliseconds the simulated reviewer waits before deciding.
    #[arg(long, default_value_t = 1000)]
    pub reviewer_delay_ms: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Check Subcommand Args
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `reviewgate check`.
///
/// Runs the full guardrail chain against one piece of content, and the
/// output validators against a response when one is given.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Content to check.
    pub content: String,

    /// How the simulated reviewer answers review requests.
    #[arg(long, value_enum, default_value = "approve")]
    pub decision: CliDecision,

    /// Milliseconds the simulated reviewer waits before deciding.
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Override the review timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Stop at the first failing guardrail.
    #[arg(long)]
    pub fail_fast: bool,

    /// Model response to run through the output validators.
    #[arg(long)]
    pub response: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Enums (clap-compatible)
// ─────────────────────────────────────────────────────────────────────────────

/// CLI-level reviewer decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliDecision {
    Approve,
    Reject,
    Escalate,
    /// No reviewer answers; requests time out.
    None,
}

impl From<CliDecision> for ReviewerPolicy {
    fn from(d: CliDecision) -> Self {
        match d {
            CliDecision::Approve => ReviewerPolicy::Always(Decision::Approve),
            CliDecision::Reject => ReviewerPolicy::Always(Decision::Reject),
            CliDecision::Escalate => ReviewerPolicy::Always(Decision::Escalate),
            CliDecision::None => ReviewerPolicy::Absent,
        }
    }
}
