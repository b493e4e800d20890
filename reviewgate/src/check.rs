//! `reviewgate check`: run the full guardrail chain on one input.

use std::sync::Arc;
use std::time::Duration;

use reviewgate_core::filters::{build_chain, build_output_chain};
use reviewgate_core::guardrail::{Context, NamedVerdict, critical_violations, has_violations};
use reviewgate_core::review::HumanReviewManager;
use reviewgate_core::GatewayConfig;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::reviewer::SimulatedReviewer;

/// Reviewer name recorded on decisions made by `check`.
pub const OPERATOR_REVIEWER: &str = "cli_operator";

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// True when no guardrail failed
    pub passed: bool,
    /// Number of failed verdicts with critical severity
    pub critical: usize,
    pub results: Vec<NamedVerdict>,
    /// Output validator verdicts for `--response`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_results: Vec<NamedVerdict>,
}

/// Runs filters, business rules, the approval workflow and human review, then
/// the output validators if `args.response` is set.
pub async fn run_check(mut config: GatewayConfig, args: &CheckArgs) -> Result<CheckReport, CliError> {
    if let Some(secs) = args.timeout_secs {
        config.review.timeout = Duration::from_secs(secs);
        config.review.validate()?;
    }

    let mut chain = build_chain(&config)?;
    let output_chain = build_output_chain(&config)?;
    let manager = Arc::new(HumanReviewManager::new(config.review)?);
    chain.push(manager.clone());
    let sweeper = manager.spawn_sweeper();

    let cancel = CancellationToken::new();
    let reviewer = SimulatedReviewer::new(
        manager.clone(),
        OPERATOR_REVIEWER,
        args.decision.into(),
        Duration::from_millis(args.delay_ms),
    )
    .spawn(cancel.clone());

    let results = chain
        .check_all(&args.content, &Context::new(), args.fail_fast)
        .await;

    cancel.cancel();
    manager.shutdown();
    reviewer.await?;
    sweeper.await?;

    let output_results = match &args.response {
        Some(response) => {
            output_chain
                .check_all(response, &Context::new(), args.fail_fast)
                .await
        }
        None => Vec::new(),
    };

    Ok(CheckReport {
        passed: !has_violations(&results) && !has_violations(&output_results),
        critical: critical_violations(&results).len() + critical_violations(&output_results).len(),
        results,
        output_results,
    })
}
