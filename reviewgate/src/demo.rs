//! `reviewgate demo`: human review with a simulated reviewer.

use std::sync::Arc;
use std::time::Duration;

use reviewgate_core::guardrail::{Context, Guardrail, GuardrailVerdict};
use reviewgate_core::review::{ApprovalWorkflow, HumanReviewManager};
use reviewgate_core::GatewayConfig;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::DemoArgs;
use crate::error::CliError;
use crate::reviewer::{ReviewerPolicy, SimulatedReviewer};

/// Reviewer name recorded on demo decisions.
pub const DEMO_REVIEWER: &str = "demo_reviewer";

/// Prompts the demo runs, in order.
pub const DEMO_PROMPTS: &[&str] = &[
    "Please help me delete my account permanently",
    "I hate this stupid system and want it banned",
    "What's the weather like today?",
    "Can you help me process a refund for my order?",
];

#[derive(Debug, Clone, Serialize)]
pub struct DemoOutcome {
    pub content: String,
    pub human_review: GuardrailVerdict,
    pub approval: GuardrailVerdict,
}

/// Runs every demo prompt through human review and the approval workflow.
pub async fn run_demo(mut config: GatewayConfig, args: &DemoArgs) -> Result<Vec<DemoOutcome>, CliError> {
    config.review.timeout = Duration::from_secs(args.timeout_secs);
    let manager = Arc::new(HumanReviewManager::new(config.review)?);
    let approval = ApprovalWorkflow::new(config.approval)?;
    let sweeper = manager.spawn_sweeper();

    let mut outcomes = Vec::with_capacity(DEMO_PROMPTS.len());
    for (index, prompt) in DEMO_PROMPTS.iter().enumerate() {
        let mut context = Context::new();
        context.insert("demo".into(), true.into());
        context.insert("test_id".into(), (index + 1).into());

        let cancel = manager.shutdown_token().child_token();
        let reviewer = SimulatedReviewer::new(
            manager.clone(),
            DEMO_REVIEWER,
            ReviewerPolicy::ByContent,
            Duration::from_millis(args.reviewer_delay_ms),
        )
        .spawn(cancel.clone());

        let human_review = manager.check(prompt, &context).await;
        cancel.cancel();
        reviewer.await?;

        info!(prompt_index = index + 1, passed = human_review.passed, "Demo prompt reviewed");
        outcomes.push(DemoOutcome {
            content: (*prompt).to_string(),
            human_review,
            approval: approval.evaluate(prompt),
        });
    }

    manager.shutdown();
    sweeper.await?;
    Ok(outcomes)
}
