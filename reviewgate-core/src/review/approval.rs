//! Keyword-triggered approval requirement.

use async_trait::async_trait;

use crate::config::{ApprovalWorkflowConfig, ConfigError};
use crate::guardrail::{Context, Guardrail, GuardrailVerdict, Severity};

/// Stateless check that flags content needing manual approval.
///
/// Unlike [`HumanReviewManager`](super::HumanReviewManager) this never waits:
/// it only reports which keywords would require sign-off.
#[derive(Debug, Clone)]
pub struct ApprovalWorkflow {
    enabled: bool,
    keywords: Vec<String>,
}

impl ApprovalWorkflow {
    pub fn new(config: ApprovalWorkflowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            enabled: config.enabled,
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        })
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            enabled: true,
            keywords: ApprovalWorkflowConfig::default().keywords,
        }
    }

    /// Keywords found in `content`, in configuration order.
    #[must_use]
    pub fn triggered_keywords(&self, content: &str) -> Vec<&str> {
        let lowered = content.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let triggered = self.triggered_keywords(content);
        if triggered.is_empty() {
            return GuardrailVerdict::pass("No approval required")
                .with_meta("triggered_keywords", triggered);
        }

        GuardrailVerdict::fail(
            Severity::High,
            "Content requires manual approval",
            vec![format!(
                "Approval required due to keywords: {}",
                triggered.join(", ")
            )],
        )
        .with_meta("triggered_keywords", triggered)
    }
}

#[async_trait]
impl Guardrail for ApprovalWorkflow {
    fn name(&self) -> &str {
        "approval_workflow"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}
