//! Guardrail interface shared by every check.
//!
//! A guardrail inspects a piece of text (plus caller context) and returns a
//! [`GuardrailVerdict`]. Verdicts are data: checks never fail with an error,
//! they fail with `passed = false` and a severity.
//!
//! ## Module Organization
//!
//! - `chain` - Ordered execution of several guardrails

pub mod chain;

pub use chain::{GuardrailChain, NamedVerdict, critical_violations, has_violations};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Caller-supplied context passed alongside the content.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Structured details attached to a verdict.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Severity
// ============================================================================

/// Severity of a guardrail outcome. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Result of a guardrail check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    /// Whether the content may proceed
    pub passed: bool,
    /// How serious a failure is (`Low` for passes)
    pub severity: Severity,
    /// Human-readable summary
    pub message: String,
    /// One entry per detected problem
    pub violations: Vec<String>,
    /// Check-specific details
    pub metadata: Metadata,
}

impl GuardrailVerdict {
    /// A passing verdict with `Low` severity.
    #[must_use]
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            severity: Severity::Low,
            message: message.into(),
            violations: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// A failing verdict.
    #[must_use]
    pub fn fail(severity: Severity, message: impl Into<String>, violations: Vec<String>) -> Self {
        Self {
            passed: false,
            severity,
            message: message.into(),
            violations,
            metadata: Metadata::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

// ============================================================================
// Guardrail Trait
// ============================================================================

/// A pass/fail check applied to text before or after model use.
#[async_trait]
pub trait Guardrail: Send + Sync {
    /// Stable name used for logging and removal from a chain.
    fn name(&self) -> &str;

    /// Disabled guardrails are skipped by [`GuardrailChain`].
    fn is_enabled(&self) -> bool {
        true
    }

    /// Checks `content` and returns a verdict.
    async fn check(&self, content: &str, context: &Context) -> GuardrailVerdict;
}

/// Returns true if `context[key]` is the JSON boolean `true`.
pub(crate) fn context_flag(context: &Context, key: &str) -> bool {
    context
        .get(key)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(
            [Severity::Medium, Severity::Critical, Severity::Low]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
        assert!("extreme".parse::<Severity>().is_err());
    }

    #[test]
    fn test_verdict_builders() {
        let verdict = GuardrailVerdict::fail(Severity::High, "nope", vec!["x".into()])
            .with_meta("request_id", "rv_1");
        assert!(!verdict.passed);
        assert_eq!(verdict.metadata["request_id"], "rv_1");

        let verdict = GuardrailVerdict::pass("fine");
        assert!(verdict.passed);
        assert_eq!(verdict.severity, Severity::Low);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_context_flag_requires_true_bool() {
        let mut context = Context::new();
        assert!(!context_flag(&context, "requires_human_review"));
        context.insert("requires_human_review".into(), "yes".into());
        assert!(!context_flag(&context, "requires_human_review"));
        context.insert("requires_human_review".into(), true.into());
        assert!(context_flag(&context, "requires_human_review"));
    }
}
