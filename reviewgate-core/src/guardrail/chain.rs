//! Ordered execution of several guardrails.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::{Context, Guardrail, GuardrailVerdict, Severity};

/// A verdict tagged with the guardrail that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct NamedVerdict {
    pub guardrail: String,
    #[serde(flatten)]
    pub verdict: GuardrailVerdict,
}

/// Runs guardrails in insertion order.
#[derive(Default, Clone)]
pub struct GuardrailChain {
    guardrails: Vec<Arc<dyn Guardrail>>,
}

impl std::fmt::Debug for GuardrailChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.guardrails.iter().map(|g| g.name()))
            .finish()
    }
}

impl GuardrailChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a guardrail to the end of the chain.
    pub fn push(&mut self, guardrail: Arc<dyn Guardrail>) {
        self.guardrails.push(guardrail);
    }

    /// Removes the first guardrail with this name.
    ///
    /// Returns false if none matched.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.guardrails.iter().position(|g| g.name() == name) {
            Some(index) => {
                self.guardrails.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guardrails.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    /// Runs every enabled guardrail against `content`.
    ///
    /// With `fail_fast`, stops after the first failing verdict.
    pub async fn check_all(
        &self,
        content: &str,
        context: &Context,
        fail_fast: bool,
    ) -> Vec<NamedVerdict> {
        let mut results = Vec::with_capacity(self.guardrails.len());

        for guardrail in &self.guardrails {
            if !guardrail.is_enabled() {
                debug!(guardrail = guardrail.name(), "Skipping disabled guardrail");
                continue;
            }

            let verdict = guardrail.check(content, context).await;
            debug!(
                guardrail = guardrail.name(),
                passed = verdict.passed,
                severity = %verdict.severity,
                "Guardrail evaluated"
            );

            let failed = !verdict.passed;
            results.push(NamedVerdict {
                guardrail: guardrail.name().to_string(),
                verdict,
            });

            if fail_fast && failed {
                break;
            }
        }

        results
    }
}

/// Returns true if any verdict failed.
#[must_use]
pub fn has_violations(results: &[NamedVerdict]) -> bool {
    results.iter().any(|r| !r.verdict.passed)
}

/// Returns the failed verdicts with `Critical` severity.
#[must_use]
pub fn critical_violations(results: &[NamedVerdict]) -> Vec<&NamedVerdict> {
    results
        .iter()
        .filter(|r| !r.verdict.passed && r.verdict.severity == Severity::Critical)
        .collect()
}
