//! Stateless content guardrails.
//!
//! ## Module Organization
//!
//! - `content` - Toxicity, PII, profanity and length filters
//! - `compliance` - Business rules, data governance, industry compliance
//! - `output` - Response structure, format, completeness and typed-model validators

pub mod compliance;
pub mod content;
pub mod output;

pub use compliance::{
    BusinessRuleChecker, BusinessRuleSpec, DataGovernanceChecker, Industry,
    IndustryComplianceChecker, RuleAction, default_rules,
};
pub use content::{ContentLengthFilter, PiiFilter, ProfanityFilter, ToxicityFilter};
pub use output::{
    CompletenessValidator, FormatValidator, ModelValidator, OutputFormat, StructureSchema,
    StructureValidator,
};

use std::sync::Arc;

use crate::config::{ConfigError, GatewayConfig};
use crate::guardrail::GuardrailChain;
use crate::review::ApprovalWorkflow;

/// Builds the stateless part of the guardrail chain from configuration.
///
/// Order: length, toxicity, PII, profanity, business rules, approval workflow.
/// Human review is appended by the caller since it owns the queue.
pub fn build_chain(config: &GatewayConfig) -> Result<GuardrailChain, ConfigError> {
    let filters = &config.filters;
    let mut chain = GuardrailChain::new();
    chain.push(Arc::new(ContentLengthFilter::from_config(filters)?));
    chain.push(Arc::new(ToxicityFilter::from_config(filters)?));
    chain.push(Arc::new(PiiFilter::from_config(filters)));
    chain.push(Arc::new(ProfanityFilter::from_config(filters)));
    chain.push(Arc::new(BusinessRuleChecker::new(
        config.business_rules.clone().unwrap_or_default(),
    )?));
    chain.push(Arc::new(ApprovalWorkflow::new(config.approval.clone())?));
    Ok(chain)
}

/// Builds the chain applied to generated responses.
///
/// Order: structure, format, completeness (when `output.enabled`), then data
/// governance and industry compliance.
pub fn build_output_chain(config: &GatewayConfig) -> Result<GuardrailChain, ConfigError> {
    let output = &config.output;
    let mut chain = GuardrailChain::new();
    if output.enabled {
        chain.push(Arc::new(StructureValidator::new(output.schema.clone())));
        chain.push(Arc::new(FormatValidator::from_config(output)?));
        chain.push(Arc::new(CompletenessValidator::from_config(output)?));
    }
    chain.push(Arc::new(DataGovernanceChecker::from_config(&config.compliance)));
    chain.push(Arc::new(IndustryComplianceChecker::new(
        config.compliance.industry,
    )));
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::{Context, critical_violations, has_violations};

    #[tokio::test]
    async fn test_default_chain_order_and_results() {
        let chain = build_chain(&GatewayConfig::default()).unwrap();
        assert_eq!(chain.len(), 6);

        let results = chain
            .check_all("Email me at jane@example.com", &Context::new(), false)
            .await;
        let names: Vec<&str> = results.iter().map(|r| r.guardrail.as_str()).collect();
        assert_eq!(
            names,
            [
                "content_length_filter",
                "toxicity_filter",
                "pii_filter",
                "profanity_filter",
                "business_rule_checker",
                "approval_workflow"
            ]
        );
        assert!(has_violations(&results));
        assert_eq!(critical_violations(&results)[0].guardrail, "pii_filter");
    }

    #[tokio::test]
    async fn test_disabled_approval_is_skipped() {
        let mut config = GatewayConfig::default();
        config.approval.enabled = false;
        let chain = build_chain(&config).unwrap();
        let results = chain.check_all("refund please", &Context::new(), false).await;
        assert!(!has_violations(&results));
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_output_chain_order_and_results() {
        let chain = build_output_chain(&GatewayConfig::default()).unwrap();
        let results = chain
            .check_all("Your order has shipped and will arrive Tuesday.", &Context::new(), false)
            .await;
        let names: Vec<&str> = results.iter().map(|r| r.guardrail.as_str()).collect();
        assert_eq!(
            names,
            [
                "structure_validator",
                "format_validator",
                "completeness_validator",
                "data_governance_checker",
                "industry_compliance_checker_general"
            ]
        );
        assert!(!has_violations(&results));

        let results = chain
            .check_all("We saved your home address and", &Context::new(), false)
            .await;
        let failed: Vec<&str> = results
            .iter()
            .filter(|r| !r.verdict.passed)
            .map(|r| r.guardrail.as_str())
            .collect();
        assert_eq!(failed, ["structure_validator", "data_governance_checker"]);
    }

    #[tokio::test]
    async fn test_output_chain_honours_config() {
        let mut config = GatewayConfig::default();
        config.output.enabled = false;
        config.compliance.data_governance_enabled = false;
        config.compliance.industry = Industry::Legal;
        let chain = build_output_chain(&config).unwrap();
        assert_eq!(chain.len(), 2);

        let results = chain
            .check_all("You will surely win.", &Context::new(), false)
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].guardrail, "industry_compliance_checker_legal");
        assert!(!results[0].verdict.passed);
    }

    #[test]
    fn test_output_chain_rejects_bad_pattern() {
        let mut config = GatewayConfig::default();
        config.output.forbidden_patterns = vec!["[".into()];
        assert!(matches!(
            build_output_chain(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
