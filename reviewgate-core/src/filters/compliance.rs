//! Business rule, data governance and industry compliance checks.
//!
//! Business rules are regex patterns with an action. `block` and `flag` rules
//! fail on any match; `require_disclaimer` rules fail only when the matched
//! content does not already carry the rule's disclaimer text.
//!
//! [`DataGovernanceChecker`] and [`IndustryComplianceChecker`] are fixed rule
//! sets meant for generated responses.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::{ComplianceConfig, ConfigError};
use crate::guardrail::{Context, Guardrail, GuardrailVerdict, Severity};

/// What a matching rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    RequireDisclaimer,
    Flag,
}

/// A business rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRuleSpec {
    pub name: String,
    pub description: String,
    /// Case-insensitive regex
    pub pattern: String,
    pub severity: Severity,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

/// Rules installed when none are configured.
#[must_use]
pub fn default_rules() -> Vec<BusinessRuleSpec> {
    vec![
        BusinessRuleSpec {
            name: "no_competitor_mention".into(),
            description: "Prevent mention of competitor names".into(),
            pattern: r"\b(competitor1|competitor2|rival_company)\b".into(),
            severity: Severity::Medium,
            action: RuleAction::Block,
            disclaimer: None,
        },
        BusinessRuleSpec {
            name: "financial_advice_disclaimer".into(),
            description: "Require disclaimer for financial advice".into(),
            pattern: r"\b(specific investment advice|buy.*stock|sell.*stock|guaranteed.*profit)\b"
                .into(),
            severity: Severity::High,
            action: RuleAction::RequireDisclaimer,
            disclaimer: Some(
                "This is not financial advice. Please consult with a qualified financial advisor."
                    .into(),
            ),
        },
        BusinessRuleSpec {
            name: "medical_advice_disclaimer".into(),
            description: "Require disclaimer for medical advice".into(),
            pattern: r"\b(take.*medication|you have.*disease|diagnose.*with)\b".into(),
            severity: Severity::High,
            action: RuleAction::RequireDisclaimer,
            disclaimer: Some(
                "This is not medical advice. Please consult with a qualified healthcare professional."
                    .into(),
            ),
        },
    ]
}

#[derive(Debug, Clone)]
struct CompiledRule {
    spec: BusinessRuleSpec,
    regex: Regex,
}

impl CompiledRule {
    fn compile(spec: BusinessRuleSpec) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                rule: spec.name.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { spec, regex })
    }

    /// Violation text for matching `content`, if the rule's action calls for one.
    fn violation(&self, content: &str) -> Option<String> {
        let spec = &self.spec;
        match spec.action {
            RuleAction::Block => Some(format!(
                "Rule '{}' violated: {}",
                spec.name, spec.description
            )),
            RuleAction::RequireDisclaimer => spec
                .disclaimer
                .as_deref()
                .filter(|d| !d.is_empty() && !content.contains(d))
                .map(|_| format!("Rule '{}': Required disclaimer missing", spec.name)),
            RuleAction::Flag => Some(format!(
                "Rule '{}' flagged: {}",
                spec.name, spec.description
            )),
        }
    }
}

// ============================================================================
// Business Rule Checker
// ============================================================================

#[derive(Debug, Clone)]
pub struct BusinessRuleChecker {
    rules: Vec<CompiledRule>,
}

impl BusinessRuleChecker {
    /// Compiles `specs`; an empty list installs [`default_rules`].
    pub fn new(specs: Vec<BusinessRuleSpec>) -> Result<Self, ConfigError> {
        let specs = if specs.is_empty() {
            default_rules()
        } else {
            specs
        };
        let rules = specs
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(Vec::new())
    }

    /// Appends a rule after the existing ones.
    pub fn add_rule(&mut self, spec: BusinessRuleSpec) -> Result<(), ConfigError> {
        self.rules.push(CompiledRule::compile(spec)?);
        Ok(())
    }

    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.spec.name.as_str()).collect()
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let mut triggered = Vec::new();
        let mut violations = Vec::new();
        let mut severity = Severity::Low;

        for rule in self.rules.iter().filter(|r| r.regex.is_match(content)) {
            triggered.push(rule.spec.name.clone());
            severity = severity.max(rule.spec.severity);
            violations.extend(rule.violation(content));
        }

        let verdict = if violations.is_empty() {
            GuardrailVerdict::pass("Business rule check passed")
        } else {
            GuardrailVerdict::fail(
                severity,
                format!("Business rule check failed ({} violations)", violations.len()),
                violations,
            )
        };
        verdict
            .with_meta("triggered_rules", triggered)
            .with_meta("total_rules_checked", self.rules.len())
    }
}

#[async_trait]
impl Guardrail for BusinessRuleChecker {
    fn name(&self) -> &str {
        "business_rule_checker"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Data Governance
// ============================================================================

fn case_insensitive(pattern: &str) -> Regex {
    // SAFETY: .expect() on LazyLock with compile-time literal regex patterns.
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("BUG: built-in compliance regex is invalid")
}

static SENSITIVE_DATA_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("personal_data", r"\b(personal data|personal information|PII)\b"),
        ("biometric_data", r"\b(biometric|fingerprint|facial recognition)\b"),
        ("health_data", r"\b(health data|medical records|health information)\b"),
        ("financial_data", r"\b(credit card|bank account|financial records)\b"),
        ("location_data", r"\b(location|GPS|geolocation|address)\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, case_insensitive(pattern)))
    .collect()
});

const GDPR_RIGHTS: &[&str] = &[
    "right to access",
    "right to rectification",
    "right to erasure",
    "right to restrict processing",
    "right to data portability",
];
const LAWFUL_BASES: &[&str] = &["consent", "contract", "legal obligation", "legitimate interest"];
const CCPA_RIGHTS: &[&str] = &["right to know", "right to delete", "right to opt-out"];
const CONSENT_PHRASES: &[&str] = &[
    "with your consent",
    "you agree",
    "by proceeding",
    "you acknowledge",
    "opt-in",
    "permission",
];

fn mentions_any(lowered: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| lowered.contains(p))
}

/// Flags sensitive data mentions that lack privacy-law language.
///
/// Only content that mentions a sensitive data category is held to the GDPR,
/// CCPA and consent requirements.
#[derive(Debug, Clone)]
pub struct DataGovernanceChecker {
    enabled: bool,
    gdpr: bool,
    ccpa: bool,
}

impl DataGovernanceChecker {
    #[must_use]
    pub fn new(gdpr: bool, ccpa: bool) -> Self {
        Self {
            enabled: true,
            gdpr,
            ccpa,
        }
    }

    #[must_use]
    pub fn from_config(config: &ComplianceConfig) -> Self {
        Self {
            enabled: config.data_governance_enabled,
            gdpr: config.gdpr,
            ccpa: config.ccpa,
        }
    }

    /// Sensitive data categories mentioned in `content`.
    #[must_use]
    pub fn detected_data_types(content: &str) -> Vec<&'static str> {
        SENSITIVE_DATA_PATTERNS
            .iter()
            .filter(|(_, re)| re.is_match(content))
            .map(|(name, _)| *name)
            .collect()
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let detected = Self::detected_data_types(content);
        let lowered = content.to_lowercase();
        let mut violations = Vec::new();

        if !detected.is_empty() {
            if self.gdpr {
                if !mentions_any(&lowered, GDPR_RIGHTS) {
                    violations.push("GDPR: No mention of data subject rights".to_string());
                }
                if !mentions_any(&lowered, LAWFUL_BASES) {
                    violations.push("GDPR: No lawful basis for processing mentioned".to_string());
                }
            }
            if self.ccpa && !mentions_any(&lowered, CCPA_RIGHTS) {
                violations.push("CCPA: No mention of consumer rights".to_string());
            }
            if !mentions_any(&lowered, CONSENT_PHRASES) {
                violations
                    .push("Sensitive data mentioned without proper consent language".to_string());
            }
        }

        let verdict = if violations.is_empty() {
            GuardrailVerdict::pass("Data governance check passed")
        } else {
            GuardrailVerdict::fail(
                Severity::High,
                format!("Data governance check failed ({} violations)", violations.len()),
                violations,
            )
        };
        verdict
            .with_meta("detected_data_types", detected)
            .with_meta("gdpr_enabled", self.gdpr)
            .with_meta("ccpa_enabled", self.ccpa)
    }
}

#[async_trait]
impl Guardrail for DataGovernanceChecker {
    fn name(&self) -> &str {
        "data_governance_checker"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Industry Compliance
// ============================================================================

/// Industry whose disclosure rules apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Healthcare,
    Financial,
    Legal,
    #[default]
    General,
}

impl Industry {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthcare => "healthcare",
            Self::Financial => "financial",
            Self::Legal => "legal",
            Self::General => "general",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Healthcare => "Healthcare",
            Self::Financial => "Financial",
            Self::Legal => "Legal",
            Self::General => "General",
        }
    }

    fn rules(self) -> &'static IndustryRules {
        match self {
            Self::Healthcare => &HEALTHCARE_RULES,
            Self::Financial => &FINANCIAL_RULES,
            Self::Legal => &LEGAL_RULES,
            Self::General => &GENERAL_RULES,
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct IndustryRules {
    /// Case-insensitive substrings every response must contain
    disclaimers: &'static [&'static str],
    forbidden: Vec<(&'static str, Regex)>,
    required: Vec<(&'static str, Regex)>,
}

impl IndustryRules {
    fn compile(
        disclaimers: &'static [&'static str],
        forbidden: &[&'static str],
        required: &[&'static str],
    ) -> Self {
        let tagged = |patterns: &[&'static str]| {
            patterns
                .iter()
                .map(|p| (*p, case_insensitive(p)))
                .collect::<Vec<_>>()
        };
        Self {
            disclaimers,
            forbidden: tagged(forbidden),
            required: tagged(required),
        }
    }
}

static HEALTHCARE_RULES: LazyLock<IndustryRules> = LazyLock::new(|| {
    IndustryRules::compile(
        &["HIPAA", "medical advice"],
        &[r"\b(cure|guaranteed|miracle)\b"],
        &[r"\b(consult.*healthcare professional)\b"],
    )
});

static FINANCIAL_RULES: LazyLock<IndustryRules> = LazyLock::new(|| {
    IndustryRules::compile(
        &["SEC", "financial advice", "investment risk"],
        &[r"\b(guaranteed returns|risk-free)\b"],
        &[r"\b(past performance.*future results)\b"],
    )
});

static LEGAL_RULES: LazyLock<IndustryRules> = LazyLock::new(|| {
    IndustryRules::compile(
        &["legal advice", "attorney-client"],
        &[r"\b(guaranteed outcome|sure win)\b"],
        &[r"\b(consult.*attorney)\b"],
    )
});

static GENERAL_RULES: LazyLock<IndustryRules> =
    LazyLock::new(|| IndustryRules::compile(&[], &[], &[]));

/// Checks required disclaimers and forbidden or required phrasing for one industry.
#[derive(Debug, Clone)]
pub struct IndustryComplianceChecker {
    industry: Industry,
    name: String,
}

impl IndustryComplianceChecker {
    #[must_use]
    pub fn new(industry: Industry) -> Self {
        Self {
            industry,
            name: format!("industry_compliance_checker_{industry}"),
        }
    }

    #[must_use]
    pub fn industry(&self) -> Industry {
        self.industry
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let industry = self.industry;
        let rules = industry.rules();
        let lowered = content.to_lowercase();
        let mut violations = Vec::new();

        for disclaimer in rules.disclaimers {
            if !lowered.contains(&disclaimer.to_lowercase()) {
                violations.push(format!(
                    "Missing required {industry} disclaimer: {disclaimer}"
                ));
            }
        }
        for (pattern, re) in &rules.forbidden {
            if re.is_match(content) {
                violations.push(format!(
                    "Forbidden {industry} content pattern found: {pattern}"
                ));
            }
        }
        for (pattern, re) in &rules.required {
            if !re.is_match(content) {
                violations.push(format!("Required {industry} pattern missing: {pattern}"));
            }
        }

        let verdict = if violations.is_empty() {
            GuardrailVerdict::pass(format!("{} compliance check passed", industry.title()))
        } else {
            GuardrailVerdict::fail(
                Severity::High,
                format!(
                    "{} compliance check failed ({} violations)",
                    industry.title(),
                    violations.len()
                ),
                violations,
            )
        };
        verdict.with_meta("industry", industry.as_str())
    }
}

#[async_trait]
impl Guardrail for IndustryComplianceChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> BusinessRuleChecker {
        BusinessRuleChecker::with_defaults().unwrap()
    }

    #[test]
    fn test_defaults_installed() {
        assert_eq!(
            checker().rule_names(),
            [
                "no_competitor_mention",
                "financial_advice_disclaimer",
                "medical_advice_disclaimer"
            ]
        );
    }

    #[test]
    fn test_block_rule() {
        let verdict = checker().evaluate("Have you tried Rival_Company instead?");
        assert!(!verdict.passed);
        assert_eq!(verdict.severity, Severity::Medium);
        assert_eq!(
            verdict.violations,
            vec!["Rule 'no_competitor_mention' violated: Prevent mention of competitor names"]
        );
    }

    #[test]
    fn test_disclaimer_missing_then_present() {
        let verdict = checker().evaluate("You should buy this stock today");
        assert!(!verdict.passed);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(
            verdict.violations,
            vec!["Rule 'financial_advice_disclaimer': Required disclaimer missing"]
        );

        let with_disclaimer = "You should buy this stock today. This is not financial advice. \
             Please consult with a qualified financial advisor.";
        let verdict = checker().evaluate(with_disclaimer);
        assert!(verdict.passed);
        assert_eq!(
            verdict.metadata["triggered_rules"],
            serde_json::json!(["financial_advice_disclaimer"])
        );
    }

    #[test]
    fn test_flag_rule_and_max_severity() {
        let mut checker = checker();
        checker
            .add_rule(BusinessRuleSpec {
                name: "refund_promise".into(),
                description: "Refund promises need finance sign-off".into(),
                pattern: r"\bfull refund\b".into(),
                severity: Severity::Critical,
                action: RuleAction::Flag,
                disclaimer: None,
            })
            .unwrap();

        let verdict = checker.evaluate("competitor1 offers a FULL REFUND");
        assert_eq!(verdict.violations.len(), 2);
        assert_eq!(verdict.severity, Severity::Critical);
        assert_eq!(verdict.metadata["total_rules_checked"], 4);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = BusinessRuleChecker::new(vec![BusinessRuleSpec {
            name: "broken".into(),
            description: "bad regex".into(),
            pattern: "(unclosed".into(),
            severity: Severity::Low,
            action: RuleAction::Block,
            disclaimer: None,
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { rule, .. } if rule == "broken"));
    }

    #[test]
    fn test_rule_spec_from_json() {
        let spec: BusinessRuleSpec = serde_json::from_str(
            r#"{"name": "n", "description": "d", "pattern": "x", "severity": "high", "action": "require_disclaimer"}"#,
        )
        .unwrap();
        assert_eq!(spec.action, RuleAction::RequireDisclaimer);
        assert_eq!(spec.severity, Severity::High);
        assert!(spec.disclaimer.is_none());
    }

    #[test]
    fn test_governance_ignores_content_without_sensitive_data() {
        let verdict = DataGovernanceChecker::new(true, true).evaluate("The sky is blue.");
        assert!(verdict.passed);
        assert_eq!(verdict.metadata["detected_data_types"], serde_json::json!([]));
    }

    #[test]
    fn test_governance_requires_privacy_language() {
        let verdict =
            DataGovernanceChecker::new(true, true).evaluate("We store your GPS location and fingerprint.");
        assert!(!verdict.passed);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.message, "Data governance check failed (4 violations)");
        assert_eq!(
            verdict.metadata["detected_data_types"],
            serde_json::json!(["biometric_data", "location_data"])
        );

        let compliant = "With your consent we store your address. You keep the right to access \
             and the right to delete it.";
        assert!(DataGovernanceChecker::new(true, true).evaluate(compliant).passed);
    }

    #[test]
    fn test_governance_regimes_toggle() {
        let content = "Your bank account is linked. You agree to this under contract.";
        let gdpr_only = DataGovernanceChecker::new(true, false).evaluate(content);
        assert_eq!(
            gdpr_only.violations,
            vec!["GDPR: No mention of data subject rights"]
        );
        let ccpa_only = DataGovernanceChecker::new(false, true).evaluate(content);
        assert_eq!(ccpa_only.violations, vec!["CCPA: No mention of consumer rights"]);
        assert_eq!(ccpa_only.metadata["gdpr_enabled"], false);
    }

    #[test]
    fn test_general_industry_always_passes() {
        let checker = IndustryComplianceChecker::new(Industry::General);
        assert_eq!(checker.name(), "industry_compliance_checker_general");
        let verdict = checker.evaluate("anything at all");
        assert!(verdict.passed);
        assert_eq!(verdict.message, "General compliance check passed");
    }

    #[test]
    fn test_healthcare_rules() {
        let checker = IndustryComplianceChecker::new(Industry::Healthcare);
        let verdict = checker.evaluate("This miracle pill works.");
        assert!(!verdict.passed);
        assert_eq!(
            verdict.violations,
            vec![
                "Missing required healthcare disclaimer: HIPAA",
                "Missing required healthcare disclaimer: medical advice",
                r"Forbidden healthcare content pattern found: \b(cure|guaranteed|miracle)\b",
                r"Required healthcare pattern missing: \b(consult.*healthcare professional)\b",
            ]
        );
        assert_eq!(verdict.metadata["industry"], "healthcare");

        let verdict = checker.evaluate(
            "This is not medical advice (hipaa notice). Consult your healthcare professional.",
        );
        assert!(verdict.passed, "{:?}", verdict.violations);
    }

    #[test]
    fn test_industry_from_config_json() {
        let industry: Industry = serde_json::from_str(r#""financial""#).unwrap();
        assert_eq!(industry, Industry::Financial);
        let verdict = IndustryComplianceChecker::new(industry)
            .evaluate("Risk-free guaranteed returns!");
        assert_eq!(verdict.message, "Financial compliance check failed (5 violations)");
    }
}
