//! Configuration for the review gate.
//!
//! Every section has a `Default`, can be overridden from the environment with
//! `apply_env`, and is checked with `validate` before any component is built
//! from it.
//!
//! # Environment Variables
//! - `REVIEW_ENABLED`
//! - `REVIEW_TIMEOUT_SECONDS`
//! - `REVIEW_MAX_QUEUE_SIZE`
//! - `REVIEW_POLL_INTERVAL_MS`
//! - `TOXICITY_THRESHOLD`
//! - `PII_DETECTION_ENABLED`
//! - `CONTENT_FILTER_STRICT_MODE`

pub mod duration_format;
pub mod error;
pub mod loader;

pub use error::ConfigError;
pub use loader::{load_config, load_or_default};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::filters::{BusinessRuleSpec, Industry, OutputFormat, StructureSchema};
use crate::review::ReviewQueueConfig;

/// Keywords that send content to a human reviewer.
pub const DEFAULT_HIGH_RISK_KEYWORDS: &[&str] = &[
    "delete",
    "remove",
    "ban",
    "suspend",
    "terminate",
    "legal",
    "lawsuit",
    "compliance",
    "violation",
    "sensitive",
    "confidential",
    "private",
];

/// Keywords that make [`ApprovalWorkflow`](crate::review::ApprovalWorkflow) demand approval.
pub const DEFAULT_APPROVAL_KEYWORDS: &[&str] = &[
    "delete",
    "remove",
    "ban",
    "suspend",
    "terminate",
    "refund",
    "credit",
    "payment",
    "billing",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

// ============================================================================
// Top-level Config
// ============================================================================

/// Complete configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub review: HumanReviewConfig,
    pub approval: ApprovalWorkflowConfig,
    pub filters: FilterConfig,
    /// Business rules; `None` installs the built-in defaults.
    pub business_rules: Option<Vec<BusinessRuleSpec>>,
    pub compliance: ComplianceConfig,
    pub output: OutputValidationConfig,
}

impl GatewayConfig {
    /// Applies environment overrides to every section.
    pub fn apply_env(&mut self) {
        self.review.apply_env();
        self.filters.apply_env();
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.review.validate()?;
        self.approval.validate()?;
        self.filters.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

// ============================================================================
// Human Review
// ============================================================================

/// Settings for [`HumanReviewManager`](crate::review::HumanReviewManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanReviewConfig {
    /// When false, `check` passes everything without touching the queue
    pub enabled: bool,
    /// How long a request waits for a decision before timing out
    #[serde(with = "duration_format")]
    pub timeout: Duration,
    /// Maximum outstanding requests
    pub max_queue_size: usize,
    /// Fallback re-check interval while waiting for a decision
    #[serde(with = "duration_format")]
    pub poll_interval: Duration,
    /// How long completed requests stay available for lookup
    #[serde(with = "duration_format")]
    pub completed_retention: Duration,
    /// How often the background sweeper expires overdue requests
    #[serde(with = "duration_format")]
    pub sweep_interval: Duration,
    /// Case-insensitive substrings that force review
    pub high_risk_keywords: Vec<String>,
    /// Content longer than this many characters always needs review
    pub max_content_length: usize,
}

impl Default for HumanReviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(300),
            max_queue_size: 1000,
            poll_interval: Duration::from_secs(1),
            completed_retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(10),
            high_risk_keywords: owned(DEFAULT_HIGH_RISK_KEYWORDS),
            max_content_length: 5000,
        }
    }
}

impl HumanReviewConfig {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overrides fields from `REVIEW_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Some(enabled) = env_override("REVIEW_ENABLED") {
            self.enabled = enabled;
        }
        if let Some(secs) = env_override("REVIEW_TIMEOUT_SECONDS") {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(size) = env_override("REVIEW_MAX_QUEUE_SIZE") {
            self.max_queue_size = size;
        }
        if let Some(millis) = env_override("REVIEW_POLL_INTERVAL_MS") {
            self.poll_interval = Duration::from_millis(millis);
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                timeout: self.timeout,
            });
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::InvalidQueueSize {
                size: self.max_queue_size,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval {
                interval: self.poll_interval,
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidSweepInterval {
                interval: self.sweep_interval,
            });
        }
        Ok(())
    }

    /// Queue settings derived from this configuration.
    #[must_use]
    pub fn queue_config(&self) -> ReviewQueueConfig {
        ReviewQueueConfig {
            max_queue_size: self.max_queue_size,
            completed_retention: self.completed_retention,
        }
    }
}

// ============================================================================
// Approval Workflow
// ============================================================================

/// Settings for [`ApprovalWorkflow`](crate::review::ApprovalWorkflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalWorkflowConfig {
    pub enabled: bool,
    pub keywords: Vec<String>,
}

impl Default for ApprovalWorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: owned(DEFAULT_APPROVAL_KEYWORDS),
        }
    }
}

impl ApprovalWorkflowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyKeywords {
                list: "approval.keywords",
            });
        }
        Ok(())
    }
}

// ============================================================================
// Content Filters
// ============================================================================

/// Settings for the regex content filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Toxicity score at or above which content fails
    pub toxicity_threshold: f64,
    pub pii_detection_enabled: bool,
    /// Adds milder insults to the profanity list
    pub strict_profanity: bool,
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            toxicity_threshold: 0.7,
            pii_detection_enabled: true,
            strict_profanity: false,
            min_length: 1,
            max_length: 10_000,
        }
    }
}

impl FilterConfig {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Some(threshold) = env_override("TOXICITY_THRESHOLD") {
            self.toxicity_threshold = threshold;
        }
        if let Some(enabled) = env_override("PII_DETECTION_ENABLED") {
            self.pii_detection_enabled = enabled;
        }
        if let Some(strict) = env_override("CONTENT_FILTER_STRICT_MODE") {
            self.strict_profanity = strict;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.toxicity_threshold.is_finite() || self.toxicity_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                value: self.toxicity_threshold,
            });
        }
        if self.min_length > self.max_length {
            return Err(ConfigError::InvalidLengthBounds {
                min: self.min_length,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Compliance
// ============================================================================

/// Settings for the data governance and industry compliance checkers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub data_governance_enabled: bool,
    /// Require GDPR rights and lawful-basis language
    pub gdpr: bool,
    /// Require CCPA consumer-rights language
    pub ccpa: bool,
    pub industry: Industry,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            data_governance_enabled: true,
            gdpr: true,
            ccpa: true,
            industry: Industry::General,
        }
    }
}

// ============================================================================
// Output Validation
// ============================================================================

/// Settings for the response validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputValidationConfig {
    pub enabled: bool,
    /// Expected shape of JSON responses
    pub schema: Option<StructureSchema>,
    pub allowed_formats: Vec<OutputFormat>,
    /// Case-insensitive regexes every response must match
    pub required_patterns: Vec<String>,
    /// Case-insensitive regexes no response may match
    pub forbidden_patterns: Vec<String>,
    /// Trimmed response length bounds, in characters
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for OutputValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schema: None,
            allowed_formats: vec![OutputFormat::Text, OutputFormat::Json, OutputFormat::Markdown],
            required_patterns: Vec::new(),
            forbidden_patterns: Vec::new(),
            min_length: 10,
            max_length: 5000,
        }
    }
}

impl OutputValidationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length > self.max_length {
            return Err(ConfigError::InvalidLengthBounds {
                min: self.min_length,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

/// Reads an override from the environment.
///
/// Returns `None` when the variable is unset or unparseable (the latter is
/// logged). Booleans accept `true`/`false` in any case.
fn env_override<T: std::str::FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    match val.trim().to_ascii_lowercase().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(
                env_var = name,
                value = %val,
                "Invalid value for environment variable, keeping configured value"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard(&'static [&'static str]);

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for name in self.0 {
                // SAFETY: tests touching the environment are #[serial]
                unsafe { std::env::remove_var(name) };
            }
        }
    }

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests touching the environment are #[serial]
        unsafe { std::env::set_var(name, value) };
    }

    #[test]
    fn test_review_defaults() {
        let config = HumanReviewConfig::default();
        assert!(config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_content_length, 5000);
        assert_eq!(config.high_risk_keywords.len(), 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_review_validate_rejects_zero_values() {
        let config = HumanReviewConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout { .. })
        ));

        let config = HumanReviewConfig {
            max_queue_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQueueSize { size: 0 })
        ));

        let config = HumanReviewConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_validate() {
        assert!(FilterConfig::default().validate().is_ok());
        let config = FilterConfig {
            toxicity_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = FilterConfig {
            min_length: 10,
            max_length: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLengthBounds { min: 10, max: 5 })
        ));
    }

    #[test]
    fn test_approval_validate_empty_keywords() {
        let config = ApprovalWorkflowConfig {
            enabled: true,
            keywords: vec![" ".into()],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_review_env_overrides() {
        let _guard = EnvGuard(&[
            "REVIEW_ENABLED",
            "REVIEW_TIMEOUT_SECONDS",
            "REVIEW_MAX_QUEUE_SIZE",
            "REVIEW_POLL_INTERVAL_MS",
        ]);
        set_env("REVIEW_ENABLED", "FALSE");
        set_env("REVIEW_TIMEOUT_SECONDS", "2");
        set_env("REVIEW_MAX_QUEUE_SIZE", "5");
        set_env("REVIEW_POLL_INTERVAL_MS", "50");

        let config = HumanReviewConfig::from_env();
        assert!(!config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.max_queue_size, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_keeps_default() {
        let _guard = EnvGuard(&["REVIEW_TIMEOUT_SECONDS", "TOXICITY_THRESHOLD"]);
        set_env("REVIEW_TIMEOUT_SECONDS", "five minutes");
        set_env("TOXICITY_THRESHOLD", "0.4");

        assert_eq!(
            HumanReviewConfig::from_env().timeout,
            Duration::from_secs(300)
        );
        assert!((FilterConfig::from_env().toxicity_threshold - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    #[serial]
    fn test_unset_env_keeps_configured_values() {
        let mut config = HumanReviewConfig {
            timeout: Duration::from_millis(1500),
            poll_interval: Duration::from_micros(2500),
            ..Default::default()
        };
        config.apply_env();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.poll_interval, Duration::from_micros(2500));
    }

    #[test]
    fn test_output_and_compliance_sections_from_json() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{
                "compliance": {"industry": "legal", "ccpa": false},
                "output": {
                    "allowed_formats": ["json"],
                    "schema": {"required": ["answer"], "properties": {"answer": {"type": "string"}}},
                    "min_length": 2
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.compliance.industry, Industry::Legal);
        assert!(!config.compliance.ccpa);
        assert!(config.compliance.gdpr);
        assert_eq!(config.output.allowed_formats, vec![OutputFormat::Json]);
        assert_eq!(config.output.schema.unwrap().required, vec!["answer".to_string()]);
        assert_eq!(config.output.max_length, 5000);
    }

    #[test]
    fn test_output_validate_length_bounds() {
        let config = OutputValidationConfig {
            min_length: 100,
            max_length: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLengthBounds { min: 100, max: 10 })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"review": {"timeout": "2s", "max_queue_size": 3}}"#).unwrap();
        assert_eq!(config.review.timeout, Duration::from_secs(2));
        assert_eq!(config.review.max_queue_size, 3);
        assert_eq!(config.review.poll_interval, Duration::from_secs(1));
        assert_eq!(config.approval, ApprovalWorkflowConfig::default());
        assert!(config.business_rules.is_none());
    }
}
