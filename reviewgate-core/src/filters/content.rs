//! Pattern-based content filters.
//!
//! These are keyword heuristics, not classifiers. Each filter is a
//! [`Guardrail`] and can sit in a [`GuardrailChain`](crate::guardrail::GuardrailChain)
//! ahead of human review.

use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::{ConfigError, FilterConfig};
use crate::guardrail::{Context, Guardrail, GuardrailVerdict, Severity};

/// Score added per toxic match.
pub const TOXICITY_WEIGHT: f64 = 0.3;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        // SAFETY: .expect() on LazyLock with compile-time literal regex patterns.
        .map(|p| Regex::new(p).expect("BUG: built-in filter regex is invalid"))
        .collect()
}

static TOXIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b(hate|kill|die|stupid|idiot|moron)\b",
        r"\b(racist|sexist|homophobic)\b",
        r"\b(violence|violent|aggressive)\b",
    ])
});

static PII_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    let names = ["email", "phone", "ssn", "credit_card"];
    let patterns = compile(&[
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b",
        r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b",
        r"\b\d{3}-\d{2}-\d{4}\b",
        r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
    ]);
    names.into_iter().zip(patterns).collect()
});

static PROFANITY_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"\b(damn|hell|crap)\b", r"\b(shit|fuck|bitch)\b"]));

static STRICT_PROFANITY_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"\b(stupid|dumb|idiot)\b"]));

/// Every match of every pattern against lowercased `content`, in pattern order.
fn lowercase_matches<'a>(patterns: impl IntoIterator<Item = &'a Regex>, content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    patterns
        .into_iter()
        .flat_map(|re| {
            re.find_iter(&lowered)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

// ============================================================================
// Toxicity
// ============================================================================

#[derive(Debug, Clone)]
pub struct ToxicityFilter {
    threshold: f64,
}

impl ToxicityFilter {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold { value: threshold });
        }
        Ok(Self { threshold })
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        Self::new(config.toxicity_threshold)
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores `content` at 0.3 per match.
    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let matches = lowercase_matches(TOXIC_PATTERNS.iter(), content);
        #[allow(clippy::cast_precision_loss)]
        let score = matches.len() as f64 * TOXICITY_WEIGHT;
        let violations: Vec<String> = matches
            .iter()
            .map(|m| format!("Toxic language detected: '{m}'"))
            .collect();

        let verdict = if score < self.threshold {
            GuardrailVerdict {
                violations,
                ..GuardrailVerdict::pass("Toxicity check passed")
            }
        } else {
            GuardrailVerdict::fail(
                Severity::High,
                format!(
                    "Toxicity check failed (score: {score:.2}, threshold: {})",
                    self.threshold
                ),
                violations,
            )
        };

        verdict
            .with_meta("toxicity_score", score)
            .with_meta("threshold", self.threshold)
    }
}

#[async_trait]
impl Guardrail for ToxicityFilter {
    fn name(&self) -> &str {
        "toxicity_filter"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// PII
// ============================================================================

#[derive(Debug, Clone)]
pub struct PiiFilter {
    detection_enabled: bool,
}

impl PiiFilter {
    #[must_use]
    pub fn new(detection_enabled: bool) -> Self {
        Self { detection_enabled }
    }

    #[must_use]
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.pii_detection_enabled)
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        if !self.detection_enabled {
            return GuardrailVerdict::pass("PII detection disabled")
                .with_meta("pii_detection_enabled", false);
        }

        let mut detected = BTreeMap::new();
        let mut violations = Vec::new();
        for (kind, re) in PII_PATTERNS.iter() {
            let count = re.find_iter(content).count();
            if count > 0 {
                detected.insert((*kind).to_string(), count);
                violations.push(format!(
                    "{} detected: {count} instances",
                    kind.to_uppercase()
                ));
            }
        }

        let verdict = if violations.is_empty() {
            GuardrailVerdict::pass("PII check passed")
        } else {
            GuardrailVerdict::fail(
                Severity::Critical,
                format!("PII check failed ({} types of PII detected)", violations.len()),
                violations,
            )
        };
        verdict.with_meta("detected_pii", serde_json::json!(detected))
    }
}

#[async_trait]
impl Guardrail for PiiFilter {
    fn name(&self) -> &str {
        "pii_filter"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Profanity
// ============================================================================

#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    strict_mode: bool,
}

impl ProfanityFilter {
    #[must_use]
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    #[must_use]
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.strict_profanity)
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let strict = if self.strict_mode {
            STRICT_PROFANITY_PATTERNS.as_slice()
        } else {
            &[]
        };
        let violations: Vec<String> =
            lowercase_matches(PROFANITY_PATTERNS.iter().chain(strict), content)
                .iter()
                .map(|m| format!("Profanity detected: '{m}'"))
                .collect();

        let verdict = if violations.is_empty() {
            GuardrailVerdict::pass("Profanity check passed")
        } else {
            GuardrailVerdict::fail(
                Severity::Medium,
                format!("Profanity check failed ({} violations)", violations.len()),
                violations,
            )
        };
        verdict.with_meta("strict_mode", self.strict_mode)
    }
}

#[async_trait]
impl Guardrail for ProfanityFilter {
    fn name(&self) -> &str {
        "profanity_filter"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Length
// ============================================================================

/// Bounds content length in characters.
#[derive(Debug, Clone)]
pub struct ContentLengthFilter {
    min_length: usize,
    max_length: usize,
}

impl ContentLengthFilter {
    pub fn new(min_length: usize, max_length: usize) -> Result<Self, ConfigError> {
        if min_length > max_length {
            return Err(ConfigError::InvalidLengthBounds {
                min: min_length,
                max: max_length,
            });
        }
        Ok(Self {
            min_length,
            max_length,
        })
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        Self::new(config.min_length, config.max_length)
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let length = content.chars().count();
        let mut violations = Vec::new();
        if length > self.max_length {
            violations.push(format!("Content too long: {length} > {}", self.max_length));
        }
        if length < self.min_length {
            violations.push(format!("Content too short: {length} < {}", self.min_length));
        }

        let verdict = if violations.is_empty() {
            GuardrailVerdict::pass("Length check passed")
        } else {
            GuardrailVerdict::fail(
                Severity::Medium,
                format!("Length check failed (length: {length})"),
                violations,
            )
        };
        verdict
            .with_meta("content_length", length)
            .with_meta("max_length", self.max_length)
            .with_meta("min_length", self.min_length)
    }
}

#[async_trait]
impl Guardrail for ContentLengthFilter {
    fn name(&self) -> &str {
        "content_length_filter"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the LazyLock regexes compile.
    #[test]
    fn test_builtin_patterns_compile() {
        assert_eq!(TOXIC_PATTERNS.len(), 3);
        assert_eq!(PII_PATTERNS.len(), 4);
        assert_eq!(PROFANITY_PATTERNS.len(), 2);
        assert_eq!(STRICT_PROFANITY_PATTERNS.len(), 1);
    }

    #[test]
    fn test_toxicity_below_threshold_passes_with_violations() {
        let filter = ToxicityFilter::new(0.7).unwrap();
        let verdict = filter.evaluate("I hate mondays");
        assert!(verdict.passed);
        assert_eq!(verdict.message, "Toxicity check passed");
        assert_eq!(verdict.violations, vec!["Toxic language detected: 'hate'"]);
    }

    #[test]
    fn test_toxicity_at_threshold_fails() {
        let filter = ToxicityFilter::new(0.7).unwrap();
        let verdict = filter.evaluate("You STUPID idiot, that was violent");
        assert!(!verdict.passed);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.violations.len(), 3);
        assert_eq!(
            verdict.message,
            "Toxicity check failed (score: 0.90, threshold: 0.7)"
        );
    }

    #[test]
    fn test_toxicity_rejects_bad_threshold() {
        assert!(ToxicityFilter::new(-0.1).is_err());
        assert!(ToxicityFilter::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_pii_detects_each_kind() {
        let filter = PiiFilter::new(true);
        let verdict = filter.evaluate("Mail a@b.io or b@c.org, SSN 123-45-6789");
        assert!(!verdict.passed);
        assert_eq!(verdict.severity, Severity::Critical);
        assert!(verdict.violations.contains(&"EMAIL detected: 2 instances".to_string()));
        assert!(verdict.violations.contains(&"SSN detected: 1 instances".to_string()));
        assert_eq!(verdict.metadata["detected_pii"]["email"], 2);
    }

    #[test]
    fn test_pii_disabled_passes() {
        let verdict = PiiFilter::new(false).evaluate("call 555-123-4567");
        assert!(verdict.passed);
        assert_eq!(verdict.message, "PII detection disabled");
    }

    #[test]
    fn test_pii_clean_content() {
        assert!(PiiFilter::new(true).evaluate("no personal data here").passed);
    }

    #[test]
    fn test_profanity_strict_mode_adds_words() {
        let relaxed = ProfanityFilter::new(false).evaluate("that was dumb");
        assert!(relaxed.passed);

        let strict = ProfanityFilter::new(true).evaluate("that was dumb");
        assert!(!strict.passed);
        assert_eq!(strict.severity, Severity::Medium);
        assert_eq!(strict.violations, vec!["Profanity detected: 'dumb'"]);
    }

    #[test]
    fn test_profanity_word_boundaries() {
        assert!(ProfanityFilter::new(false).evaluate("hello shell").passed);
        assert!(!ProfanityFilter::new(false).evaluate("what the Hell").passed);
    }

    #[test]
    fn test_length_bounds() {
        let filter = ContentLengthFilter::new(1, 5).unwrap();
        assert!(filter.evaluate("abc").passed);

        let long = filter.evaluate("abcdef");
        assert!(!long.passed);
        assert_eq!(long.violations, vec!["Content too long: 6 > 5"]);

        let empty = filter.evaluate("");
        assert_eq!(empty.violations, vec!["Content too short: 0 < 1"]);
        assert_eq!(empty.metadata["content_length"], 0);

        assert!(ContentLengthFilter::new(5, 1).is_err());
    }
}
