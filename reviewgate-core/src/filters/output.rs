//! Response validators.
//!
//! These judge generated text rather than user input: shape, format,
//! completeness and conformance to a typed model.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::LazyLock;

use crate::config::{ConfigError, OutputValidationConfig};
use crate::guardrail::{Context, Guardrail, GuardrailVerdict, Severity};

fn summary(check: &str, violations: &[String]) -> String {
    if violations.is_empty() {
        format!("{check} passed")
    } else {
        format!("{check} failed ({} violations)", violations.len())
    }
}

fn verdict(check: &str, severity: Severity, violations: Vec<String>) -> GuardrailVerdict {
    let message = summary(check, &violations);
    if violations.is_empty() {
        GuardrailVerdict::pass(message)
    } else {
        GuardrailVerdict::fail(severity, message, violations)
    }
}

// ============================================================================
// Structure
// ============================================================================

/// Minimal JSON object schema: required keys plus per-key type names.
///
/// Type names are `string`, `number`, `integer`, `boolean`, `array` and
/// `object`. Unknown names accept any value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureSchema {
    pub required: Vec<String>,
    pub properties: BTreeMap<String, PropertySchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

impl StructureSchema {
    fn violations(&self, value: &Value) -> Vec<String> {
        let Some(object) = value.as_object() else {
            return vec![format!(
                "Expected a JSON object, got {}",
                json_type_name(value)
            )];
        };

        let mut violations: Vec<String> = self
            .required
            .iter()
            .filter(|field| !object.contains_key(field.as_str()))
            .map(|field| format!("Missing required field: {field}"))
            .collect();

        for (field, schema) in &self.properties {
            if let (Some(actual), Some(expected)) = (object.get(field), schema.kind.as_deref())
                && !matches_type(actual, expected)
            {
                violations.push(format!(
                    "Field '{field}' has wrong type: expected {expected}, got {}",
                    json_type_name(actual)
                ));
            }
        }
        violations
    }
}

/// Checks JSON responses against a [`StructureSchema`] and plain text for a
/// proper ending.
#[derive(Debug, Clone, Default)]
pub struct StructureValidator {
    schema: Option<StructureSchema>,
}

impl StructureValidator {
    #[must_use]
    pub fn new(schema: Option<StructureSchema>) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let violations = match serde_json::from_str::<Value>(content) {
            Ok(value) => self
                .schema
                .as_ref()
                .map(|schema| schema.violations(&value))
                .unwrap_or_default(),
            Err(_) => text_structure_violations(content),
        };

        verdict("Structure validation", Severity::Medium, violations)
            .with_meta("has_schema", self.schema.is_some())
    }
}

fn text_structure_violations(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return vec!["Content is empty".to_string()];
    }
    if trimmed.ends_with(['.', '!', '?', ':']) {
        Vec::new()
    } else {
        vec!["Content appears incomplete (no proper ending)".to_string()]
    }
}

#[async_trait]
impl Guardrail for StructureValidator {
    fn name(&self) -> &str {
        "structure_validator"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Format
// ============================================================================

/// Detected response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
    Html,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }

    /// Classifies `content`. JSON wins over markdown, markdown over HTML.
    #[must_use]
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim();
        if trimmed.starts_with('{')
            && trimmed.ends_with('}')
            && serde_json::from_str::<Value>(trimmed).is_ok()
        {
            return Self::Json;
        }
        if MARKDOWN_PATTERNS.iter().any(|re| re.is_match(content)) {
            return Self::Markdown;
        }
        if HTML_TAG.is_match(content) {
            return Self::Html;
        }
        Self::Text
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static MARKDOWN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^#{1,6}\s",
        r"\*\*.*?\*\*",
        r"\*.*?\*",
        r"```",
        r"\[.*?\]\(.*?\)",
    ]
    .into_iter()
    // SAFETY: .expect() on LazyLock with compile-time literal regex patterns.
    .map(|p| Regex::new(p).expect("BUG: built-in markdown regex is invalid"))
    .collect()
});

// SAFETY: .expect() on LazyLock with a compile-time literal regex pattern.
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("BUG: built-in html regex is invalid"));

fn compile_patterns(patterns: &[String], list: &str) -> Result<Vec<(String, Regex)>, ConfigError> {
    patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(|re| (pattern.clone(), re))
                .map_err(|e| ConfigError::InvalidPattern {
                    rule: format!("{list}[{index}]"),
                    message: e.to_string(),
                })
        })
        .collect()
}

/// Restricts response format and enforces required or forbidden patterns.
#[derive(Debug, Clone)]
pub struct FormatValidator {
    allowed: Vec<OutputFormat>,
    required: Vec<(String, Regex)>,
    forbidden: Vec<(String, Regex)>,
}

impl FormatValidator {
    /// An empty `allowed` list accepts every format.
    pub fn new(
        allowed: Vec<OutputFormat>,
        required: &[String],
        forbidden: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            allowed,
            required: compile_patterns(required, "output.required_patterns")?,
            forbidden: compile_patterns(forbidden, "output.forbidden_patterns")?,
        })
    }

    pub fn from_config(config: &OutputValidationConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.allowed_formats.clone(),
            &config.required_patterns,
            &config.forbidden_patterns,
        )
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let detected = OutputFormat::detect(content);
        let mut violations = Vec::new();

        if !self.allowed.is_empty() && !self.allowed.contains(&detected) {
            let allowed: Vec<&str> = self.allowed.iter().map(|f| f.as_str()).collect();
            violations.push(format!(
                "Format '{detected}' not allowed. Allowed: {}",
                allowed.join(", ")
            ));
        }
        for (pattern, re) in &self.required {
            if !re.is_match(content) {
                violations.push(format!("Required pattern missing: {pattern}"));
            }
        }
        for (pattern, re) in &self.forbidden {
            if re.is_match(content) {
                violations.push(format!("Forbidden pattern found: {pattern}"));
            }
        }

        verdict("Format validation", Severity::Medium, violations)
            .with_meta("detected_format", detected.as_str())
    }
}

#[async_trait]
impl Guardrail for FormatValidator {
    fn name(&self) -> &str {
        "format_validator"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Completeness
// ============================================================================

const TRUNCATION_MARKERS: &[&str] = &["...", "[truncated]", "[continued]", "and more"];

/// Trailing text after the last period longer than this looks cut off.
const DANGLING_SENTENCE_CHARS: usize = 50;

/// Flags responses that are too short, too long or look cut off.
#[derive(Debug, Clone)]
pub struct CompletenessValidator {
    min_length: usize,
    max_length: usize,
}

impl CompletenessValidator {
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

    pub fn from_config(config: &OutputValidationConfig) -> Result<Self, ConfigError> {
        Self::new(config.min_length, config.max_length)
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let length = content.trim().chars().count();
        let mut violations = Vec::new();

        if length < self.min_length {
            violations.push(format!("Response too short: {length} < {}", self.min_length));
        }
        if length > self.max_length {
            violations.push(format!("Response too long: {length} > {}", self.max_length));
        }

        let lowered = content.to_lowercase();
        violations.extend(
            TRUNCATION_MARKERS
                .iter()
                .filter(|m| lowered.contains(*m))
                .map(|m| format!("Response appears truncated: contains '{m}'")),
        );

        if content.matches("```").count() % 2 != 0 {
            violations.push("Response contains unclosed code blocks".to_string());
        }

        if let Some((_, tail)) = content.rsplit_once('.') {
            let tail = tail.trim();
            if tail.chars().count() > DANGLING_SENTENCE_CHARS {
                violations.push("Response may end with incomplete sentence".to_string());
            }
        }

        verdict("Completeness validation", Severity::Medium, violations)
            .with_meta("content_length", length)
            .with_meta("min_length", self.min_length)
            .with_meta("max_length", self.max_length)
    }
}

#[async_trait]
impl Guardrail for CompletenessValidator {
    fn name(&self) -> &str {
        "completeness_validator"
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}

// ============================================================================
// Typed Model
// ============================================================================

/// Checks that a response deserializes into `T`.
///
/// JSON responses are decoded as JSON; anything else is offered to `T` as a
/// bare string.
pub struct ModelValidator<T> {
    name: String,
    model: &'static str,
    _model: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ModelValidator<T> {
    #[must_use]
    pub fn new() -> Self {
        let full = std::any::type_name::<T>();
        let model = full.rsplit("::").next().unwrap_or(full);
        Self {
            name: format!("model_validator_{model}"),
            model,
            _model: PhantomData,
        }
    }

    /// Decodes `content` into `T`.
    pub fn parse(content: &str) -> Result<T, serde_json::Error> {
        let value = serde_json::from_str::<Value>(content)
            .unwrap_or_else(|_| Value::String(content.to_string()));
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn evaluate(&self, content: &str) -> GuardrailVerdict {
        let violations = match Self::parse(content) {
            Ok(_) => Vec::new(),
            Err(e) => vec![format!("Validation error: {e}")],
        };
        verdict("Model validation", Severity::High, violations).with_meta("model", self.model)
    }
}

impl<T: DeserializeOwned> Default for ModelValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ModelValidator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelValidator")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl<T: DeserializeOwned + 'static> Guardrail for ModelValidator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, content: &str, _context: &Context) -> GuardrailVerdict {
        self.evaluate(content)
    }
}
