//! reviewgate core: guardrail checks around language-model calls.
//!
//! This library provides the guardrail interface and chain, stateless regex
//! content filters and business rules, configuration, and the human review
//! workflow: a bounded in-memory queue, a manager that waits for reviewer
//! decisions with a deadline, and a background expiry sweeper.
//!
//! The model call and any workflow engine around it are the caller's concern.

pub mod config;
pub mod filters;
pub mod guardrail;
pub mod review;

pub use config::{ConfigError, GatewayConfig, HumanReviewConfig};
pub use guardrail::{Context, Guardrail, GuardrailChain, GuardrailVerdict, NamedVerdict, Severity};
pub use review::{
    ApprovalWorkflow, HumanReviewManager, ReviewError, ReviewId, ReviewQueue, ReviewRequest,
    ReviewStatus,
};
