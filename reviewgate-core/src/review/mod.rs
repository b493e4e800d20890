//! Human review workflow.
//!
//! This module provides:
//! - `ReviewRequest` and its single-transition status machine
//! - `ReviewQueue`, the only shared mutable state, with exclusive completion
//! - `HumanReviewManager`, the guardrail that enqueues and waits
//! - `ApprovalWorkflow`, a stateless keyword check
//! - `ExpirySweeper`, background timeout and retention
//!
//! ## Constraints
//!
//! - **In-memory storage** - Requests are lost on restart

pub mod approval;
pub mod error;
pub mod manager;
pub mod queue;
pub mod request;
pub mod status;
pub mod sweeper;

pub use approval::ApprovalWorkflow;
pub use error::ReviewError;
pub use manager::{HumanReviewManager, REQUIRES_HUMAN_REVIEW_KEY};
pub use queue::{ReviewQueue, ReviewQueueConfig, SYSTEM_REVIEWER};
pub use request::{REVIEW_ID_PREFIX, ReviewId, ReviewRequest};
pub use status::ReviewStatus;
pub use sweeper::ExpirySweeper;
