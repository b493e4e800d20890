//! Review queue operation errors.

use thiserror::Error;

use super::request::ReviewId;
use super::status::ReviewStatus;

// ============================================================================
// Review Errors
// ============================================================================

/// Errors that can occur during review queue operations.
///
/// None of these escape [`HumanReviewManager::check`](super::HumanReviewManager::check):
/// the manager turns them into verdicts or boolean results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// No request with this ID is known to the queue.
    #[error("Review request '{request_id}' not found")]
    NotFound {
        /// The request ID that was not found
        request_id: ReviewId,
    },

    /// The request already left `Pending`.
    #[error("Review request '{request_id}' is already in terminal state '{status}'")]
    AlreadyTerminal {
        /// The request ID
        request_id: ReviewId,
        /// The status the first completion set
        status: ReviewStatus,
    },

    /// The requested status is not a valid completion target.
    #[error("Invalid transition for review request '{request_id}': {from} -> {to}")]
    InvalidTransition {
        /// The request ID
        request_id: ReviewId,
        /// Current status
        from: ReviewStatus,
        /// Attempted new status
        to: ReviewStatus,
    },

    /// Outstanding requests are at the configured maximum.
    #[error("Review queue at capacity ({capacity} outstanding requests)")]
    QueueFull {
        /// Configured maximum outstanding requests
        capacity: usize,
    },

    /// A request with this ID was already added.
    #[error("Review request '{request_id}' already exists")]
    DuplicateId {
        /// The colliding request ID
        request_id: ReviewId,
    },

    /// The waiting caller was cancelled before a decision arrived.
    ///
    /// The request itself is left `Pending`.
    #[error("Wait for review request '{request_id}' was cancelled")]
    Cancelled {
        /// The request that was being waited on
        request_id: ReviewId,
    },
}

impl ReviewError {
    /// Returns true for the errors reviewer tooling sees on stale or mistyped IDs.
    #[must_use]
    pub fn is_unknown_or_terminal(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AlreadyTerminal { .. })
    }
}
