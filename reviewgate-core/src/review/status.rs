//! Review lifecycle status.

use serde::{Deserialize, Serialize};

// ============================================================================
// Review Status
// ============================================================================

/// Lifecycle status of a review request.
///
/// State machine transitions (each request moves at most once):
/// - Pending → Approved (reviewer approved)
/// - Pending → Rejected (reviewer rejected)
/// - Pending → Escalated (reviewer escalated)
/// - Pending → TimedOut (deadline passed before any decision)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting a reviewer decision
    Pending,
    /// Reviewer approved the content
    Approved,
    /// Reviewer rejected the content
    Rejected,
    /// Reviewer escalated the content for further review
    Escalated,
    /// No decision arrived before `timeout_at`
    TimedOut,
}

impl ReviewStatus {
    /// Returns true if this is a terminal state.
    ///
    /// Terminal states are immutable.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Checks if a transition from this status to another is valid.
    #[must_use]
    pub fn can_transition_to(&self, to: ReviewStatus) -> bool {
        matches!(self, Self::Pending) && to.is_terminal()
    }

    /// Returns the wire name of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
