//! Simulated human reviewer.
//!
//! Stands in for an operator console: polls the manager's pending requests and
//! answers each one according to a [`ReviewerPolicy`].

use std::sync::Arc;
use std::time::Duration;

use reviewgate_core::review::{HumanReviewManager, ReviewRequest, ReviewStatus};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Interval between pending-queue scans.
const SCAN_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    Escalate,
}

/// How the simulated reviewer picks a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewerPolicy {
    /// Escalate destructive requests, reject toxic ones, approve the rest
    ByContent,
    Always(Decision),
    /// Never answer
    Absent,
}

impl ReviewerPolicy {
    /// Decision and notes for `content`, or `None` to leave it pending.
    #[must_use]
    pub fn decide(&self, content: &str) -> Option<(Decision, &'static str)> {
        match self {
            Self::Absent => None,
            Self::Always(Decision::Approve) => Some((Decision::Approve, "Approved by operator")),
            Self::Always(Decision::Reject) => Some((Decision::Reject, "Rejected by operator")),
            Self::Always(Decision::Escalate) => {
                Some((Decision::Escalate, "Escalated by operator"))
            }
            Self::ByContent => {
                let lowered = content.to_lowercase();
                let has_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));
                Some(if has_any(&["delete", "ban", "remove"]) {
                    (
                        Decision::Escalate,
                        "Sensitive operation requires manager approval",
                    )
                } else if has_any(&["hate", "stupid", "idiot"]) {
                    (Decision::Reject, "Content violates community guidelines")
                } else {
                    (Decision::Approve, "Content approved after human review")
                })
            }
        }
    }
}

pub struct SimulatedReviewer {
    manager: Arc<HumanReviewManager>,
    name: String,
    policy: ReviewerPolicy,
    delay: Duration,
}

impl SimulatedReviewer {
    #[must_use]
    pub fn new(
        manager: Arc<HumanReviewManager>,
        name: impl Into<String>,
        policy: ReviewerPolicy,
        delay: Duration,
    ) -> Self {
        Self {
            manager,
            name: name.into(),
            policy,
            delay,
        }
    }

    /// Answers one request. Returns the resulting status if the decision landed.
    pub fn review(&self, request: &ReviewRequest) -> Option<ReviewStatus> {
        let (decision, notes) = self.policy.decide(&request.content)?;
        let (landed, status) = match decision {
            Decision::Approve => (
                self.manager
                    .approve_request(&request.id, &self.name, Some(notes)),
                ReviewStatus::Approved,
            ),
            Decision::Reject => (
                self.manager
                    .reject_request(&request.id, &self.name, Some(notes)),
                ReviewStatus::Rejected,
            ),
            Decision::Escalate => (
                self.manager
                    .escalate_request(&request.id, &self.name, Some(notes)),
                ReviewStatus::Escalated,
            ),
        };

        if landed {
            info!(request_id = %request.id, %status, reviewer = %self.name, "Simulated review");
            Some(status)
        } else {
            debug!(request_id = %request.id, "Request already resolved");
            None
        }
    }

    /// Scans the pending queue until `cancel` fires.
    ///
    /// Each request is answered `delay` after the reviewer first sees it.
    pub async fn run(self, cancel: CancellationToken) {
        if self.policy == ReviewerPolicy::Absent {
            cancel.cancelled().await;
            return;
        }

        loop {
            let pending = self.manager.get_pending_reviews();
            if !pending.is_empty() {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(self.delay) => {}
                }
                for request in &pending {
                    self.review(request);
                }
            }

            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(SCAN_INTERVAL) => {}
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
