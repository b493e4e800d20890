//! Human review guardrail.
//!
//! [`HumanReviewManager`] decides whether content needs a human decision,
//! enqueues a [`ReviewRequest`] when it does, and waits until a reviewer
//! resolves it or its deadline passes.
//!
//! # Wait protocol
//!
//! The waiter subscribes to the request's completion notifier before every
//! status read, then sleeps until one of:
//! - the queue signals completion
//! - a poll tick (`poll_interval`) elapses
//! - the request's `timeout_at` is reached
//! - the caller's cancellation token fires
//!
//! At the deadline the manager completes the request as `TimedOut` through the
//! same locked path reviewers use. If a reviewer got there first, the
//! reviewer's decision is reported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::ReviewError;
use super::queue::{ReviewQueue, SYSTEM_REVIEWER};
use super::request::{ReviewId, ReviewRequest};
use super::status::ReviewStatus;
use super::sweeper::ExpirySweeper;
use crate::config::{ConfigError, HumanReviewConfig};
use crate::guardrail::{Context, Guardrail, GuardrailVerdict, Severity, context_flag};

/// Context key that forces review regardless of content.
pub const REQUIRES_HUMAN_REVIEW_KEY: &str = "requires_human_review";

/// Guardrail that routes risky content to a human reviewer.
#[derive(Debug)]
pub struct HumanReviewManager {
    config: HumanReviewConfig,
    /// Lowercased copy of `config.high_risk_keywords`
    keywords: Vec<String>,
    enabled: AtomicBool,
    queue: Arc<ReviewQueue>,
    shutdown: CancellationToken,
}

impl HumanReviewManager {
    /// Creates a manager with its own queue.
    pub fn new(config: HumanReviewConfig) -> Result<Self, ConfigError> {
        let queue = Arc::new(ReviewQueue::new(config.queue_config()));
        Self::with_queue(config, queue)
    }

    /// Creates a manager that shares an existing queue.
    ///
    /// The queue keeps its own capacity and retention settings.
    pub fn with_queue(
        config: HumanReviewConfig,
        queue: Arc<ReviewQueue>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let keywords = config
            .high_risk_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            enabled: AtomicBool::new(config.enabled),
            keywords,
            config,
            queue,
            shutdown: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &HumanReviewConfig {
        &self.config
    }

    /// The queue reviewers act on.
    #[must_use]
    pub fn queue(&self) -> &Arc<ReviewQueue> {
        &self.queue
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
        info!("Human review enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        info!("Human review disabled");
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancels every wait started through [`Guardrail::check`] and stops the sweeper.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Starts an [`ExpirySweeper`] on this manager's queue.
    ///
    /// The sweeper stops when the manager shuts down.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        ExpirySweeper::new(
            self.queue.clone(),
            self.config.sweep_interval,
            self.shutdown.child_token(),
        )
        .spawn()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Review decision
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns true if `content` must be seen by a human.
    ///
    /// Triggered by the `requires_human_review` context flag, by any high-risk
    /// keyword (case-insensitive substring), or by content longer than
    /// `max_content_length` characters.
    #[must_use]
    pub fn review_required(&self, content: &str, context: &Context) -> bool {
        if context_flag(context, REQUIRES_HUMAN_REVIEW_KEY) {
            return true;
        }

        let lowered = content.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return true;
        }

        content.chars().count() > self.config.max_content_length
    }

    /// Runs the review check, giving up when `cancel` fires.
    ///
    /// Cancellation returns [`ReviewError::Cancelled`]. A token that has
    /// already fired enqueues nothing; a wait cancelled midway leaves the
    /// request `Pending` for the sweeper to time out.
    pub async fn check_with_cancellation(
        &self,
        content: &str,
        context: &Context,
        cancel: &CancellationToken,
    ) -> Result<GuardrailVerdict, ReviewError> {
        if !self.is_enabled() {
            return Ok(GuardrailVerdict::pass("Human review disabled")
                .with_meta("human_review_enabled", false));
        }

        if !self.review_required(content, context) {
            return Ok(GuardrailVerdict::pass("No human review required")
                .with_meta("review_required", false));
        }

        let request = ReviewRequest::new(content, context.clone(), self.config.timeout);
        let request_id = request.id.clone();

        if cancel.is_cancelled() {
            debug!(request_id = %request_id, "Review skipped, already cancelled");
            return Err(ReviewError::Cancelled { request_id });
        }

        match self.queue.add(request) {
            Ok(_) => {
                info!(
                    request_id = %request_id,
                    timeout_seconds = self.config.timeout.as_secs(),
                    "Review request queued"
                );
            }
            Err(ReviewError::QueueFull { capacity }) => {
                warn!(capacity, "Review queue full, failing check");
                return Ok(GuardrailVerdict::fail(
                    Severity::High,
                    "Review queue full - cannot process request",
                    vec!["Review queue at capacity".to_string()],
                )
                .with_meta("review_required", true)
                .with_meta("queue_full", true));
            }
            Err(e) => return Err(e),
        }

        let decided = self.wait_for_decision(&request_id, cancel).await?;
        Ok(self.verdict_for(&decided))
    }

    async fn wait_for_decision(
        &self,
        request_id: &ReviewId,
        cancel: &CancellationToken,
    ) -> Result<Arc<ReviewRequest>, ReviewError> {
        loop {
            let notify = self.queue.subscribe(request_id);
            // Created before the status read so a completion in between is not missed
            let notified = notify.as_ref().map(|n| n.notified());

            let current = self
                .queue
                .get(request_id)
                .ok_or_else(|| ReviewError::NotFound {
                    request_id: request_id.clone(),
                })?;
            if current.status.is_terminal() {
                return Ok(current);
            }

            let remaining = current.remaining();
            if remaining.is_zero() {
                return self.expire(request_id);
            }
            let tick = remaining.min(self.config.poll_interval);

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(request_id = %request_id, "Review wait cancelled");
                    return Err(ReviewError::Cancelled {
                        request_id: request_id.clone(),
                    });
                }
                () = async move {
                    match notified {
                        Some(notified) => notified.await,
                        None => std::future::pending().await,
                    }
                } => {}
                () = tokio::time::sleep(tick) => {
                    debug!(request_id = %request_id, "Review poll tick");
                }
            }
        }
    }

    /// Times out `request_id`, or returns whatever decision beat us to it.
    fn expire(&self, request_id: &ReviewId) -> Result<Arc<ReviewRequest>, ReviewError> {
        match self
            .queue
            .complete(request_id, ReviewStatus::TimedOut, SYSTEM_REVIEWER, None)
        {
            Ok(request) => {
                warn!(request_id = %request_id, "Review request timed out");
                Ok(request)
            }
            Err(ReviewError::AlreadyTerminal { .. }) => {
                self.queue
                    .get(request_id)
                    .ok_or_else(|| ReviewError::NotFound {
                        request_id: request_id.clone(),
                    })
            }
            Err(e) => Err(e),
        }
    }

    fn verdict_for(&self, request: &ReviewRequest) -> GuardrailVerdict {
        debug_assert!(
            request.status.is_terminal(),
            "verdict requested for pending review {}",
            request.id
        );
        let notes = request
            .review_notes
            .as_deref()
            .map_or(Value::Null, Value::from);
        let reviewer = request.reviewer.as_deref().map_or(Value::Null, Value::from);

        let verdict = match request.status {
            ReviewStatus::Approved => GuardrailVerdict::pass("Content approved by human reviewer"),
            ReviewStatus::Rejected => GuardrailVerdict::fail(
                Severity::High,
                "Content rejected by human reviewer",
                vec![format!(
                    "Rejected: {}",
                    request.review_notes.as_deref().unwrap_or("No reason provided")
                )],
            ),
            ReviewStatus::Escalated => GuardrailVerdict::fail(
                Severity::Critical,
                "Content escalated for further review",
                vec!["Content requires escalated review".to_string()],
            ),
            ReviewStatus::Pending => {
                warn!(request_id = %request.id, "Verdict requested for undecided review");
                return GuardrailVerdict::fail(
                    Severity::High,
                    "Human review undecided",
                    vec!["Review request has no decision".to_string()],
                )
                .with_meta("request_id", request.id.as_str());
            }
            ReviewStatus::TimedOut => {
                return GuardrailVerdict::fail(
                    Severity::High,
                    "Human review timeout",
                    vec!["Review request timed out".to_string()],
                )
                .with_meta("request_id", request.id.as_str())
                .with_meta("timeout_seconds", self.config.timeout.as_secs());
            }
        };

        verdict
            .with_meta("request_id", request.id.as_str())
            .with_meta("reviewer", reviewer)
            .with_meta("review_notes", notes)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reviewer interface
    // ─────────────────────────────────────────────────────────────────────────

    /// Pending requests in arrival order.
    #[must_use]
    pub fn get_pending_reviews(&self) -> Vec<Arc<ReviewRequest>> {
        self.queue.get_pending()
    }

    /// Looks up a request, outstanding or completed.
    #[must_use]
    pub fn get_request(&self, request_id: &ReviewId) -> Option<Arc<ReviewRequest>> {
        self.queue.get(request_id)
    }

    /// Approves a pending request. Returns false for unknown or already decided IDs.
    pub fn approve_request(&self, request_id: &ReviewId, reviewer: &str, notes: Option<&str>) -> bool {
        self.decide(request_id, ReviewStatus::Approved, reviewer, notes)
    }

    /// Rejects a pending request. Returns false for unknown or already decided IDs.
    pub fn reject_request(&self, request_id: &ReviewId, reviewer: &str, notes: Option<&str>) -> bool {
        self.decide(request_id, ReviewStatus::Rejected, reviewer, notes)
    }

    /// Escalates a pending request. Returns false for unknown or already decided IDs.
    pub fn escalate_request(
        &self,
        request_id: &ReviewId,
        reviewer: &str,
        notes: Option<&str>,
    ) -> bool {
        self.decide(request_id, ReviewStatus::Escalated, reviewer, notes)
    }

    fn decide(
        &self,
        request_id: &ReviewId,
        status: ReviewStatus,
        reviewer: &str,
        notes: Option<&str>,
    ) -> bool {
        match self
            .queue
            .complete(request_id, status, reviewer, notes.map(str::to_string))
        {
            Ok(_) => true,
            Err(e) => {
                debug!(request_id = %request_id, %status, error = %e, "Review decision ignored");
                false
            }
        }
    }
}

#[async_trait]
impl Guardrail for HumanReviewManager {
    fn name(&self) -> &str {
        "human_review_manager"
    }

    async fn check(&self, content: &str, context: &Context) -> GuardrailVerdict {
        match self
            .check_with_cancellation(content, context, &self.shutdown)
            .await
        {
            Ok(verdict) => verdict,
            Err(ReviewError::Cancelled { request_id }) => GuardrailVerdict::fail(
                Severity::High,
                "Human review cancelled",
                vec!["Review wait cancelled before a decision".to_string()],
            )
            .with_meta("request_id", request_id.as_str())
            .with_meta("cancelled", true),
            Err(e) => GuardrailVerdict::fail(
                Severity::High,
                "Human review failed",
                vec![e.to_string()],
            ),
        }
    }
}
