//! In-memory review queue with exclusive completion.
//!
//! All queue state sits behind a single lock, so moving a request from the
//! outstanding set to the completed set is one indivisible step. Reviewer
//! decisions, the manager's own timeout and background expiry sweeps all go
//! through [`ReviewQueue::complete`]; the first caller wins and every later
//! attempt on the same ID fails with [`ReviewError::AlreadyTerminal`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::error::ReviewError;
use super::request::{ReviewId, ReviewRequest};
use super::status::ReviewStatus;

/// Reviewer name recorded on requests that expire without a decision.
pub const SYSTEM_REVIEWER: &str = "system";

// ============================================================================
// Review Queue Configuration
// ============================================================================

/// Configuration for the review queue.
#[derive(Debug, Clone)]
pub struct ReviewQueueConfig {
    /// Maximum outstanding (pending) requests
    pub max_queue_size: usize,
    /// How long completed requests stay available for lookup
    pub completed_retention: Duration,
}

impl Default for ReviewQueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            completed_retention: Duration::from_secs(3600), // 1 hour
        }
    }
}

// ============================================================================
// Review Queue
// ============================================================================

/// Outstanding request plus the notifier its waiters subscribe to.
#[derive(Debug)]
struct OutstandingEntry {
    request: Arc<ReviewRequest>,
    notify: Arc<Notify>,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Arrival sequence for the next insert
    next_seq: u64,
    /// Outstanding requests keyed by arrival sequence (FIFO iteration)
    outstanding: BTreeMap<u64, OutstandingEntry>,
    /// Request ID -> arrival sequence, for outstanding requests only
    index: HashMap<ReviewId, u64>,
    /// Completed requests
    completed: HashMap<ReviewId, Arc<ReviewRequest>>,
}

/// Queue of outstanding and completed review requests.
///
/// Requests are stored as `Arc<ReviewRequest>` so reads hand out cheap
/// snapshots. Mutation uses `Arc::make_mut` under the queue lock.
pub struct ReviewQueue {
    state: Mutex<QueueState>,
    config: ReviewQueueConfig,
}

impl std::fmt::Debug for ReviewQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReviewQueue")
            .field("outstanding", &state.outstanding.len())
            .field("completed", &state.completed.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for ReviewQueue {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ReviewQueue {
    /// Creates a new queue with the given configuration.
    #[must_use]
    pub fn new(config: ReviewQueueConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            config,
        }
    }

    /// Creates a new queue with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ReviewQueueConfig::default())
    }

    /// Returns the queue configuration.
    #[must_use]
    pub fn config(&self) -> &ReviewQueueConfig {
        &self.config
    }

    /// Returns the number of outstanding requests.
    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.state.lock().outstanding.len()
    }

    /// Returns the number of completed requests still retained.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.state.lock().completed.len()
    }

    /// Adds a pending request to the outstanding set.
    ///
    /// Fails with [`ReviewError::QueueFull`] when the outstanding set is at
    /// capacity and with [`ReviewError::DuplicateId`] if the ID is already
    /// known. An existing request is never overwritten.
    pub fn add(&self, request: ReviewRequest) -> Result<Arc<ReviewRequest>, ReviewError> {
        let mut state = self.state.lock();

        if state.index.contains_key(&request.id) || state.completed.contains_key(&request.id) {
            return Err(ReviewError::DuplicateId {
                request_id: request.id,
            });
        }

        if state.outstanding.len() >= self.config.max_queue_size {
            warn!(
                request_id = %request.id,
                capacity = self.config.max_queue_size,
                "Review queue at capacity"
            );
            return Err(ReviewError::QueueFull {
                capacity: self.config.max_queue_size,
            });
        }

        if request.status.is_terminal() {
            return Err(ReviewError::AlreadyTerminal {
                request_id: request.id,
                status: request.status,
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;

        let request = Arc::new(request);
        state.index.insert(request.id.clone(), seq);
        state.outstanding.insert(
            seq,
            OutstandingEntry {
                request: request.clone(),
                notify: Arc::new(Notify::new()),
            },
        );

        debug!(
            request_id = %request.id,
            outstanding = state.outstanding.len(),
            "Review request queued"
        );

        Ok(request)
    }

    /// Returns all pending requests in arrival order.
    #[must_use]
    pub fn get_pending(&self) -> Vec<Arc<ReviewRequest>> {
        self.state
            .lock()
            .outstanding
            .values()
            .filter(|entry| entry.request.status == ReviewStatus::Pending)
            .map(|entry| entry.request.clone())
            .collect()
    }

    /// Looks a request up in the outstanding set, then the completed set.
    #[must_use]
    pub fn get(&self, request_id: &ReviewId) -> Option<Arc<ReviewRequest>> {
        let state = self.state.lock();
        if let Some(seq) = state.index.get(request_id)
            && let Some(entry) = state.outstanding.get(seq)
        {
            return Some(entry.request.clone());
        }
        state.completed.get(request_id).cloned()
    }

    /// Returns the notifier fired when this request completes.
    ///
    /// Returns `None` once the request has left the outstanding set. Waiters
    /// must create the `notified()` future before re-reading the status so a
    /// completion between the two steps is not missed.
    #[must_use]
    pub fn subscribe(&self, request_id: &ReviewId) -> Option<Arc<Notify>> {
        let state = self.state.lock();
        let seq = state.index.get(request_id)?;
        state.outstanding.get(seq).map(|entry| entry.notify.clone())
    }

    /// Moves a pending request to a terminal status.
    ///
    /// This is the single mutation point of the queue. The read, the status
    /// change and the move to the completed set happen under one lock hold,
    /// so at most one caller per ID ever succeeds.
    pub fn complete(
        &self,
        request_id: &ReviewId,
        status: ReviewStatus,
        reviewer: impl Into<String>,
        notes: Option<String>,
    ) -> Result<Arc<ReviewRequest>, ReviewError> {
        let mut state = self.state.lock();
        let completed = Self::complete_locked(&mut state, request_id, status, reviewer.into(), notes)?;

        info!(
            request_id = %request_id,
            status = %completed.status,
            reviewer = completed.reviewer.as_deref().unwrap_or_default(),
            "Review request completed"
        );

        Ok(completed)
    }

    fn complete_locked(
        state: &mut QueueState,
        request_id: &ReviewId,
        status: ReviewStatus,
        reviewer: String,
        notes: Option<String>,
    ) -> Result<Arc<ReviewRequest>, ReviewError> {
        let Some(&seq) = state.index.get(request_id) else {
            if let Some(done) = state.completed.get(request_id) {
                return Err(ReviewError::AlreadyTerminal {
                    request_id: request_id.clone(),
                    status: done.status,
                });
            }
            return Err(ReviewError::NotFound {
                request_id: request_id.clone(),
            });
        };

        let entry = state
            .outstanding
            .get_mut(&seq)
            .ok_or_else(|| ReviewError::NotFound {
                request_id: request_id.clone(),
            })?;

        // Validate before make_mut so a rejected call never clones
        if !entry.request.status.can_transition_to(status) {
            return Err(if entry.request.status.is_terminal() {
                ReviewError::AlreadyTerminal {
                    request_id: request_id.clone(),
                    status: entry.request.status,
                }
            } else {
                ReviewError::InvalidTransition {
                    request_id: request_id.clone(),
                    from: entry.request.status,
                    to: status,
                }
            });
        }
        Arc::make_mut(&mut entry.request).resolve(status, reviewer, notes)?;

        let Some(entry) = state.outstanding.remove(&seq) else {
            return Err(ReviewError::NotFound {
                request_id: request_id.clone(),
            });
        };
        state.index.remove(request_id);
        state
            .completed
            .insert(request_id.clone(), entry.request.clone());
        entry.notify.notify_waiters();

        Ok(entry.request)
    }

    /// Times out every outstanding request whose deadline has passed.
    ///
    /// Returns the newly expired requests.
    pub fn cleanup_expired(&self) -> Vec<Arc<ReviewRequest>> {
        self.expire_overdue_at(Utc::now())
    }

    /// Times out every outstanding request whose `timeout_at` is before `horizon`.
    ///
    /// Uses the same locked completion path as reviewer decisions, so a
    /// request decided concurrently is never also timed out.
    pub fn expire_overdue_at(&self, horizon: DateTime<Utc>) -> Vec<Arc<ReviewRequest>> {
        let mut state = self.state.lock();

        let to_expire: Vec<ReviewId> = state
            .outstanding
            .values()
            .filter(|entry| {
                entry.request.status == ReviewStatus::Pending
                    && entry.request.is_expired_at(horizon)
            })
            .map(|entry| entry.request.id.clone())
            .collect();

        let mut expired = Vec::with_capacity(to_expire.len());
        for request_id in to_expire {
            match Self::complete_locked(
                &mut state,
                &request_id,
                ReviewStatus::TimedOut,
                SYSTEM_REVIEWER.to_string(),
                None,
            ) {
                Ok(request) => {
                    warn!(
                        request_id = %request_id,
                        age_seconds = (horizon - request.created_at).num_seconds(),
                        "Review request expired"
                    );
                    expired.push(request);
                }
                Err(e) => {
                    debug!(request_id = %request_id, error = %e, "Skipped expiry");
                }
            }
        }

        expired
    }

    /// Removes completed requests older than the retention period.
    ///
    /// Returns the number of requests removed.
    pub fn cleanup_completed(&self) -> usize {
        self.prune_completed_before(
            Utc::now()
                - chrono::Duration::from_std(self.config.completed_retention).unwrap_or_default(),
        )
    }

    /// Removes completed requests reviewed before `cutoff`.
    pub fn prune_completed_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut state = self.state.lock();
        let before = state.completed.len();
        state
            .completed
            .retain(|_, request| request.reviewed_at.is_none_or(|at| at >= cutoff));
        before - state.completed.len()
    }

    /// Returns where a request currently lives.
    ///
    /// Exposed for testing the outstanding/completed partition.
    #[cfg(test)]
    pub(super) fn location(&self, request_id: &ReviewId) -> (bool, bool) {
        let state = self.state.lock();
        let outstanding = state
            .index
            .get(request_id)
            .is_some_and(|seq| state.outstanding.contains_key(seq));
        (outstanding, state.completed.contains_key(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::Context;

    fn request(content: &str) -> ReviewRequest {
        ReviewRequest::new(content, Context::new(), Duration::from_secs(60))
    }

    fn queue_with_capacity(max_queue_size: usize) -> ReviewQueue {
        ReviewQueue::new(ReviewQueueConfig {
            max_queue_size,
            ..Default::default()
        })
    }

    #[test]
    fn test_add_and_get_pending_in_arrival_order() {
        let queue = ReviewQueue::with_defaults();
        let ids: Vec<ReviewId> = ["a", "b", "c"]
            .iter()
            .map(|c| queue.add(request(c)).unwrap().id.clone())
            .collect();

        let pending: Vec<ReviewId> = queue.get_pending().iter().map(|r| r.id.clone()).collect();
        assert_eq!(pending, ids);
        assert_eq!(queue.outstanding_count(), 3);
        assert_eq!(queue.completed_count(), 0);
    }

    #[test]
    fn test_add_rejects_when_full() {
        let queue = queue_with_capacity(2);
        queue.add(request("a")).unwrap();
        queue.add(request("b")).unwrap();

        let err = queue.add(request("c")).unwrap_err();
        assert_eq!(err, ReviewError::QueueFull { capacity: 2 });
        assert_eq!(queue.outstanding_count(), 2);
    }

    #[test]
    fn test_add_frees_capacity_after_completion() {
        let queue = queue_with_capacity(1);
        let first = queue.add(request("a")).unwrap();
        assert!(queue.add(request("b")).is_err());

        queue
            .complete(&first.id, ReviewStatus::Approved, "r1", None)
            .unwrap();
        assert!(queue.add(request("b")).is_ok());
    }

    #[test]
    fn test_add_never_overwrites_existing_id() {
        let queue = ReviewQueue::with_defaults();
        let id = ReviewId::from_raw("rv_fixed");
        queue
            .add(ReviewRequest::with_id(
                id.clone(),
                "original",
                Context::new(),
                Duration::from_secs(60),
            ))
            .unwrap();

        let err = queue
            .add(ReviewRequest::with_id(
                id.clone(),
                "replacement",
                Context::new(),
                Duration::from_secs(60),
            ))
            .unwrap_err();
        assert_eq!(err, ReviewError::DuplicateId { request_id: id.clone() });
        assert_eq!(queue.get(&id).unwrap().content, "original");

        // Still a duplicate after it moves to completed
        queue.complete(&id, ReviewStatus::Rejected, "r1", None).unwrap();
        assert!(matches!(
            queue.add(ReviewRequest::with_id(
                id.clone(),
                "again",
                Context::new(),
                Duration::from_secs(60),
            )),
            Err(ReviewError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_complete_moves_request_to_completed() {
        let queue = ReviewQueue::with_defaults();
        let added = queue.add(request("delete it")).unwrap();
        assert_eq!(queue.location(&added.id), (true, false));

        let done = queue
            .complete(&added.id, ReviewStatus::Approved, "r1", Some("ok".into()))
            .unwrap();
        assert_eq!(done.status, ReviewStatus::Approved);
        assert_eq!(done.reviewer.as_deref(), Some("r1"));
        assert_eq!(done.review_notes.as_deref(), Some("ok"));
        assert!(done.reviewed_at.is_some());

        assert_eq!(queue.location(&added.id), (false, true));
        assert!(queue.get_pending().is_empty());
        assert_eq!(queue.get(&added.id).unwrap().status, ReviewStatus::Approved);

        // The snapshot handed out by add() is not mutated
        assert_eq!(added.status, ReviewStatus::Pending);
    }

    #[test]
    fn test_second_complete_fails_and_keeps_first_decision() {
        let queue = ReviewQueue::with_defaults();
        let added = queue.add(request("ban the user")).unwrap();

        let first = queue
            .complete(&added.id, ReviewStatus::Rejected, "r1", Some("no".into()))
            .unwrap();
        let err = queue
            .complete(&added.id, ReviewStatus::Approved, "r2", Some("yes".into()))
            .unwrap_err();
        assert_eq!(
            err,
            ReviewError::AlreadyTerminal {
                request_id: added.id.clone(),
                status: ReviewStatus::Rejected,
            }
        );

        let stored = queue.get(&added.id).unwrap();
        assert_eq!(stored.status, ReviewStatus::Rejected);
        assert_eq!(stored.reviewer.as_deref(), Some("r1"));
        assert_eq!(stored.review_notes.as_deref(), Some("no"));
        assert_eq!(stored.reviewed_at, first.reviewed_at);
    }

    #[test]
    fn test_complete_unknown_id() {
        let queue = ReviewQueue::with_defaults();
        let id = ReviewId::from_raw("rv_missing");
        assert_eq!(
            queue
                .complete(&id, ReviewStatus::Approved, "r1", None)
                .unwrap_err(),
            ReviewError::NotFound { request_id: id }
        );
    }

    #[test]
    fn test_complete_with_pending_status_is_rejected() {
        let queue = ReviewQueue::with_defaults();
        let added = queue.add(request("x")).unwrap();
        assert!(matches!(
            queue.complete(&added.id, ReviewStatus::Pending, "r1", None),
            Err(ReviewError::InvalidTransition { .. })
        ));
        assert_eq!(queue.location(&added.id), (true, false));
    }

    #[test]
    fn test_expire_overdue_uses_horizon() {
        let queue = ReviewQueue::with_defaults();
        let early = queue
            .add(ReviewRequest::new("a", Context::new(), Duration::from_secs(10)))
            .unwrap();
        let late = queue
            .add(ReviewRequest::new("b", Context::new(), Duration::from_secs(600)))
            .unwrap();

        let horizon = early.timeout_at + chrono::Duration::seconds(1);
        let expired = queue.expire_overdue_at(horizon);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, early.id);
        assert_eq!(expired[0].status, ReviewStatus::TimedOut);
        assert_eq!(expired[0].reviewer.as_deref(), Some(SYSTEM_REVIEWER));

        assert_eq!(queue.location(&early.id), (false, true));
        assert_eq!(queue.location(&late.id), (true, false));

        // A second sweep finds nothing new
        assert!(queue.expire_overdue_at(horizon).is_empty());
        // And a reviewer can no longer decide the expired request
        assert!(
            queue
                .complete(&early.id, ReviewStatus::Approved, "r1", None)
                .is_err()
        );
    }

    #[test]
    fn test_cleanup_expired_skips_live_requests() {
        let queue = ReviewQueue::with_defaults();
        queue.add(request("a")).unwrap();
        assert!(queue.cleanup_expired().is_empty());
        assert_eq!(queue.outstanding_count(), 1);
    }

    #[test]
    fn test_prune_completed_before_cutoff() {
        let queue = ReviewQueue::with_defaults();
        let a = queue.add(request("a")).unwrap();
        let b = queue.add(request("b")).unwrap();
        queue.complete(&a.id, ReviewStatus::Approved, "r1", None).unwrap();

        // Outstanding requests are never pruned
        let removed = queue.prune_completed_before(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(removed, 1);
        assert!(queue.get(&a.id).is_none());
        assert!(queue.get(&b.id).is_some());
    }

    #[test]
    fn test_cleanup_completed_respects_retention() {
        let queue = ReviewQueue::with_defaults();
        let a = queue.add(request("a")).unwrap();
        queue.complete(&a.id, ReviewStatus::Approved, "r1", None).unwrap();
        assert_eq!(queue.cleanup_completed(), 0);
        assert_eq!(queue.completed_count(), 1);
    }

    #[test]
    fn test_subscribe_only_for_outstanding() {
        let queue = ReviewQueue::with_defaults();
        let a = queue.add(request("a")).unwrap();
        assert!(queue.subscribe(&a.id).is_some());
        queue.complete(&a.id, ReviewStatus::Escalated, "r1", None).unwrap();
        assert!(queue.subscribe(&a.id).is_none());
    }

    #[tokio::test]
    async fn test_complete_wakes_subscribers() {
        let queue = Arc::new(ReviewQueue::with_defaults());
        let a = queue.add(request("a")).unwrap();
        let notify = queue.subscribe(&a.id).unwrap();
        let notified = notify.notified();

        let q = queue.clone();
        let id = a.id.clone();
        tokio::spawn(async move {
            q.complete(&id, ReviewStatus::Approved, "r1", None).unwrap();
        });

        tokio::time::timeout(Duration::from_secs(5), notified)
            .await
            .expect("waiter should be woken by completion");
        assert_eq!(queue.get(&a.id).unwrap().status, ReviewStatus::Approved);
    }

    #[test]
    fn test_concurrent_completion_has_single_winner() {
        let queue = Arc::new(ReviewQueue::with_defaults());
        let added = queue.add(request("terminate contract")).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let queue = queue.clone();
                let id = added.id.clone();
                std::thread::spawn(move || {
                    let status = if i % 2 == 0 {
                        ReviewStatus::Approved
                    } else {
                        ReviewStatus::TimedOut
                    };
                    queue.complete(&id, status, format!("r{i}"), None).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(queue.location(&added.id), (false, true));
    }
}
