//! Review request identity and the request value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::error::ReviewError;
use super::status::ReviewStatus;
use crate::guardrail::Context;

// ============================================================================
// Review ID
// ============================================================================

/// Review request identifier.
///
/// Format: `rv_<nanoid>` where nanoid is 21 URL-safe characters.
/// Example: `rv_V1StGXR8_Z5jdHi6B-myT`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReviewId(String);

/// Prefix for generated review IDs.
pub const REVIEW_ID_PREFIX: &str = "rv_";

/// Length of the nanoid body (excluding prefix).
pub const REVIEW_ID_BODY_LENGTH: usize = 21;

impl ReviewId {
    /// Creates a new random review ID.
    ///
    /// 21 nanoid characters give ~1 billion IDs before a 1% collision
    /// probability, independent of clock resolution or manager instance.
    #[must_use]
    pub fn new() -> Self {
        let body = nanoid::nanoid!(REVIEW_ID_BODY_LENGTH);
        Self(format!("{REVIEW_ID_PREFIX}{body}"))
    }

    /// Wraps an externally supplied ID without validation.
    ///
    /// Reviewer tooling uses this to address requests by the string it was shown.
    #[must_use]
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns true if this ID was generated by [`ReviewId::new`].
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.0.starts_with(REVIEW_ID_PREFIX)
            && self.0.len() == REVIEW_ID_PREFIX.len() + REVIEW_ID_BODY_LENGTH
    }

    /// Returns the raw string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReviewId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Serialize for ReviewId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReviewId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

// ============================================================================
// Review Request
// ============================================================================

/// One piece of content awaiting a human decision.
///
/// `content`, `context`, `created_at` and `timeout_at` are fixed at
/// construction. `reviewer`, `review_notes` and `reviewed_at` are written
/// exactly once, together with the terminal `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Unique request identifier
    pub id: ReviewId,
    /// The text under review
    pub content: String,
    /// Caller-supplied context
    pub context: Context,
    /// When the request was created
    pub created_at: DateTime<Utc>,
    /// Current status
    pub status: ReviewStatus,
    /// Who resolved the request
    pub reviewer: Option<String>,
    /// Free-text notes from the reviewer
    pub review_notes: Option<String>,
    /// When the request was resolved
    pub reviewed_at: Option<DateTime<Utc>>,
    /// When the request becomes eligible for `TimedOut`
    pub timeout_at: DateTime<Utc>,
}

impl ReviewRequest {
    /// Creates a new pending request with a fresh ID.
    #[must_use]
    pub fn new(content: impl Into<String>, context: Context, timeout: Duration) -> Self {
        Self::with_id(ReviewId::new(), content, context, timeout)
    }

    /// Creates a new pending request with a caller-chosen ID.
    #[must_use]
    pub fn with_id(
        id: ReviewId,
        content: impl Into<String>,
        context: Context,
        timeout: Duration,
    ) -> Self {
        let now = Utc::now();
        // Clamp to 30 days if the duration overflows chrono's range
        let chrono_timeout =
            chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::days(30));

        Self {
            id,
            content: content.into(),
            context,
            created_at: now,
            status: ReviewStatus::Pending,
            reviewer: None,
            review_notes: None,
            reviewed_at: None,
            timeout_at: now + chrono_timeout,
        }
    }

    /// Returns true if `timeout_at` has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if `timeout_at` is before `horizon`.
    #[must_use]
    pub fn is_expired_at(&self, horizon: DateTime<Utc>) -> bool {
        horizon > self.timeout_at
    }

    /// Returns the time left until `timeout_at`.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        (self.timeout_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Moves the request out of `Pending`.
    ///
    /// Records reviewer, notes and `reviewed_at` in the same step as the status.
    pub(super) fn resolve(
        &mut self,
        status: ReviewStatus,
        reviewer: String,
        notes: Option<String>,
    ) -> Result<(), ReviewError> {
        if self.status.is_terminal() {
            return Err(ReviewError::AlreadyTerminal {
                request_id: self.id.clone(),
                status: self.status,
            });
        }

        if !self.status.can_transition_to(status) {
            return Err(ReviewError::InvalidTransition {
                request_id: self.id.clone(),
                from: self.status,
                to: status,
            });
        }

        self.status = status;
        self.reviewer = Some(reviewer);
        self.review_notes = notes;
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }
}
