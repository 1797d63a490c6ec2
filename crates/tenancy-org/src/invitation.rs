//! Invitation domain models
//!
//! An invitation is a pending offer of membership for an email address,
//! redeemable once through a secret token before it expires.
//!
//! # State machine
//!
//! ```text
//!            ┌──────────► accepted
//!            │
//!  pending ──┼──────────► expired
//!            │
//!            └──────────► revoked
//! ```
//!
//! All three end states are terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::roles::OrganizationRole;

/// Default invitation lifetime in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Lifecycle state of an invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Waiting to be accepted
    Pending,

    /// Redeemed by the invited user
    Accepted,

    /// TTL elapsed, or superseded by a newer invitation
    Expired,

    /// Withdrawn by an owner or admin
    Revoked,
}

impl InvitationStatus {
    /// Check if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check if `next` is reachable from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::InvitationStatus;
    ///
    /// assert!(InvitationStatus::Pending.can_transition_to(InvitationStatus::Revoked));
    /// assert!(!InvitationStatus::Accepted.can_transition_to(InvitationStatus::Expired));
    /// ```
    pub fn can_transition_to(&self, next: InvitationStatus) -> bool {
        *self == Self::Pending && next != Self::Pending
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Parse status from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "expired" => Some(Self::Expired),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invitation cannot move from {from} to {to}")]
pub struct InvalidTransition {
    /// State the invitation was in
    pub from: InvitationStatus,
    /// State that was requested
    pub to: InvitationStatus,
}

/// Secret single-use token identifying an invitation.
///
/// `Debug` is redacted and the type is not serializable, so the secret only
/// leaves the process through whatever channel the caller hands it to.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InvitationToken(String);

impl InvitationToken {
    /// Wrap an already generated token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the token for delivery or lookup.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InvitationToken(***)")
    }
}

/// Normalize an email address for comparison and storage.
///
/// Trims surrounding whitespace and lowercases. Returns `None` for values
/// that are not plausibly an address (`local@domain`, no inner whitespace).
///
/// # Examples
///
/// ```
/// use tenancy_org::invitation::normalize_email;
///
/// assert_eq!(normalize_email("  A@X.com "), Some("a@x.com".to_string()));
/// assert_eq!(normalize_email("not-an-email"), None);
/// ```
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || normalized.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(normalized)
}

/// An invitation for an email address to join an organization.
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    /// Unique invitation ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// Normalized target email
    pub email: String,

    /// Role granted on acceptance
    pub role: OrganizationRole,

    /// Secret redemption token
    pub token: InvitationToken,

    /// User who issued the invitation
    pub invited_by: Uuid,

    /// Current state
    pub status: InvitationStatus,

    /// When the invitation was issued
    pub created_at: DateTime<Utc>,

    /// When the invitation stops being redeemable
    pub expires_at: DateTime<Utc>,

    /// When the invitation was accepted
    pub accepted_at: Option<DateTime<Utc>>,

    /// Who accepted the invitation
    pub accepted_by: Option<Uuid>,

    /// Free-form metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Invitation {
    /// Creates a new pending invitation.
    ///
    /// # Arguments
    ///
    /// * `organization_id` - Target organization
    /// * `email` - Normalized email address
    /// * `role` - Role granted on acceptance
    /// * `token` - Secret redemption token
    /// * `invited_by` - Issuing user
    /// * `now` - Issue time
    /// * `ttl` - Lifetime; `expires_at = now + ttl`
    pub fn new(
        organization_id: Uuid,
        email: impl Into<String>,
        role: OrganizationRole,
        token: InvitationToken,
        invited_by: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            email: email.into(),
            role,
            token,
            invited_by,
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            accepted_at: None,
            accepted_by: None,
            metadata: HashMap::new(),
        }
    }

    /// Check if the expiry time has passed at `now`.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Status as observed at `now`: a pending invitation past its expiry reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.is_past_expiry(now) {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }

    /// Move to `next`, rejecting any change out of a terminal state.
    pub fn transition(&mut self, next: InvitationStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark accepted by `user_id` at `now`.
    pub fn accept(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition(InvitationStatus::Accepted)?;
        self.accepted_at = Some(now);
        self.accepted_by = Some(user_id);
        Ok(())
    }

    /// Check if the address matches this invitation, ignoring case.
    pub fn is_addressed_to(&self, email: &str) -> bool {
        normalize_email(email).is_some_and(|e| e == self.email)
    }

    /// Token-free view for list displays, with the status as observed at `now`.
    pub fn summary(&self, now: DateTime<Utc>) -> InvitationSummary {
        InvitationSummary {
            id: self.id,
            organization_id: self.organization_id,
            email: self.email.clone(),
            role: self.role,
            status: self.effective_status(now),
            invited_by: self.invited_by,
            created_at: self.created_at,
            expires_at: self.expires_at,
            accepted_at: self.accepted_at,
            accepted_by: self.accepted_by,
            metadata: self.metadata.clone(),
        }
    }
}

/// Invitation as shown to organization members. Never carries the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationSummary {
    /// Invitation ID
    pub id: Uuid,
    /// Organization ID
    pub organization_id: Uuid,
    /// Target email
    pub email: String,
    /// Role granted on acceptance
    pub role: OrganizationRole,
    /// Status
    pub status: InvitationStatus,
    /// Issuing user
    pub invited_by: Uuid,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Acceptance time
    pub accepted_at: Option<DateTime<Utc>>,
    /// Accepting user
    pub accepted_by: Option<Uuid>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}
