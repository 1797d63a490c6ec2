//! Event types for membership and invitation changes
//!
//! This module defines the event envelope and the typed domain events the
//! authorization engine publishes after each committed change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tenancy_org::OrganizationRole;
use uuid::Uuid;

use crate::bus::{EventBusError, EventBusResult};

/// Default event source for everything published by the tenancy engine.
pub const DEFAULT_SOURCE: &str = "tenancy";

/// Event envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing, tracing, and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "member.added", "invitation.accepted")
    pub event_type: String,

    /// Publishing component
    pub source: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organization context
    pub org_id: Option<Uuid>,

    /// User who triggered the event
    pub user_id: Option<Uuid>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event from the default source.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event type string
    /// * `payload` - The event payload
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            source: DEFAULT_SOURCE.to_string(),
            timestamp: Utc::now(),
            org_id: None,
            user_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Override the source component.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Override the event timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Set user context.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the topic for this event.
    ///
    /// Topics are structured as: `{source}.{event_type}`
    pub fn topic(&self) -> String {
        format!("{}.{}", self.source, self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

fn envelope<T: Serialize>(event_type: &str, body: &T) -> EventBusResult<Event> {
    let payload = serde_json::to_value(body)
        .map_err(|e| EventBusError::SerializationError(e.to_string()))?;
    Ok(Event::new(event_type, payload))
}

// ============================================================================
// Organization Events
// ============================================================================

/// Organization lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrganizationEvent {
    /// Organization was created and its creator became owner
    Created {
        organization_id: Uuid,
        name: String,
        slug: String,
        created_by: Uuid,
    },
    /// Organization was deleted with its memberships and invitations
    Deleted {
        organization_id: Uuid,
        deleted_by: Uuid,
    },
}

impl OrganizationEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let (event_type, org, actor) = match self {
            OrganizationEvent::Created {
                organization_id,
                created_by,
                ..
            } => ("organization.created", *organization_id, *created_by),
            OrganizationEvent::Deleted {
                organization_id,
                deleted_by,
            } => ("organization.deleted", *organization_id, *deleted_by),
        };
        Ok(envelope(event_type, self)?.with_org(org).with_user(actor))
    }
}

// ============================================================================
// Member Events
// ============================================================================

/// Membership change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemberEvent {
    /// User joined the organization
    Added {
        organization_id: Uuid,
        user_id: Uuid,
        role: OrganizationRole,
        invited_by: Option<Uuid>,
    },
    /// User left or was removed
    Removed {
        organization_id: Uuid,
        user_id: Uuid,
        removed_by: Uuid,
    },
    /// User's role changed
    RoleChanged {
        organization_id: Uuid,
        user_id: Uuid,
        old_role: OrganizationRole,
        new_role: OrganizationRole,
        changed_by: Uuid,
    },
}

impl MemberEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let (event_type, org, user) = match self {
            MemberEvent::Added {
                organization_id,
                user_id,
                ..
            } => ("member.added", *organization_id, *user_id),
            MemberEvent::Removed {
                organization_id,
                user_id,
                ..
            } => ("member.removed", *organization_id, *user_id),
            MemberEvent::RoleChanged {
                organization_id,
                user_id,
                ..
            } => ("member.role_changed", *organization_id, *user_id),
        };
        Ok(envelope(event_type, self)?.with_org(org).with_user(user))
    }
}

// ============================================================================
// Invitation Events
// ============================================================================

/// Invitation lifecycle events.
///
/// `Issued` is the only event that carries the invitation token; it exists
/// so a mail collaborator can deliver the token out of band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvitationEvent {
    /// Invitation was created
    Issued {
        invitation_id: Uuid,
        organization_id: Uuid,
        email: String,
        role: OrganizationRole,
        token: String,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    },
    /// Invitation was redeemed
    Accepted {
        invitation_id: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
    },
    /// Invitation was withdrawn
    Revoked {
        invitation_id: Uuid,
        organization_id: Uuid,
        revoked_by: Uuid,
    },
    /// Invitation passed its expiry or was superseded
    Expired {
        invitation_id: Uuid,
        organization_id: Uuid,
    },
}

impl InvitationEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let (event_type, org, user) = match self {
            InvitationEvent::Issued {
                organization_id,
                invited_by,
                ..
            } => ("invitation.issued", *organization_id, Some(*invited_by)),
            InvitationEvent::Accepted {
                organization_id,
                user_id,
                ..
            } => ("invitation.accepted", *organization_id, Some(*user_id)),
            InvitationEvent::Revoked {
                organization_id,
                revoked_by,
                ..
            } => ("invitation.revoked", *organization_id, Some(*revoked_by)),
            InvitationEvent::Expired {
                organization_id, ..
            } => ("invitation.expired", *organization_id, None),
        };
        let event = envelope(event_type, self)?.with_org(org);
        Ok(match user {
            Some(user) => event.with_user(user),
            None => event,
        })
    }
}
