//! Membership domain models
//!
//! A membership binds exactly one user to one organization with one role.
//! The pair (organization, user) is unique; storage enforces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::roles::OrganizationRole;

/// Organization membership linking a user to an organization.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use tenancy_org::{OrganizationMembership, OrganizationRole};
///
/// let org_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let membership = OrganizationMembership::new(org_id, user_id, OrganizationRole::Member, Utc::now());
/// assert!(membership.invited_by.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    /// Unique membership ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the organization
    pub role: OrganizationRole,

    /// Who invited this user; `None` for the organization's creator
    pub invited_by: Option<Uuid>,

    /// When the user joined
    pub joined_at: DateTime<Utc>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OrganizationMembership {
    /// Creates a new organization membership with no inviter.
    ///
    /// # Arguments
    ///
    /// * `organization_id` - The organization ID
    /// * `user_id` - The user ID
    /// * `role` - The user's role in the organization
    /// * `joined_at` - When the membership takes effect
    pub fn new(
        organization_id: Uuid,
        user_id: Uuid,
        role: OrganizationRole,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            user_id,
            role,
            invited_by: None,
            joined_at,
            metadata: HashMap::new(),
        }
    }

    /// Set who invited this user.
    pub fn with_inviter(mut self, inviter_id: Uuid) -> Self {
        self.invited_by = Some(inviter_id);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check if this membership holds the owner role.
    pub fn is_owner(&self) -> bool {
        self.role == OrganizationRole::Owner
    }
}

/// Sort memberships for display: owner, admin, member, viewer, then by join time.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
/// use tenancy_org::{membership::sort_for_listing, OrganizationMembership, OrganizationRole};
///
/// let org = Uuid::now_v7();
/// let now = Utc::now();
/// let mut members = vec![
///     OrganizationMembership::new(org, Uuid::now_v7(), OrganizationRole::Viewer, now),
///     OrganizationMembership::new(org, Uuid::now_v7(), OrganizationRole::Owner, now + Duration::seconds(1)),
/// ];
/// sort_for_listing(&mut members);
/// assert_eq!(members[0].role, OrganizationRole::Owner);
/// ```
pub fn sort_for_listing(members: &mut [OrganizationMembership]) {
    members.sort_by(|a, b| {
        b.role
            .rank()
            .cmp(&a.role.rank())
            .then(a.joined_at.cmp(&b.joined_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_organization_membership_creation() {
        let org_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let now = Utc::now();
        let membership = OrganizationMembership::new(org_id, user_id, OrganizationRole::Admin, now);

        assert_eq!(membership.organization_id, org_id);
        assert_eq!(membership.user_id, user_id);
        assert_eq!(membership.role, OrganizationRole::Admin);
        assert_eq!(membership.joined_at, now);
        assert!(membership.metadata.is_empty());
        assert!(!membership.is_owner());
    }

    #[test]
    fn test_organization_membership_with_inviter() {
        let inviter_id = Uuid::now_v7();
        let membership = OrganizationMembership::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            OrganizationRole::Viewer,
            Utc::now(),
        )
        .with_inviter(inviter_id)
        .with_metadata("source", serde_json::json!("invitation"));

        assert_eq!(membership.invited_by, Some(inviter_id));
        assert_eq!(membership.metadata["source"], "invitation");
    }

    #[test]
    fn test_sort_for_listing_orders_by_role_then_join_time() {
        let org = Uuid::now_v7();
        let t0 = Utc::now();
        let early_member = OrganizationMembership::new(org, Uuid::now_v7(), OrganizationRole::Member, t0);
        let late_member = OrganizationMembership::new(
            org,
            Uuid::now_v7(),
            OrganizationRole::Member,
            t0 + Duration::minutes(5),
        );
        let admin = OrganizationMembership::new(
            org,
            Uuid::now_v7(),
            OrganizationRole::Admin,
            t0 + Duration::minutes(10),
        );
        let owner = OrganizationMembership::new(
            org,
            Uuid::now_v7(),
            OrganizationRole::Owner,
            t0 + Duration::minutes(20),
        );

        let mut members = vec![
            late_member.clone(),
            owner.clone(),
            early_member.clone(),
            admin.clone(),
        ];
        sort_for_listing(&mut members);

        let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        assert_eq!(
            ids,
            vec![owner.user_id, admin.user_id, early_member.user_id, late_member.user_id]
        );
    }
}
