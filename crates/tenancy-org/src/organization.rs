//! Organization domain models
//!
//! This module provides the Organization entity, the tenant boundary for
//! every authorization decision. Organizations own memberships and
//! invitations; deleting one cascades both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::plan::{BillingStatus, PlanTier};
use crate::roles::OrganizationRole;

/// Maximum length of an organization name.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of an organization slug.
pub const MAX_SLUG_LEN: usize = 100;

/// An organization represents a tenant in the multi-tenant system.
///
/// Users can belong to multiple organizations with different roles.
///
/// # Architecture
///
/// ```text
/// Organization
///   ├─ Members (via OrganizationMembership)
///   ├─ Invitations
///   ├─ Settings (opaque key/value)
///   └─ Plan tier + billing status
/// ```
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use tenancy_org::{Organization, PlanTier};
///
/// let org = Organization::new("Acme Corp", "acme-corp", Utc::now());
/// assert_eq!(org.slug, "acme-corp");
/// assert_eq!(org.plan_tier, PlanTier::Free);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique across platform)
    pub slug: String,

    /// Subscription plan
    pub plan_tier: PlanTier,

    /// Billing provider status
    pub billing_status: BillingStatus,

    /// Organization-level settings, opaque to this crate
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization on the free plan with no settings.
    ///
    /// # Arguments
    ///
    /// * `name` - The organization name
    /// * `slug` - URL-friendly slug (must be unique)
    /// * `now` - Creation timestamp
    pub fn new(name: impl Into<String>, slug: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            plan_tier: PlanTier::default(),
            billing_status: BillingStatus::default(),
            settings: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the summary shown to a member with the given role.
    pub fn summary_for(&self, role: OrganizationRole) -> OrganizationSummary {
        OrganizationSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            plan_tier: self.plan_tier,
            role,
        }
    }
}

/// Check that a slug is 1-100 characters of `[a-z0-9-]`.
///
/// # Examples
///
/// ```
/// use tenancy_org::organization::is_valid_slug;
///
/// assert!(is_valid_slug("acme-corp-2"));
/// assert!(!is_valid_slug("Acme Corp"));
/// assert!(!is_valid_slug(""));
/// ```
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Check that a display name is 1-255 characters after trimming.
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_NAME_LEN
}

/// Summary of an organization for list displays and auth context.
///
/// Includes the viewing user's role in the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    /// Organization ID
    pub id: Uuid,

    /// Organization name
    pub name: String,

    /// Slug
    pub slug: String,

    /// Plan tier
    pub plan_tier: PlanTier,

    /// User's role in this organization
    pub role: OrganizationRole,
}
