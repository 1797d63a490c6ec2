//! Persisted active-organization preference
//!
//! This module provides the ContextPreference record that remembers which
//! organization a user last chose to act as, together with a short history
//! of recently used organizations for quick switching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of recent organizations kept per user.
pub const MAX_RECENT_ORGANIZATIONS: usize = 10;

/// A user's persisted organization context.
///
/// With no active organization the record is either an explicit
/// personal-workspace choice (`personal_workspace`) or unset, in which case
/// callers fall back to a default organization.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use tenancy_org::ContextPreference;
///
/// let mut pref = ContextPreference::new(Uuid::now_v7(), Utc::now());
/// let org_id = Uuid::now_v7();
/// pref.switch_organization(org_id, Utc::now());
/// assert_eq!(pref.active_organization_id, Some(org_id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPreference {
    /// User ID
    pub user_id: Uuid,

    /// Organization the user acts as by default
    pub active_organization_id: Option<Uuid>,

    /// User explicitly chose the personal workspace
    #[serde(default)]
    pub personal_workspace: bool,

    /// Recently selected organizations (most recent first)
    #[serde(default)]
    pub recent_organizations: Vec<Uuid>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl ContextPreference {
    /// Creates an unset preference.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            active_organization_id: None,
            personal_workspace: false,
            recent_organizations: Vec::new(),
            updated_at: now,
        }
    }

    /// Make `org_id` the active organization and push it to the recent list.
    pub fn switch_organization(&mut self, org_id: Uuid, now: DateTime<Utc>) {
        self.active_organization_id = Some(org_id);
        self.personal_workspace = false;
        self.recent_organizations.retain(|id| *id != org_id);
        self.recent_organizations.insert(0, org_id);
        self.recent_organizations.truncate(MAX_RECENT_ORGANIZATIONS);
        self.updated_at = now;
    }

    /// Switch to the personal workspace.
    pub fn clear_active(&mut self, now: DateTime<Utc>) {
        self.active_organization_id = None;
        self.personal_workspace = true;
        self.updated_at = now;
    }

    /// Drop every reference to `org_id` (membership ended or org deleted).
    ///
    /// An active `org_id` leaves the preference unset, not personal.
    ///
    /// # Returns
    ///
    /// `true` if the record changed
    pub fn forget_organization(&mut self, org_id: Uuid, now: DateTime<Utc>) -> bool {
        let before = self.recent_organizations.len();
        self.recent_organizations.retain(|id| *id != org_id);
        let mut changed = before != self.recent_organizations.len();
        if self.active_organization_id == Some(org_id) {
            self.active_organization_id = None;
            changed = true;
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }

    /// Whether the user made no choice that still applies.
    pub fn is_unset(&self) -> bool {
        self.active_organization_id.is_none() && !self.personal_workspace
    }

    /// Get the most recent organizations, at most `limit` of them.
    pub fn recent(&self, limit: usize) -> &[Uuid] {
        let end = limit.min(self.recent_organizations.len());
        &self.recent_organizations[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_preference_is_unset() {
        let user_id = Uuid::now_v7();
        let pref = ContextPreference::new(user_id, Utc::now());
        assert_eq!(pref.user_id, user_id);
        assert!(pref.active_organization_id.is_none());
        assert!(!pref.personal_workspace);
        assert!(pref.is_unset());
        assert!(pref.recent_organizations.is_empty());
    }

    #[test]
    fn test_switch_organization_updates_recent() {
        let mut pref = ContextPreference::new(Uuid::now_v7(), Utc::now());
        let org1 = Uuid::now_v7();
        let org2 = Uuid::now_v7();

        pref.switch_organization(org1, Utc::now());
        pref.switch_organization(org2, Utc::now());
        pref.switch_organization(org1, Utc::now());

        assert_eq!(pref.active_organization_id, Some(org1));
        assert_eq!(pref.recent_organizations, vec![org1, org2]);
    }

    #[test]
    fn test_recent_organizations_limit() {
        let mut pref = ContextPreference::new(Uuid::now_v7(), Utc::now());
        for _ in 0..15 {
            pref.switch_organization(Uuid::now_v7(), Utc::now());
        }
        assert_eq!(pref.recent_organizations.len(), MAX_RECENT_ORGANIZATIONS);
        assert_eq!(pref.recent(3).len(), 3);
        assert_eq!(pref.recent(50).len(), MAX_RECENT_ORGANIZATIONS);
    }

    #[test]
    fn test_forget_organization_clears_active() {
        let mut pref = ContextPreference::new(Uuid::now_v7(), Utc::now());
        let org = Uuid::now_v7();
        pref.switch_organization(org, Utc::now());

        assert!(pref.forget_organization(org, Utc::now()));
        assert!(pref.active_organization_id.is_none());
        assert!(pref.is_unset());
        assert!(pref.recent_organizations.is_empty());
        assert!(!pref.forget_organization(org, Utc::now()));
    }

    #[test]
    fn test_clear_active_keeps_history() {
        let mut pref = ContextPreference::new(Uuid::now_v7(), Utc::now());
        let org = Uuid::now_v7();
        pref.switch_organization(org, Utc::now());
        pref.clear_active(Utc::now());
        assert!(pref.active_organization_id.is_none());
        assert!(pref.personal_workspace);
        assert!(!pref.is_unset());
        assert_eq!(pref.recent(1), &[org]);
    }

    #[test]
    fn test_forget_inactive_organization_keeps_personal_choice() {
        let mut pref = ContextPreference::new(Uuid::now_v7(), Utc::now());
        let org = Uuid::now_v7();
        pref.switch_organization(org, Utc::now());
        pref.clear_active(Utc::now());

        assert!(pref.forget_organization(org, Utc::now()));
        assert!(pref.personal_workspace);

        pref.switch_organization(org, Utc::now());
        assert!(!pref.personal_workspace);
    }
}
