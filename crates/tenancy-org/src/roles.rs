//! Organization role hierarchy
//!
//! This module defines the four-level role hierarchy used for every
//! organization-scoped authorization decision, along with its ordering
//! and comparison semantics.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// User role within an organization.
///
/// Roles are totally ordered, with each role inheriting the privileges of lower roles.
/// The hierarchy is: Viewer < Member < Admin < Owner
///
/// # Permission Model
///
/// - **Viewer**: Read-only access to organization resources
/// - **Member**: Can create and manage their own agents and threads
/// - **Admin**: Can manage members, agents and settings (no billing)
/// - **Owner**: Full organization control including billing and deletion
///
/// # Examples
///
/// ```
/// use tenancy_org::OrganizationRole;
///
/// let role = OrganizationRole::Admin;
/// assert!(role.at_least(OrganizationRole::Member));
/// assert!(!role.at_least(OrganizationRole::Owner));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationRole {
    /// Read-only access to organization resources
    Viewer = 0,

    /// Can create and manage own resources
    Member = 1,

    /// Can manage members and settings
    Admin = 2,

    /// Full organization control
    Owner = 3,
}

impl OrganizationRole {
    /// All roles, highest privilege first.
    pub const ALL: [OrganizationRole; 4] = [
        OrganizationRole::Owner,
        OrganizationRole::Admin,
        OrganizationRole::Member,
        OrganizationRole::Viewer,
    ];

    /// Numeric rank of the role (owner = 3, viewer = 0).
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Compare two roles by rank.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cmp::Ordering;
    /// use tenancy_org::OrganizationRole;
    ///
    /// assert_eq!(
    ///     OrganizationRole::compare(OrganizationRole::Owner, OrganizationRole::Admin),
    ///     Ordering::Greater
    /// );
    /// ```
    pub fn compare(a: OrganizationRole, b: OrganizationRole) -> Ordering {
        a.rank().cmp(&b.rank())
    }

    /// Check if this role's rank is at least `minimum`'s rank.
    ///
    /// # Arguments
    ///
    /// * `minimum` - The lowest acceptable role
    ///
    /// # Returns
    ///
    /// `true` if this role meets or exceeds `minimum`
    pub fn at_least(&self, minimum: OrganizationRole) -> bool {
        self.rank() >= minimum.rank()
    }

    /// Check if this role can manage members (add, remove, invite).
    ///
    /// # Returns
    ///
    /// `true` for Admin and Owner roles
    pub fn can_manage_members(&self) -> bool {
        self.at_least(OrganizationRole::Admin)
    }

    /// Check if this role is one only an owner may hand out.
    ///
    /// # Returns
    ///
    /// `true` for Admin and Owner roles
    pub fn is_privileged(&self) -> bool {
        self.at_least(OrganizationRole::Admin)
    }

    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(OrganizationRole)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::OrganizationRole;
    ///
    /// assert_eq!(OrganizationRole::parse("admin"), Some(OrganizationRole::Admin));
    /// assert_eq!(OrganizationRole::parse("VIEWER"), Some(OrganizationRole::Viewer));
    /// assert_eq!(OrganizationRole::parse("guest"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Get string representation of the role.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::OrganizationRole;
    ///
    /// assert_eq!(OrganizationRole::Admin.as_str(), "admin");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::Member => "Member",
            Self::Admin => "Admin",
            Self::Owner => "Owner",
        }
    }
}

impl Default for OrganizationRole {
    fn default() -> Self {
        Self::Member
    }
}

impl std::fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(OrganizationRole::Owner > OrganizationRole::Admin);
        assert!(OrganizationRole::Admin > OrganizationRole::Member);
        assert!(OrganizationRole::Member > OrganizationRole::Viewer);
    }

    #[test]
    fn test_ranks() {
        assert_eq!(OrganizationRole::Owner.rank(), 3);
        assert_eq!(OrganizationRole::Admin.rank(), 2);
        assert_eq!(OrganizationRole::Member.rank(), 1);
        assert_eq!(OrganizationRole::Viewer.rank(), 0);
    }

    #[test]
    fn test_compare() {
        use OrganizationRole::*;
        assert_eq!(OrganizationRole::compare(Owner, Viewer), Ordering::Greater);
        assert_eq!(OrganizationRole::compare(Member, Member), Ordering::Equal);
        assert_eq!(OrganizationRole::compare(Viewer, Admin), Ordering::Less);
    }

    #[test]
    fn test_at_least_is_total() {
        for role in OrganizationRole::ALL {
            for minimum in OrganizationRole::ALL {
                assert_eq!(role.at_least(minimum), role.rank() >= minimum.rank());
            }
            assert!(role.at_least(role));
            assert!(role.at_least(OrganizationRole::Viewer));
        }
    }

    #[test]
    fn test_privileged_roles() {
        assert!(OrganizationRole::Owner.is_privileged());
        assert!(OrganizationRole::Admin.is_privileged());
        assert!(!OrganizationRole::Member.is_privileged());
        assert!(!OrganizationRole::Viewer.can_manage_members());
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in OrganizationRole::ALL {
            assert_eq!(OrganizationRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(OrganizationRole::parse(" Owner "), Some(OrganizationRole::Owner));
        assert_eq!(OrganizationRole::parse("editor"), None);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&OrganizationRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let role: OrganizationRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, OrganizationRole::Viewer);
    }
}
