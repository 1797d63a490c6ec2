//! # Permissions
//!
//! Core permission types and sets for the RBAC system.
//! A permission combines a resource type with an action and is written
//! `resource:action`, e.g. `members:invite` or `agents:delete_any`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use tenancy_org::OrganizationRole;

use crate::actions::Action;
use crate::resources::ResourceType;

/// A permission is a combination of resource type and action.
///
/// # Example
///
/// ```
/// use tenancy_rbac::permissions::Permission;
/// use tenancy_rbac::resources::ResourceType;
/// use tenancy_rbac::actions::Action;
///
/// let perm = Permission::new(ResourceType::Agents, Action::DeleteAny);
/// assert_eq!(perm.to_string(), "agents:delete_any");
/// assert_eq!(perm, Permission::AGENTS_DELETE_ANY);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The resource type this permission applies to.
    pub resource: ResourceType,
    /// The action allowed on the resource.
    pub action: Action,
}

impl Permission {
    pub const ORG_DELETE: Permission = Permission::new(ResourceType::Organization, Action::Delete);
    pub const ORG_UPDATE: Permission = Permission::new(ResourceType::Organization, Action::Update);
    pub const ORG_VIEW: Permission = Permission::new(ResourceType::Organization, Action::View);

    pub const BILLING_MANAGE: Permission = Permission::new(ResourceType::Billing, Action::Manage);
    pub const BILLING_VIEW: Permission = Permission::new(ResourceType::Billing, Action::View);

    pub const MEMBERS_MANAGE: Permission = Permission::new(ResourceType::Members, Action::Manage);
    pub const MEMBERS_INVITE: Permission = Permission::new(ResourceType::Members, Action::Invite);
    pub const MEMBERS_VIEW: Permission = Permission::new(ResourceType::Members, Action::View);

    pub const AGENTS_CREATE: Permission = Permission::new(ResourceType::Agents, Action::Create);
    pub const AGENTS_DELETE_ANY: Permission = Permission::new(ResourceType::Agents, Action::DeleteAny);
    pub const AGENTS_DELETE_OWN: Permission = Permission::new(ResourceType::Agents, Action::DeleteOwn);
    pub const AGENTS_UPDATE_ANY: Permission = Permission::new(ResourceType::Agents, Action::UpdateAny);
    pub const AGENTS_UPDATE_OWN: Permission = Permission::new(ResourceType::Agents, Action::UpdateOwn);
    pub const AGENTS_VIEW: Permission = Permission::new(ResourceType::Agents, Action::View);
    pub const AGENTS_RUN: Permission = Permission::new(ResourceType::Agents, Action::Run);

    pub const THREADS_CREATE: Permission = Permission::new(ResourceType::Threads, Action::Create);
    pub const THREADS_DELETE_ANY: Permission =
        Permission::new(ResourceType::Threads, Action::DeleteAny);
    pub const THREADS_DELETE_OWN: Permission =
        Permission::new(ResourceType::Threads, Action::DeleteOwn);
    pub const THREADS_VIEW: Permission = Permission::new(ResourceType::Threads, Action::View);

    pub const SETTINGS_UPDATE: Permission = Permission::new(ResourceType::Settings, Action::Update);
    pub const SETTINGS_VIEW: Permission = Permission::new(ResourceType::Settings, Action::View);

    /// Every permission in the organization catalogue.
    pub const CATALOGUE: [Permission; 21] = [
        Permission::ORG_DELETE,
        Permission::ORG_UPDATE,
        Permission::ORG_VIEW,
        Permission::BILLING_MANAGE,
        Permission::BILLING_VIEW,
        Permission::MEMBERS_MANAGE,
        Permission::MEMBERS_INVITE,
        Permission::MEMBERS_VIEW,
        Permission::AGENTS_CREATE,
        Permission::AGENTS_DELETE_ANY,
        Permission::AGENTS_DELETE_OWN,
        Permission::AGENTS_UPDATE_ANY,
        Permission::AGENTS_UPDATE_OWN,
        Permission::AGENTS_VIEW,
        Permission::AGENTS_RUN,
        Permission::THREADS_CREATE,
        Permission::THREADS_DELETE_ANY,
        Permission::THREADS_DELETE_OWN,
        Permission::THREADS_VIEW,
        Permission::SETTINGS_UPDATE,
        Permission::SETTINGS_VIEW,
    ];

    /// Create a new permission.
    ///
    /// # Arguments
    ///
    /// * `resource` - The resource type
    /// * `action` - The action allowed
    pub const fn new(resource: ResourceType, action: Action) -> Self {
        Self { resource, action }
    }

    /// Check if this permission grants another.
    ///
    /// A permission grants another when the resources are equal and the
    /// actions are equal or this action implies the other.
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::permissions::Permission;
    ///
    /// assert!(Permission::MEMBERS_MANAGE.matches(&Permission::MEMBERS_INVITE));
    /// assert!(!Permission::MEMBERS_VIEW.matches(&Permission::MEMBERS_INVITE));
    /// assert!(!Permission::BILLING_MANAGE.matches(&Permission::ORG_DELETE));
    /// ```
    pub fn matches(&self, other: &Permission) -> bool {
        self.resource == other.resource
            && (self.action == other.action || self.action.implies(other.action))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

/// Error returned when a permission string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePermissionError(pub String);

impl fmt::Display for ParsePermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid permission string: {}", self.0)
    }
}

impl std::error::Error for ParsePermissionError {}

impl FromStr for Permission {
    type Err = ParsePermissionError;

    /// Parse `resource:action`.
    ///
    /// ```
    /// use tenancy_rbac::permissions::Permission;
    ///
    /// let perm: Permission = "threads:delete_own".parse().unwrap();
    /// assert_eq!(perm, Permission::THREADS_DELETE_OWN);
    /// assert!("threads".parse::<Permission>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| ParsePermissionError(s.to_string()))?;
        let resource =
            ResourceType::parse(resource).ok_or_else(|| ParsePermissionError(s.to_string()))?;
        let action = Action::parse(action).ok_or_else(|| ParsePermissionError(s.to_string()))?;
        Ok(Permission::new(resource, action))
    }
}

/// A set of permissions, typically the grant of one role.
///
/// # Example
///
/// ```
/// use tenancy_org::OrganizationRole;
/// use tenancy_rbac::permissions::{Permission, PermissionSet};
///
/// let admin = PermissionSet::for_role(OrganizationRole::Admin);
/// assert!(admin.has(&Permission::MEMBERS_INVITE));
/// assert!(!admin.has(&Permission::BILLING_MANAGE));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: HashSet<Permission>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default grant of an organization role.
    ///
    /// - **Owner**: the full catalogue
    /// - **Admin**: everything except `org:delete` and `billing:manage`
    /// - **Member**: view the organization, create and run agents, manage
    ///   own agents and threads
    /// - **Viewer**: read-only
    pub fn for_role(role: OrganizationRole) -> Self {
        match role {
            OrganizationRole::Owner => Permission::CATALOGUE.into_iter().collect(),
            OrganizationRole::Admin => Permission::CATALOGUE
                .into_iter()
                .filter(|p| *p != Permission::ORG_DELETE && *p != Permission::BILLING_MANAGE)
                .collect(),
            OrganizationRole::Member => [
                Permission::ORG_VIEW,
                Permission::MEMBERS_VIEW,
                Permission::AGENTS_CREATE,
                Permission::AGENTS_DELETE_OWN,
                Permission::AGENTS_UPDATE_OWN,
                Permission::AGENTS_VIEW,
                Permission::AGENTS_RUN,
                Permission::THREADS_CREATE,
                Permission::THREADS_DELETE_OWN,
                Permission::THREADS_VIEW,
                Permission::SETTINGS_VIEW,
            ]
            .into_iter()
            .collect(),
            OrganizationRole::Viewer => [
                Permission::ORG_VIEW,
                Permission::MEMBERS_VIEW,
                Permission::AGENTS_VIEW,
                Permission::THREADS_VIEW,
                Permission::SETTINGS_VIEW,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Add a permission to the set.
    pub fn add(&mut self, permission: Permission) {
        self.permissions.insert(permission);
    }

    /// Remove a permission from the set.
    ///
    /// # Returns
    ///
    /// `true` if the permission was present, `false` otherwise
    pub fn remove(&mut self, permission: &Permission) -> bool {
        self.permissions.remove(permission)
    }

    /// Check if the set grants a permission, directly or by implication.
    pub fn has(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
            || self.permissions.iter().any(|p| p.matches(permission))
    }

    /// Check if every permission of `other` is granted by this set.
    pub fn contains_all(&self, other: &PermissionSet) -> bool {
        other.permissions.iter().all(|p| self.has(p))
    }

    /// Merge another permission set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().copied());
    }

    /// Build a set from `resource:action` strings, skipping invalid entries.
    pub fn from_strings(perms: &[&str]) -> Self {
        perms.iter().filter_map(|s| s.parse().ok()).collect()
    }

    /// All permissions, sorted by their string form.
    pub fn all(&self) -> Vec<Permission> {
        let mut all: Vec<Permission> = self.permissions.iter().copied().collect();
        all.sort_by_key(|p| p.to_string());
        all
    }

    /// Get the number of permissions in the set.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

/// Check if a role's default grant includes a permission.
///
/// # Example
///
/// ```
/// use tenancy_org::OrganizationRole;
/// use tenancy_rbac::{role_has_permission, Permission};
///
/// assert!(role_has_permission(OrganizationRole::Owner, &Permission::ORG_DELETE));
/// assert!(!role_has_permission(OrganizationRole::Viewer, &Permission::AGENTS_RUN));
/// ```
pub fn role_has_permission(role: OrganizationRole, permission: &Permission) -> bool {
    PermissionSet::for_role(role).has(permission)
}
