//! # Tenancy RBAC (Role-Based Access Control)
//!
//! Fine-grained permissions layered on top of the organization role
//! hierarchy.
//!
//! ## Overview
//!
//! - **Resources**: Organization, billing, members, agents, threads, settings
//! - **Actions**: Operations that can be performed on resources
//! - **Permissions**: Resource + Action combinations, written `resource:action`
//! - **Permission Sets**: The default grant of each organization role
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_org::OrganizationRole;
//! use tenancy_rbac::{Action, Permission, PermissionSet, ResourceType};
//!
//! let perm = Permission::new(ResourceType::Members, Action::Invite);
//! assert_eq!(perm.to_string(), "members:invite");
//!
//! let member = PermissionSet::for_role(OrganizationRole::Member);
//! assert!(!member.has(&perm));
//! assert!(member.has(&Permission::AGENTS_RUN));
//! ```
//!
//! ## Action Implications
//!
//! - `Manage` implies all actions on the same resource
//! - `UpdateAny` implies `UpdateOwn`, `DeleteAny` implies `DeleteOwn`
//! - Every non-view action implies `View`

pub mod actions;
pub mod permissions;
pub mod resources;

pub use actions::Action;
pub use permissions::{role_has_permission, ParsePermissionError, Permission, PermissionSet};
pub use resources::ResourceType;
