//! # Tenancy Organization Model
//!
//! This crate provides the domain model for multi-tenant organization
//! membership: who belongs to which organization, with what role, and the
//! invitations that turn an email address into a member.
//!
//! ## Overview
//!
//! The tenancy-org crate handles:
//! - **Roles**: The totally ordered owner > admin > member > viewer hierarchy
//! - **Organizations**: Tenant entities with plan, billing status and settings
//! - **Memberships**: User-organization bindings with exactly one role
//! - **Invitations**: Token-redeemable offers of membership and their state machine
//! - **Context**: The persisted "acting as" organization preference
//!
//! ## Architecture
//!
//! ```text
//! User
//!   ├─ OrganizationMembership ─→ Organization
//!   │                               ├─ Plan tier / billing status
//!   │                               └─ Invitations (email, role, token)
//!   └─ ContextPreference (active org, recent orgs)
//! ```
//!
//! Everything here is plain data plus pure rules. Authorization decisions,
//! storage and transactions live in `tenancy-authz`.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tenancy_org::{Organization, OrganizationMembership, OrganizationRole};
//! use uuid::Uuid;
//!
//! let creator = Uuid::now_v7();
//! let org = Organization::new("Acme Corp", "acme-corp", Utc::now());
//! let owner = OrganizationMembership::new(org.id, creator, OrganizationRole::Owner, Utc::now());
//! assert!(owner.role.at_least(OrganizationRole::Admin));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization support (enabled by default)

pub mod context;
pub mod invitation;
pub mod membership;
pub mod organization;
pub mod plan;
pub mod roles;

// Re-export main types for convenience
pub use context::ContextPreference;
pub use invitation::{
    Invitation, InvitationStatus, InvitationSummary, InvitationToken, InvalidTransition,
};
pub use membership::OrganizationMembership;
pub use organization::{Organization, OrganizationSummary};
pub use plan::{BillingStatus, PlanTier};
pub use roles::OrganizationRole;
