//! # Tenancy Authorization
//!
//! This crate decides who may act on an organization and manages the
//! invitations that bring new members in.
//!
//! ## Overview
//!
//! The tenancy-authz crate handles:
//! - **Permission evaluation**: Minimum-role and permission checks per organization
//! - **Membership store**: Add, change, remove and list members with last-owner protection
//! - **Organizations**: Creation with an owner bootstrap, update and cascading delete
//! - **Invitations**: Issue, accept, revoke, look up and expire token-based invitations
//! - **Context resolution**: The organization a request acts as, and switching it
//! - **Expiry sweeper**: Background persistence of lapsed invitations
//!
//! Every mutating operation runs in one storage transaction, so role
//! checks, owner counts and writes see the same snapshot. Domain events go
//! out on a [`tenancy_events::EventBus`] after commit.
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_authz::{AuthzEngine, Principal};
//! use tenancy_org::OrganizationRole;
//! use uuid::Uuid;
//!
//! # async fn example() -> tenancy_authz::AuthzResult<()> {
//! let engine = AuthzEngine::in_memory();
//! let alice = Principal::new(Uuid::now_v7()).with_email("alice@acme.test");
//! let bob = Principal::new(Uuid::now_v7());
//!
//! let org = engine.organizations().create(&alice, "Acme", "acme").await?;
//! engine
//!     .members()
//!     .add_member(&alice, org.id, bob.user_id, OrganizationRole::Member)
//!     .await?;
//!
//! let role = engine.members().get_role(org.id, bob.user_id).await?;
//! assert_eq!(role, Some(OrganizationRole::Member));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`AuthzConfig::from_env`] reads:
//! - `INVITATION_TTL_DAYS` (default 7)
//! - `INVITATION_TOKEN_BYTES` (default 32, minimum 16)
//! - `INVITATION_SWEEP_INTERVAL_SECS` (default 300)
//! - `INVITATION_CREATE_MAX_ATTEMPTS` (default 2)

pub mod clock;
pub mod config;
pub mod context;
pub mod directory;
mod engine;
pub mod error;
pub mod evaluator;
pub mod invitation;
pub mod membership;
pub mod organization;
pub mod policy;
pub mod principal;
pub mod retry;
pub mod store;
pub mod sweeper;
pub mod token;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthzConfig, ConfigError};
pub use context::{AuthContext, ContextResolver};
pub use directory::{MemoryUserDirectory, UserDirectory};
pub use engine::{AuthzEngine, AuthzEngineBuilder};
pub use error::{AuthzError, AuthzResult, StoreError, StoreResult};
pub use evaluator::{Decision, DenyReason, PermissionEvaluator};
pub use invitation::{AcceptedInvitation, InvitationService, InvitationView};
pub use membership::MembershipService;
pub use organization::{OrganizationService, OrganizationUpdate};
pub use principal::Principal;
pub use store::{MemoryStore, Store, Transaction};
pub use sweeper::{ExpirySweeper, SweeperHandle};
pub use token::{RandomTokenGenerator, TokenGenerator};
