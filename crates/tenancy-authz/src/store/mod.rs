//! Transactional persistence for organizations, memberships, invitations
//! and context preferences.
//!
//! Every mutating engine operation runs inside one [`Transaction`]: the
//! privilege check, owner count and write all see the same snapshot, and
//! either everything commits or nothing does.
//!
//! ## Constraints
//!
//! | constraint | checked |
//! |---|---|
//! | one membership per (organization, user) | on insert |
//! | unique invitation token | on insert |
//! | unique organization slug | on insert |
//! | one `pending` invitation per (organization, email) | at commit |
//!
//! The pending-invitation constraint is deferred so that "expire the old
//! pending invitation, insert the new one" can run as a single unit.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenancy_org::{
    ContextPreference, Invitation, Organization, OrganizationMembership, OrganizationRole,
};
use uuid::Uuid;

use crate::error::StoreResult;

/// Constraint name for duplicate memberships.
pub const MEMBERSHIP_UNIQUE: &str = "memberships_org_user_key";
/// Constraint name for duplicate invitation tokens.
pub const INVITATION_TOKEN_UNIQUE: &str = "invitations_token_key";
/// Constraint name for a second pending invitation to the same address.
pub const INVITATION_PENDING_UNIQUE: &str = "invitations_one_pending_per_email";
/// Constraint name for duplicate organization slugs.
pub const ORGANIZATION_SLUG_UNIQUE: &str = "organizations_slug_key";

/// A durable store that hands out transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a unit of work.
    ///
    /// Dropping the returned transaction without calling
    /// [`Transaction::commit`] discards every write made through it.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;
}

/// One serializable unit of work.
#[async_trait]
pub trait Transaction: Send {
    // ------------------------------------------------------------------
    // Organizations
    // ------------------------------------------------------------------

    /// Get an organization by ID.
    async fn get_organization(&mut self, id: Uuid) -> StoreResult<Option<Organization>>;

    /// Insert a new organization. Fails on a duplicate slug.
    async fn insert_organization(&mut self, org: Organization) -> StoreResult<()>;

    /// Replace an existing organization.
    async fn update_organization(&mut self, org: Organization) -> StoreResult<()>;

    /// Delete an organization with its memberships, invitations and any
    /// context preference pointing at it.
    ///
    /// # Returns
    ///
    /// `true` if the organization existed
    async fn delete_organization(&mut self, id: Uuid) -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Memberships
    // ------------------------------------------------------------------

    /// Get the membership of `user_id` in `org_id`.
    async fn get_membership(
        &mut self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<OrganizationMembership>>;

    /// Insert a membership. Fails on a duplicate (organization, user).
    async fn insert_membership(&mut self, membership: OrganizationMembership) -> StoreResult<()>;

    /// Change a member's role.
    ///
    /// # Returns
    ///
    /// The updated membership, or `None` if it does not exist
    async fn update_membership_role(
        &mut self,
        org_id: Uuid,
        user_id: Uuid,
        role: OrganizationRole,
    ) -> StoreResult<Option<OrganizationMembership>>;

    /// Delete a membership.
    ///
    /// # Returns
    ///
    /// `true` if the membership existed
    async fn delete_membership(&mut self, org_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// All memberships of an organization, in no particular order.
    async fn list_memberships(&mut self, org_id: Uuid)
        -> StoreResult<Vec<OrganizationMembership>>;

    /// All memberships of a user, ordered by join time.
    async fn list_user_memberships(
        &mut self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>>;

    /// Number of owners of an organization.
    async fn count_owners(&mut self, org_id: Uuid) -> StoreResult<usize>;

    // ------------------------------------------------------------------
    // Invitations
    // ------------------------------------------------------------------

    /// Get an invitation by ID.
    async fn get_invitation(&mut self, id: Uuid) -> StoreResult<Option<Invitation>>;

    /// Get an invitation by its secret token.
    async fn find_invitation_by_token(&mut self, token: &str) -> StoreResult<Option<Invitation>>;

    /// Insert an invitation. Fails on a duplicate token.
    async fn insert_invitation(&mut self, invitation: Invitation) -> StoreResult<()>;

    /// Replace an existing invitation.
    async fn update_invitation(&mut self, invitation: Invitation) -> StoreResult<()>;

    /// All invitations of an organization, newest first.
    async fn list_invitations(&mut self, org_id: Uuid) -> StoreResult<Vec<Invitation>>;

    /// Stored-`pending` invitations addressed to a normalized email, in any organization.
    async fn list_pending_for_email(&mut self, email: &str) -> StoreResult<Vec<Invitation>>;

    /// Stored-`pending` invitations whose expiry is before `now`.
    async fn list_stale_pending(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Invitation>>;

    // ------------------------------------------------------------------
    // Context preferences
    // ------------------------------------------------------------------

    /// Get a user's context preference.
    async fn get_preference(&mut self, user_id: Uuid) -> StoreResult<Option<ContextPreference>>;

    /// Insert or replace a user's context preference.
    async fn put_preference(&mut self, preference: ContextPreference) -> StoreResult<()>;

    // ------------------------------------------------------------------

    /// Validate deferred constraints and make every write durable.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
