//! In-memory transactional store.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the state. Commit validates deferred constraints and swaps
//! the copy in; drop releases the lock and discards it. Units of work are
//! therefore fully serialized, which is what the last-owner and
//! one-pending-invitation invariants need.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tenancy_org::{
    ContextPreference, Invitation, InvitationStatus, Organization, OrganizationMembership,
    OrganizationRole,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    Store, Transaction, INVITATION_PENDING_UNIQUE, INVITATION_TOKEN_UNIQUE, MEMBERSHIP_UNIQUE,
    ORGANIZATION_SLUG_UNIQUE,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct StoreState {
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<(Uuid, Uuid), OrganizationMembership>,
    invitations: HashMap<Uuid, Invitation>,
    preferences: HashMap<Uuid, ContextPreference>,
}

impl StoreState {
    fn check_deferred(&self) -> StoreResult<()> {
        let mut pending = HashSet::new();
        for invitation in self.invitations.values() {
            if invitation.status == InvitationStatus::Pending
                && !pending.insert((invitation.organization_id, invitation.email.as_str()))
            {
                return Err(StoreError::UniqueViolation(
                    INVITATION_PENDING_UNIQUE.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// In-memory [`Store`] for tests and single-process hosts.
///
/// # Examples
///
/// ```
/// use tenancy_authz::store::{MemoryStore, Store};
///
/// # async fn example() -> Result<(), tenancy_authz::StoreError> {
/// let store = MemoryStore::new();
/// let tx = store.begin().await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage: while set, `begin` and `commit` fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Self::check_available(&self.unavailable)?;
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            unavailable: self.unavailable.clone(),
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
    unavailable: Arc<AtomicBool>,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get_organization(&mut self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.working.organizations.get(&id).cloned())
    }

    async fn insert_organization(&mut self, org: Organization) -> StoreResult<()> {
        if self
            .working
            .organizations
            .values()
            .any(|existing| existing.slug == org.slug)
        {
            return Err(StoreError::UniqueViolation(
                ORGANIZATION_SLUG_UNIQUE.to_string(),
            ));
        }
        self.working.organizations.insert(org.id, org);
        Ok(())
    }

    async fn update_organization(&mut self, org: Organization) -> StoreResult<()> {
        match self.working.organizations.get_mut(&org.id) {
            Some(existing) => {
                *existing = org;
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "organization {} does not exist",
                org.id
            ))),
        }
    }

    async fn delete_organization(&mut self, id: Uuid) -> StoreResult<bool> {
        if self.working.organizations.remove(&id).is_none() {
            return Ok(false);
        }
        self.working
            .memberships
            .retain(|(org_id, _), _| *org_id != id);
        self.working
            .invitations
            .retain(|_, invitation| invitation.organization_id != id);
        for preference in self.working.preferences.values_mut() {
            let updated_at = preference.updated_at;
            preference.forget_organization(id, updated_at);
        }
        Ok(true)
    }

    async fn get_membership(
        &mut self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<OrganizationMembership>> {
        Ok(self.working.memberships.get(&(org_id, user_id)).cloned())
    }

    async fn insert_membership(&mut self, membership: OrganizationMembership) -> StoreResult<()> {
        let key = (membership.organization_id, membership.user_id);
        if self.working.memberships.contains_key(&key) {
            return Err(StoreError::UniqueViolation(MEMBERSHIP_UNIQUE.to_string()));
        }
        self.working.memberships.insert(key, membership);
        Ok(())
    }

    async fn update_membership_role(
        &mut self,
        org_id: Uuid,
        user_id: Uuid,
        role: OrganizationRole,
    ) -> StoreResult<Option<OrganizationMembership>> {
        Ok(self
            .working
            .memberships
            .get_mut(&(org_id, user_id))
            .map(|membership| {
                membership.role = role;
                membership.clone()
            }))
    }

    async fn delete_membership(&mut self, org_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.working.memberships.remove(&(org_id, user_id)).is_some())
    }

    async fn list_memberships(
        &mut self,
        org_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>> {
        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| m.organization_id == org_id)
            .cloned()
            .collect())
    }

    async fn list_user_memberships(
        &mut self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationMembership>> {
        let mut memberships: Vec<OrganizationMembership> = self
            .working
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        Ok(memberships)
    }

    async fn count_owners(&mut self, org_id: Uuid) -> StoreResult<usize> {
        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| m.organization_id == org_id && m.role == OrganizationRole::Owner)
            .count())
    }

    async fn get_invitation(&mut self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(self.working.invitations.get(&id).cloned())
    }

    async fn find_invitation_by_token(&mut self, token: &str) -> StoreResult<Option<Invitation>> {
        Ok(self
            .working
            .invitations
            .values()
            .find(|invitation| invitation.token.expose() == token)
            .cloned())
    }

    async fn insert_invitation(&mut self, invitation: Invitation) -> StoreResult<()> {
        if self
            .working
            .invitations
            .values()
            .any(|existing| existing.token == invitation.token)
        {
            return Err(StoreError::UniqueViolation(
                INVITATION_TOKEN_UNIQUE.to_string(),
            ));
        }
        self.working.invitations.insert(invitation.id, invitation);
        Ok(())
    }

    async fn update_invitation(&mut self, invitation: Invitation) -> StoreResult<()> {
        match self.working.invitations.get_mut(&invitation.id) {
            Some(existing) => {
                *existing = invitation;
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "invitation {} does not exist",
                invitation.id
            ))),
        }
    }

    async fn list_invitations(&mut self, org_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .working
            .invitations
            .values()
            .filter(|invitation| invitation.organization_id == org_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(invitations)
    }

    async fn list_pending_for_email(&mut self, email: &str) -> StoreResult<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .working
            .invitations
            .values()
            .filter(|invitation| {
                invitation.status == InvitationStatus::Pending && invitation.email == email
            })
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(invitations)
    }

    async fn list_stale_pending(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Invitation>> {
        Ok(self
            .working
            .invitations
            .values()
            .filter(|invitation| {
                invitation.status == InvitationStatus::Pending && invitation.is_past_expiry(now)
            })
            .cloned()
            .collect())
    }

    async fn get_preference(&mut self, user_id: Uuid) -> StoreResult<Option<ContextPreference>> {
        Ok(self.working.preferences.get(&user_id).cloned())
    }

    async fn put_preference(&mut self, preference: ContextPreference) -> StoreResult<()> {
        self.working
            .preferences
            .insert(preference.user_id, preference);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        MemoryStore::check_available(&self.unavailable)?;
        self.working.check_deferred()?;
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
