//! Membership Store operations.
//!
//! Each mutating call is one transaction: the caller's role, the target's
//! role, the owner count and the write are all read from and applied to the
//! same snapshot, so two concurrent demotions cannot both pass the
//! last-owner check.

use tenancy_events::MemberEvent;
use tenancy_org::membership::sort_for_listing;
use tenancy_org::{OrganizationMembership, OrganizationRole};
use uuid::Uuid;

use crate::engine::{membership_conflict, LogFault, Shared};
use crate::error::{AuthzError, AuthzResult};
use crate::evaluator::require_member;
use crate::policy;
use crate::principal::Principal;

/// Add, change, remove and list organization members.
#[derive(Clone)]
pub struct MembershipService {
    shared: Shared,
}

impl MembershipService {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Add `user_id` to `org_id` with `role`, invited by the caller.
    ///
    /// The caller must be an admin or owner; only owners may grant `admin`
    /// or `owner`.
    ///
    /// # Errors
    ///
    /// * `NotAuthorized` - caller is not a member
    /// * `InsufficientPrivilege` - caller may not grant `role`
    /// * `AlreadyMember` - `user_id` already belongs to the organization
    pub async fn add_member(
        &self,
        principal: &Principal,
        org_id: Uuid,
        user_id: Uuid,
        role: OrganizationRole,
    ) -> AuthzResult<OrganizationMembership> {
        let result: AuthzResult<OrganizationMembership> = async {
            let mut tx = self.shared.begin().await?;
            let caller = require_member(&mut *tx, org_id, principal.user_id).await?;
            policy::check_grant(caller.role, role)?;

            if tx.get_membership(org_id, user_id).await?.is_some() {
                return Err(AuthzError::AlreadyMember);
            }

            let membership =
                OrganizationMembership::new(org_id, user_id, role, self.shared.clock.now())
                    .with_inviter(principal.user_id);
            tx.insert_membership(membership.clone())
                .await
                .map_err(membership_conflict)?;
            tx.commit().await?;
            Ok(membership)
        }
        .await;
        let membership = result.log_fault("add_member")?;

        tracing::info!(
            org_id = %org_id,
            user_id = %user_id,
            role = %role,
            invited_by = %principal.user_id,
            "Member added"
        );
        self.shared
            .publish(
                MemberEvent::Added {
                    organization_id: org_id,
                    user_id,
                    role,
                    invited_by: Some(principal.user_id),
                }
                .to_event(),
            )
            .await;

        Ok(membership)
    }

    /// Change the role of `user_id` in `org_id`. Owners only.
    ///
    /// # Errors
    ///
    /// * `NotAuthorized` - caller is not a member
    /// * `InsufficientPrivilege` - caller is not an owner
    /// * `NotAMember` - `user_id` does not belong to the organization
    /// * `LastOwnerProtected` - `user_id` is the sole owner and `new_role` is not owner
    pub async fn update_role(
        &self,
        principal: &Principal,
        org_id: Uuid,
        user_id: Uuid,
        new_role: OrganizationRole,
    ) -> AuthzResult<OrganizationMembership> {
        let result: AuthzResult<(OrganizationMembership, OrganizationRole)> = async {
            let mut tx = self.shared.begin().await?;
            let caller = require_member(&mut *tx, org_id, principal.user_id).await?;
            if caller.role != OrganizationRole::Owner {
                return Err(AuthzError::InsufficientPrivilege(
                    "only owners may change roles".to_string(),
                ));
            }

            let target = tx
                .get_membership(org_id, user_id)
                .await?
                .ok_or(AuthzError::NotAMember)?;
            let owner_count = tx.count_owners(org_id).await?;
            policy::check_role_change(caller.role, target.role, new_role, owner_count)?;

            if target.role == new_role {
                return Ok((target, new_role));
            }

            let updated = tx
                .update_membership_role(org_id, user_id, new_role)
                .await?
                .ok_or(AuthzError::NotAMember)?;
            tx.commit().await?;
            Ok((updated, target.role))
        }
        .await;
        let (membership, old_role) = result.log_fault("update_role")?;

        if old_role != new_role {
            tracing::info!(
                org_id = %org_id,
                user_id = %user_id,
                old_role = %old_role,
                new_role = %new_role,
                changed_by = %principal.user_id,
                "Member role changed"
            );
            self.shared
                .publish(
                    MemberEvent::RoleChanged {
                        organization_id: org_id,
                        user_id,
                        old_role,
                        new_role,
                        changed_by: principal.user_id,
                    }
                    .to_event(),
                )
                .await;
        }

        Ok(membership)
    }

    /// Remove `user_id` from `org_id`; `user_id == caller` means leaving.
    ///
    /// # Errors
    ///
    /// * `NotAuthorized` - caller is not a member
    /// * `InsufficientPrivilege` - caller may not remove this member
    /// * `NotAMember` - `user_id` does not belong to the organization
    /// * `LastOwnerProtected` - `user_id` is the sole owner
    pub async fn remove_member(
        &self,
        principal: &Principal,
        org_id: Uuid,
        user_id: Uuid,
    ) -> AuthzResult<()> {
        let result: AuthzResult<()> = async {
            let mut tx = self.shared.begin().await?;
            let caller = require_member(&mut *tx, org_id, principal.user_id).await?;
            let is_self = user_id == principal.user_id;
            if !is_self && !caller.role.can_manage_members() {
                return Err(AuthzError::InsufficientPrivilege(
                    "removing members requires admin or owner".to_string(),
                ));
            }

            let target = tx
                .get_membership(org_id, user_id)
                .await?
                .ok_or(AuthzError::NotAMember)?;
            let owner_count = tx.count_owners(org_id).await?;
            policy::check_removal(caller.role, target.role, is_self, owner_count)?;

            tx.delete_membership(org_id, user_id).await?;
            if let Some(mut preference) = tx.get_preference(user_id).await? {
                if preference.forget_organization(org_id, self.shared.clock.now()) {
                    tx.put_preference(preference).await?;
                }
            }
            tx.commit().await?;
            Ok(())
        }
        .await;
        result.log_fault("remove_member")?;

        tracing::info!(
            org_id = %org_id,
            user_id = %user_id,
            removed_by = %principal.user_id,
            "Member removed"
        );
        self.shared
            .publish(
                MemberEvent::Removed {
                    organization_id: org_id,
                    user_id,
                    removed_by: principal.user_id,
                }
                .to_event(),
            )
            .await;

        Ok(())
    }

    /// Leave `org_id`.
    pub async fn leave(&self, principal: &Principal, org_id: Uuid) -> AuthzResult<()> {
        self.remove_member(principal, org_id, principal.user_id).await
    }

    /// Role of `user_id` in `org_id`, or `None` if not a member.
    pub async fn get_role(&self, org_id: Uuid, user_id: Uuid) -> AuthzResult<Option<OrganizationRole>> {
        let result: AuthzResult<Option<OrganizationRole>> = async {
            let mut tx = self.shared.begin().await?;
            Ok(tx.get_membership(org_id, user_id).await?.map(|m| m.role))
        }
        .await;
        result.log_fault("get_role")
    }

    /// Members of `org_id`: owners, admins, members, viewers, then by join time.
    ///
    /// # Errors
    ///
    /// * `NotAuthorized` - caller is not a member
    pub async fn list_members(
        &self,
        principal: &Principal,
        org_id: Uuid,
    ) -> AuthzResult<Vec<OrganizationMembership>> {
        let result: AuthzResult<Vec<OrganizationMembership>> = async {
            let mut tx = self.shared.begin().await?;
            require_member(&mut *tx, org_id, principal.user_id).await?;
            let mut members = tx.list_memberships(org_id).await?;
            sort_for_listing(&mut members);
            Ok(members)
        }
        .await;
        result.log_fault("list_members")
    }
}

#[cfg(test)]
mod tests {
    use crate::{AuthzEngine, AuthzError, Principal};
    use tenancy_org::OrganizationRole;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_non_member_cannot_add() {
        let engine = AuthzEngine::in_memory();
        let owner = Principal::new(Uuid::now_v7());
        let org = engine.organizations().create(&owner, "Acme", "acme").await.unwrap();

        let stranger = Principal::new(Uuid::now_v7());
        let err = engine
            .members()
            .add_member(&stranger, org.id, Uuid::now_v7(), OrganizationRole::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_owner_promotes_and_demotes() {
        let engine = AuthzEngine::in_memory();
        let owner = Principal::new(Uuid::now_v7());
        let user = Uuid::now_v7();
        let org = engine.organizations().create(&owner, "Acme", "acme").await.unwrap();
        let members = engine.members();
        members
            .add_member(&owner, org.id, user, OrganizationRole::Viewer)
            .await
            .unwrap();

        let promoted = members
            .update_role(&owner, org.id, user, OrganizationRole::Owner)
            .await
            .unwrap();
        assert_eq!(promoted.role, OrganizationRole::Owner);

        // Two owners now, so the creator may step down.
        members
            .update_role(&owner, org.id, owner.user_id, OrganizationRole::Member)
            .await
            .unwrap();
        assert_eq!(
            members.get_role(org.id, owner.user_id).await.unwrap(),
            Some(OrganizationRole::Member)
        );
    }
}
