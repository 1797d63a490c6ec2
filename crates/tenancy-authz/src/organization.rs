//! Organization lifecycle.
//!
//! Creating an organization bootstraps its creator as the first owner in
//! the same transaction. That bootstrap is the only membership insert that
//! skips the grant check, and it is reachable only from here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tenancy_events::{MemberEvent, OrganizationEvent};
use tenancy_org::organization::{is_valid_name, is_valid_slug, MAX_NAME_LEN, MAX_SLUG_LEN};
use tenancy_org::{Organization, OrganizationMembership, OrganizationRole, OrganizationSummary};
use uuid::Uuid;

use crate::engine::{membership_conflict, LogFault, Shared};
use crate::error::{AuthzError, AuthzResult, StoreError};
use crate::evaluator::require_role;
use crate::principal::Principal;
use crate::store::{Transaction, ORGANIZATION_SLUG_UNIQUE};

/// Changes applied by [`OrganizationService::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    /// New display name
    pub name: Option<String>,

    /// Settings entries to set; a `null` value deletes the key
    pub settings: Option<HashMap<String, serde_json::Value>>,
}

/// Create, read, update and delete organizations.
#[derive(Clone)]
pub struct OrganizationService {
    shared: Shared,
}

impl OrganizationService {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Create an organization owned by the caller.
    ///
    /// # Arguments
    ///
    /// * `principal` - Creator; becomes the first owner
    /// * `name` - Display name, 1-255 characters
    /// * `slug` - URL slug, 1-100 characters of `[a-z0-9-]`
    ///
    /// # Errors
    ///
    /// * `InvalidInput` - name or slug malformed
    /// * `SlugTaken` - slug already used
    pub async fn create(
        &self,
        principal: &Principal,
        name: &str,
        slug: &str,
    ) -> AuthzResult<Organization> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(AuthzError::InvalidInput(format!(
                "name must be 1-{} characters",
                MAX_NAME_LEN
            )));
        }
        if !is_valid_slug(slug) {
            return Err(AuthzError::InvalidInput(format!(
                "slug must be 1-{} characters of a-z, 0-9 and '-'",
                MAX_SLUG_LEN
            )));
        }

        let result: AuthzResult<Organization> = async {
            let now = self.shared.clock.now();
            let org = Organization::new(name, slug, now);

            let mut tx = self.shared.begin().await?;
            tx.insert_organization(org.clone())
                .await
                .map_err(|e| slug_conflict(e, slug))?;
            bootstrap_owner(&mut *tx, &org, principal.user_id).await?;
            tx.commit().await.map_err(|e| slug_conflict(e, slug))?;
            Ok(org)
        }
        .await;
        let org = result.log_fault("create_organization")?;

        tracing::info!(
            org_id = %org.id,
            slug = %org.slug,
            created_by = %principal.user_id,
            "Organization created"
        );
        self.shared
            .publish(
                OrganizationEvent::Created {
                    organization_id: org.id,
                    name: org.name.clone(),
                    slug: org.slug.clone(),
                    created_by: principal.user_id,
                }
                .to_event(),
            )
            .await;
        self.shared
            .publish(
                MemberEvent::Added {
                    organization_id: org.id,
                    user_id: principal.user_id,
                    role: OrganizationRole::Owner,
                    invited_by: None,
                }
                .to_event(),
            )
            .await;

        Ok(org)
    }

    /// Get an organization. Any member may read it; anyone else gets
    /// `NotAuthorized` whether or not the organization exists.
    pub async fn get(&self, principal: &Principal, org_id: Uuid) -> AuthzResult<Organization> {
        let result: AuthzResult<Organization> = async {
            let mut tx = self.shared.begin().await?;
            require_role(&mut *tx, org_id, principal.user_id, OrganizationRole::Viewer).await?;
            let org = tx
                .get_organization(org_id)
                .await?
                .ok_or(AuthzError::NotFound("organization"))?;
            Ok(org)
        }
        .await;
        result.log_fault("get_organization")
    }

    /// Rename an organization or change its settings. Admins and owners.
    pub async fn update(
        &self,
        principal: &Principal,
        org_id: Uuid,
        update: OrganizationUpdate,
    ) -> AuthzResult<Organization> {
        if let Some(name) = &update.name {
            if !is_valid_name(name) {
                return Err(AuthzError::InvalidInput(format!(
                    "name must be 1-{} characters",
                    MAX_NAME_LEN
                )));
            }
        }

        let result: AuthzResult<Organization> = async {
            let mut tx = self.shared.begin().await?;
            require_role(&mut *tx, org_id, principal.user_id, OrganizationRole::Admin).await?;
            let mut org = tx
                .get_organization(org_id)
                .await?
                .ok_or(AuthzError::NotFound("organization"))?;

            if let Some(name) = update.name {
                org.name = name.trim().to_string();
            }
            if let Some(settings) = update.settings {
                for (key, value) in settings {
                    if value.is_null() {
                        org.settings.remove(&key);
                    } else {
                        org.settings.insert(key, value);
                    }
                }
            }
            org.updated_at = self.shared.clock.now();

            tx.update_organization(org.clone()).await?;
            tx.commit().await?;
            Ok(org)
        }
        .await;
        let org = result.log_fault("update_organization")?;

        tracing::info!(org_id = %org_id, updated_by = %principal.user_id, "Organization updated");
        Ok(org)
    }

    /// Delete an organization with all memberships and invitations. Owners only.
    pub async fn delete(&self, principal: &Principal, org_id: Uuid) -> AuthzResult<()> {
        let result: AuthzResult<()> = async {
            let mut tx = self.shared.begin().await?;
            require_role(&mut *tx, org_id, principal.user_id, OrganizationRole::Owner).await?;
            if tx.get_organization(org_id).await?.is_none() {
                return Err(AuthzError::NotFound("organization"));
            }
            tx.delete_organization(org_id).await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        result.log_fault("delete_organization")?;

        tracing::info!(org_id = %org_id, deleted_by = %principal.user_id, "Organization deleted");
        self.shared
            .publish(
                OrganizationEvent::Deleted {
                    organization_id: org_id,
                    deleted_by: principal.user_id,
                }
                .to_event(),
            )
            .await;

        Ok(())
    }

    /// Organizations the caller belongs to, with the caller's role, in join order.
    pub async fn list_for_user(&self, principal: &Principal) -> AuthzResult<Vec<OrganizationSummary>> {
        let result: AuthzResult<Vec<OrganizationSummary>> = async {
            let mut tx = self.shared.begin().await?;
            user_organizations(&mut *tx, principal.user_id).await
        }
        .await;
        result.log_fault("list_user_organizations")
    }
}

fn slug_conflict(err: StoreError, slug: &str) -> AuthzError {
    match err {
        StoreError::UniqueViolation(constraint) if constraint == ORGANIZATION_SLUG_UNIQUE => {
            AuthzError::SlugTaken(slug.to_string())
        }
        other => other.into(),
    }
}

/// Insert the creator's owner membership for a freshly inserted organization.
async fn bootstrap_owner(
    tx: &mut dyn Transaction,
    org: &Organization,
    creator: Uuid,
) -> AuthzResult<()> {
    let membership =
        OrganizationMembership::new(org.id, creator, OrganizationRole::Owner, org.created_at);
    tx.insert_membership(membership)
        .await
        .map_err(membership_conflict)
}

/// Summaries of every organization `user_id` belongs to, in join order.
pub(crate) async fn user_organizations(
    tx: &mut dyn Transaction,
    user_id: Uuid,
) -> AuthzResult<Vec<OrganizationSummary>> {
    let memberships = tx.list_user_memberships(user_id).await?;
    let mut summaries = Vec::with_capacity(memberships.len());
    for membership in memberships {
        if let Some(org) = tx.get_organization(membership.organization_id).await? {
            summaries.push(org.summary_for(membership.role));
        }
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthzEngine;

    #[test]
    fn test_slug_conflict_mapping() {
        let err = slug_conflict(
            StoreError::UniqueViolation(ORGANIZATION_SLUG_UNIQUE.to_string()),
            "acme",
        );
        assert!(matches!(err, AuthzError::SlugTaken(ref s) if s == "acme"));

        let err = slug_conflict(StoreError::Backend("down".to_string()), "acme");
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_list_for_user_in_join_order() {
        let engine = AuthzEngine::in_memory();
        let user = Principal::new(Uuid::now_v7());
        let orgs = engine.organizations();
        let a = orgs.create(&user, "A", "a").await.unwrap();
        let b = orgs.create(&user, "B", "b").await.unwrap();

        let listed = orgs.list_for_user(&user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|o| o.role == OrganizationRole::Owner));
        let ids: Vec<Uuid> = listed.iter().map(|o| o.id).collect();
        assert!(ids.contains(&a.id) && ids.contains(&b.id));
    }
}
