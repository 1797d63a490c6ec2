//! Active organization resolution.
//!
//! A request either names the organization it acts on or falls back to the
//! user's persisted preference. A preference pointing at an organization the
//! user has left is cleared on read.

use serde::{Deserialize, Serialize};
use tenancy_org::{ContextPreference, OrganizationSummary};
use uuid::Uuid;

use crate::engine::{LogFault, Shared};
use crate::error::{AuthzError, AuthzResult};
use crate::organization::user_organizations;
use crate::principal::Principal;
use crate::store::Transaction;

/// Number of recent organizations reported in [`AuthContext`].
pub const RECENT_LIMIT: usize = 5;

/// Everything a client needs to render an organization switcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user
    pub user_id: Uuid,

    /// Organization acted as; `None` is the personal workspace
    pub active_organization: Option<OrganizationSummary>,

    /// Every organization the user belongs to, in join order
    pub organizations: Vec<OrganizationSummary>,

    /// Recently selected organizations the user still belongs to
    pub recent_organizations: Vec<Uuid>,
}

/// Resolves and switches the organization a principal acts as.
#[derive(Clone)]
pub struct ContextResolver {
    shared: Shared,
}

impl ContextResolver {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Resolve the organization for a request.
    ///
    /// With `requested`, the principal must be a member of it. Without, the
    /// persisted preference applies: an unset preference falls back to the
    /// first organization joined, an explicit personal-workspace choice
    /// resolves to `None`, and a stale preference is cleared before falling
    /// back.
    ///
    /// # Errors
    ///
    /// * `NotAMember` - `requested` names an organization the principal is not in
    pub async fn resolve(
        &self,
        principal: &Principal,
        requested: Option<Uuid>,
    ) -> AuthzResult<Option<OrganizationSummary>> {
        let result: AuthzResult<Option<OrganizationSummary>> = async {
            let mut tx = self.shared.begin().await?;
            match requested {
                Some(org_id) => {
                    let summary = self
                        .member_summary(&mut *tx, org_id, principal.user_id)
                        .await?
                        .ok_or(AuthzError::NotAMember)?;
                    Ok(Some(summary))
                }
                None => self.resolve_default(tx, principal.user_id).await,
            }
        }
        .await;
        result.log_fault("resolve_context")
    }

    /// Persist the organization the principal acts as by default.
    ///
    /// `None` switches to the personal workspace.
    ///
    /// # Errors
    ///
    /// * `NotAMember` - principal does not belong to `org_id`
    pub async fn switch_active_organization(
        &self,
        principal: &Principal,
        org_id: Option<Uuid>,
    ) -> AuthzResult<Option<OrganizationSummary>> {
        let user_id = principal.user_id;
        let result: AuthzResult<Option<OrganizationSummary>> = async {
            let mut tx = self.shared.begin().await?;
            let now = self.shared.clock.now();
            let mut pref = tx
                .get_preference(user_id)
                .await?
                .unwrap_or_else(|| ContextPreference::new(user_id, now));

            let summary = match org_id {
                Some(org_id) => {
                    let summary = self
                        .member_summary(&mut *tx, org_id, user_id)
                        .await?
                        .ok_or(AuthzError::NotAMember)?;
                    pref.switch_organization(org_id, now);
                    Some(summary)
                }
                None => {
                    pref.clear_active(now);
                    None
                }
            };

            tx.put_preference(pref).await?;
            tx.commit().await?;
            Ok(summary)
        }
        .await;
        let summary = result.log_fault("switch_organization")?;

        match &summary {
            Some(org) => tracing::info!(user_id = %user_id, org_id = %org.id, "Switched organization"),
            None => tracing::info!(user_id = %user_id, "Switched to personal workspace"),
        }
        Ok(summary)
    }

    /// Full context for the principal: active organization, memberships and
    /// recent history.
    pub async fn auth_context(&self, principal: &Principal) -> AuthzResult<AuthContext> {
        let active = self.resolve(principal, None).await?;

        let result: AuthzResult<AuthContext> = async {
            let mut tx = self.shared.begin().await?;
            let organizations = user_organizations(&mut *tx, principal.user_id).await?;
            let recent_organizations = match tx.get_preference(principal.user_id).await? {
                Some(pref) => pref
                    .recent(RECENT_LIMIT)
                    .iter()
                    .filter(|id| organizations.iter().any(|org| org.id == **id))
                    .copied()
                    .collect(),
                None => Vec::new(),
            };
            Ok(AuthContext {
                user_id: principal.user_id,
                active_organization: active,
                organizations,
                recent_organizations,
            })
        }
        .await;
        result.log_fault("auth_context")
    }

    async fn resolve_default(
        &self,
        mut tx: Box<dyn Transaction>,
        user_id: Uuid,
    ) -> AuthzResult<Option<OrganizationSummary>> {
        let pref = tx.get_preference(user_id).await?;
        let Some(mut pref) = pref.filter(|p| !p.is_unset()) else {
            return Ok(user_organizations(&mut *tx, user_id).await?.into_iter().next());
        };

        let Some(active) = pref.active_organization_id else {
            return Ok(None);
        };

        if let Some(summary) = self.member_summary(&mut *tx, active, user_id).await? {
            return Ok(Some(summary));
        }

        tracing::warn!(
            user_id = %user_id,
            org_id = %active,
            "Clearing stale active organization"
        );
        pref.forget_organization(active, self.shared.clock.now());
        tx.put_preference(pref).await?;
        let fallback = user_organizations(&mut *tx, user_id).await?.into_iter().next();
        tx.commit().await?;
        Ok(fallback)
    }

    async fn member_summary(
        &self,
        tx: &mut dyn Transaction,
        org_id: Uuid,
        user_id: Uuid,
    ) -> AuthzResult<Option<OrganizationSummary>> {
        let Some(membership) = tx.get_membership(org_id, user_id).await? else {
            return Ok(None);
        };
        Ok(tx
            .get_organization(org_id)
            .await?
            .map(|org| org.summary_for(membership.role)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{AuthzEngine, Principal};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_user_without_organizations_resolves_to_personal_workspace() {
        let engine = AuthzEngine::in_memory();
        let user = Principal::new(Uuid::now_v7());

        assert_eq!(engine.context().resolve(&user, None).await.unwrap(), None);
        let auth = engine.context().auth_context(&user).await.unwrap();
        assert!(auth.organizations.is_empty());
        assert!(auth.recent_organizations.is_empty());
    }
}
