//! Permission Evaluator
//!
//! Every organization-scoped operation starts here: the principal's
//! membership is looked up and its role compared against the operation's
//! minimum. No membership means deny, whatever the minimum.

use tenancy_org::{OrganizationMembership, OrganizationRole};
use tenancy_rbac::{Permission, PermissionSet};
use uuid::Uuid;

use crate::engine::{LogFault, Shared};
use crate::error::{AuthzError, AuthzResult};
use crate::principal::Principal;
use crate::store::Transaction;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The principal has no membership in the organization
    NotAMember,
    /// The principal's role is below the required minimum
    InsufficientRole {
        /// Role the principal holds
        actual: OrganizationRole,
        /// Role the operation requires
        required: OrganizationRole,
    },
    /// The principal's role does not carry the permission
    MissingPermission {
        /// Role the principal holds
        actual: OrganizationRole,
        /// Permission the operation requires
        required: Permission,
    },
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Allowed; carries the principal's role
    Allow(OrganizationRole),
    /// Denied
    Deny(DenyReason),
}

impl Decision {
    /// Compare an optional role against a minimum.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_authz::evaluator::{Decision, DenyReason};
    /// use tenancy_org::OrganizationRole::*;
    ///
    /// assert_eq!(Decision::evaluate(Some(Admin), Member), Decision::Allow(Admin));
    /// assert_eq!(Decision::evaluate(None, Viewer), Decision::Deny(DenyReason::NotAMember));
    /// ```
    pub fn evaluate(role: Option<OrganizationRole>, minimum: OrganizationRole) -> Self {
        match role {
            None => Decision::Deny(DenyReason::NotAMember),
            Some(actual) if actual.at_least(minimum) => Decision::Allow(actual),
            Some(actual) => Decision::Deny(DenyReason::InsufficientRole {
                actual,
                required: minimum,
            }),
        }
    }

    /// Check an optional role's default permission set.
    pub fn evaluate_permission(role: Option<OrganizationRole>, permission: &Permission) -> Self {
        match role {
            None => Decision::Deny(DenyReason::NotAMember),
            Some(actual) if PermissionSet::for_role(actual).has(permission) => {
                Decision::Allow(actual)
            }
            Some(actual) => Decision::Deny(DenyReason::MissingPermission {
                actual,
                required: *permission,
            }),
        }
    }

    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// The principal's role, if it has one.
    pub fn role(&self) -> Option<OrganizationRole> {
        match self {
            Decision::Allow(role)
            | Decision::Deny(DenyReason::InsufficientRole { actual: role, .. })
            | Decision::Deny(DenyReason::MissingPermission { actual: role, .. }) => Some(*role),
            Decision::Deny(DenyReason::NotAMember) => None,
        }
    }

    /// Convert to an error result: no membership is `NotAuthorized`, a low
    /// role is `InsufficientPrivilege`.
    pub fn into_result(self) -> AuthzResult<OrganizationRole> {
        match self {
            Decision::Allow(role) => Ok(role),
            Decision::Deny(DenyReason::NotAMember) => Err(AuthzError::NotAuthorized),
            Decision::Deny(DenyReason::InsufficientRole { required, .. }) => {
                Err(AuthzError::InsufficientPrivilege(format!(
                    "requires {} role or higher",
                    required
                )))
            }
            Decision::Deny(DenyReason::MissingPermission { required, .. }) => Err(
                AuthzError::InsufficientPrivilege(format!("missing permission {}", required)),
            ),
        }
    }
}

/// Load the caller's membership or fail `NotAuthorized`.
pub(crate) async fn require_member(
    tx: &mut dyn Transaction,
    org_id: Uuid,
    user_id: Uuid,
) -> AuthzResult<OrganizationMembership> {
    tx.get_membership(org_id, user_id)
        .await?
        .ok_or(AuthzError::NotAuthorized)
}

/// Require at least `minimum` in `org_id`, inside a transaction.
pub(crate) async fn require_role(
    tx: &mut dyn Transaction,
    org_id: Uuid,
    user_id: Uuid,
    minimum: OrganizationRole,
) -> AuthzResult<OrganizationRole> {
    let role = tx.get_membership(org_id, user_id).await?.map(|m| m.role);
    let decision = Decision::evaluate(role, minimum);
    if !decision.is_allowed() {
        tracing::debug!(
            org_id = %org_id,
            user_id = %user_id,
            required = %minimum,
            decision = ?decision,
            "Authorization denied"
        );
    }
    decision.into_result()
}

/// Answers "may this principal act on this organization?".
#[derive(Clone)]
pub struct PermissionEvaluator {
    shared: Shared,
}

impl PermissionEvaluator {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Decide whether `principal` holds at least `minimum` in `org_id`.
    ///
    /// # Arguments
    ///
    /// * `principal` - Authenticated caller
    /// * `org_id` - Target organization
    /// * `minimum` - Lowest acceptable role
    ///
    /// # Returns
    ///
    /// The decision; `Err` only for storage faults
    pub async fn authorize(
        &self,
        principal: &Principal,
        org_id: Uuid,
        minimum: OrganizationRole,
    ) -> AuthzResult<Decision> {
        let role = self.role_of(principal, org_id).await?;
        let decision = Decision::evaluate(role, minimum);
        if !decision.is_allowed() {
            tracing::debug!(
                org_id = %org_id,
                user_id = %principal.user_id,
                required = %minimum,
                decision = ?decision,
                "Authorization denied"
            );
        }
        Ok(decision)
    }

    /// Like [`authorize`](Self::authorize), but a denial is an error.
    pub async fn require(
        &self,
        principal: &Principal,
        org_id: Uuid,
        minimum: OrganizationRole,
    ) -> AuthzResult<OrganizationRole> {
        self.authorize(principal, org_id, minimum)
            .await?
            .into_result()
    }

    /// Decide whether `principal`'s role in `org_id` carries `permission`.
    pub async fn authorize_permission(
        &self,
        principal: &Principal,
        org_id: Uuid,
        permission: &Permission,
    ) -> AuthzResult<Decision> {
        let role = self.role_of(principal, org_id).await?;
        let decision = Decision::evaluate_permission(role, permission);
        if !decision.is_allowed() {
            tracing::debug!(
                org_id = %org_id,
                user_id = %principal.user_id,
                permission = %permission,
                "Permission denied"
            );
        }
        Ok(decision)
    }

    /// The principal's effective permissions in `org_id` (empty for non-members).
    pub async fn permissions(
        &self,
        principal: &Principal,
        org_id: Uuid,
    ) -> AuthzResult<PermissionSet> {
        Ok(self
            .role_of(principal, org_id)
            .await?
            .map(PermissionSet::for_role)
            .unwrap_or_default())
    }

    async fn role_of(
        &self,
        principal: &Principal,
        org_id: Uuid,
    ) -> AuthzResult<Option<OrganizationRole>> {
        let result: AuthzResult<Option<OrganizationRole>> = async {
            let mut tx = self.shared.begin().await?;
            let membership = tx.get_membership(org_id, principal.user_id).await?;
            Ok(membership.map(|m| m.role))
        }
        .await;
        result.log_fault("authorize")
    }
}
