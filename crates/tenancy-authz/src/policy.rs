//! Membership rules shared by every mutating path.
//!
//! Privilege and last-owner checks live here and nowhere else. Each function
//! is pure: callers load the roles and owner count inside their transaction
//! and pass them in, so the decision and the write see the same snapshot.

use tenancy_org::OrganizationRole;

use crate::error::{AuthzError, AuthzResult};

/// Check that `granter` may create a membership or invitation carrying `role`.
///
/// Admins may grant `member` and `viewer`; only owners may grant `admin` or
/// `owner`. Anyone below admin may grant nothing.
///
/// # Examples
///
/// ```
/// use tenancy_authz::policy::check_grant;
/// use tenancy_org::OrganizationRole::*;
///
/// assert!(check_grant(Admin, Member).is_ok());
/// assert!(check_grant(Admin, Admin).is_err());
/// assert!(check_grant(Owner, Owner).is_ok());
/// ```
pub fn check_grant(granter: OrganizationRole, role: OrganizationRole) -> AuthzResult<()> {
    if !granter.can_manage_members() {
        return Err(AuthzError::InsufficientPrivilege(
            "adding members requires admin or owner".to_string(),
        ));
    }
    if role.is_privileged() && granter != OrganizationRole::Owner {
        return Err(AuthzError::InsufficientPrivilege(format!(
            "only owners may grant the {} role",
            role
        )));
    }
    Ok(())
}

/// Check that `caller` may change `current` to `new_role`.
///
/// Only owners change roles. Demoting the sole owner is refused.
pub fn check_role_change(
    caller: OrganizationRole,
    current: OrganizationRole,
    new_role: OrganizationRole,
    owner_count: usize,
) -> AuthzResult<()> {
    if caller != OrganizationRole::Owner {
        return Err(AuthzError::InsufficientPrivilege(
            "only owners may change roles".to_string(),
        ));
    }
    check_last_owner(current, Some(new_role), owner_count)
}

/// Check that `caller` may remove a member currently holding `target`.
///
/// Leaving is open to everyone except the sole owner. Removing someone else
/// takes an owner (anyone) or an admin (members and viewers only).
pub fn check_removal(
    caller: OrganizationRole,
    target: OrganizationRole,
    is_self: bool,
    owner_count: usize,
) -> AuthzResult<()> {
    if !is_self {
        match caller {
            OrganizationRole::Owner => {}
            OrganizationRole::Admin if !target.is_privileged() => {}
            OrganizationRole::Admin => {
                return Err(AuthzError::InsufficientPrivilege(format!(
                    "admins cannot remove an {}",
                    target
                )))
            }
            _ => {
                return Err(AuthzError::InsufficientPrivilege(
                    "removing members requires admin or owner".to_string(),
                ))
            }
        }
    }
    check_last_owner(target, None, owner_count)
}

/// Refuse a change that takes the last owner's role away.
///
/// `after` is the role the member will hold, `None` for removal.
pub fn check_last_owner(
    current: OrganizationRole,
    after: Option<OrganizationRole>,
    owner_count: usize,
) -> AuthzResult<()> {
    let loses_owner = current == OrganizationRole::Owner && after != Some(OrganizationRole::Owner);
    if loses_owner && owner_count <= 1 {
        return Err(AuthzError::LastOwnerProtected);
    }
    Ok(())
}
