//! Invitation lifecycle.
//!
//! ```text
//! create ──→ pending ──accept──→ accepted
//!               │ ├──revoke──→ revoked
//!               │ └──expiry──→ expired
//!               └─superseded─→ expired
//! ```
//!
//! Accepting inserts the membership and marks the invitation accepted in
//! one transaction. A pending invitation past its expiry is never
//! redeemable, whether or not the sweeper has persisted the transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenancy_events::{InvitationEvent, MemberEvent};
use tenancy_org::invitation::normalize_email;
use tenancy_org::{
    Invitation, InvitationStatus, InvitationSummary, OrganizationMembership, OrganizationRole,
};
use uuid::Uuid;

use crate::engine::{membership_conflict, LogFault, Shared};
use crate::error::{AuthzError, AuthzResult};
use crate::evaluator::{require_member, require_role};
use crate::policy;
use crate::principal::Principal;
use crate::retry::with_retry_if;
use crate::token::fingerprint;

/// Public view of an invitation, looked up by token before sign-in.
///
/// Carries enough to render "X invited you to Y" and never the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub organization_slug: String,
    pub email: String,
    pub role: OrganizationRole,
    /// Status as observed now; a lapsed pending invitation reads `expired`
    pub status: InvitationStatus,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedInvitation {
    /// The membership created for the accepting user
    pub membership: OrganizationMembership,

    /// The invitation, now accepted
    pub invitation: InvitationSummary,
}

/// What an accept attempt did to storage before deciding its outcome.
enum AcceptOutcome {
    Joined(Invitation, OrganizationMembership),
    Lapsed(Invitation),
    AlreadyJoined(Invitation),
}

struct Issued {
    invitation: Invitation,
    superseded: Vec<Invitation>,
}

/// Create, redeem, revoke and expire invitations.
#[derive(Clone)]
pub struct InvitationService {
    shared: Shared,
}

impl InvitationService {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Invite `email` to join `org_id` with `role`.
    ///
    /// Any pending invitation for the same address in the same organization
    /// is expired and replaced. The new token travels only in the
    /// `invitation.issued` event.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` - email malformed
    /// * `NotAuthorized` - caller is not a member
    /// * `InsufficientPrivilege` - caller below admin, or may not grant `role`
    /// * `AlreadyMember` - the address belongs to an existing member
    pub async fn create(
        &self,
        principal: &Principal,
        org_id: Uuid,
        email: &str,
        role: OrganizationRole,
    ) -> AuthzResult<InvitationSummary> {
        let email = normalize_email(email)
            .ok_or_else(|| AuthzError::InvalidInput(format!("invalid email: {}", email)))?;

        let this = self;
        let email_ref: &str = &email;
        let result = with_retry_if(
            &self.shared.config.create_retry(),
            move || this.try_create(principal, org_id, email_ref, role),
            |e: &AuthzError| e.is_retryable(),
        )
        .await;
        let issued = result.log_fault("create_invitation")?;
        let invitation = issued.invitation;

        for old in &issued.superseded {
            tracing::info!(
                invitation_id = %old.id,
                org_id = %org_id,
                "Pending invitation superseded"
            );
            self.publish_expired(old).await;
        }
        tracing::info!(
            invitation_id = %invitation.id,
            org_id = %org_id,
            role = %role,
            invited_by = %principal.user_id,
            token = %fingerprint(&invitation.token),
            "Invitation issued"
        );
        self.shared
            .publish(
                InvitationEvent::Issued {
                    invitation_id: invitation.id,
                    organization_id: org_id,
                    email: invitation.email.clone(),
                    role,
                    token: invitation.token.expose().to_string(),
                    invited_by: principal.user_id,
                    expires_at: invitation.expires_at,
                }
                .to_event(),
            )
            .await;

        Ok(invitation.summary(self.shared.clock.now()))
    }

    async fn try_create(
        &self,
        principal: &Principal,
        org_id: Uuid,
        email: &str,
        role: OrganizationRole,
    ) -> AuthzResult<Issued> {
        let existing_user = self.shared.directory.find_user_by_email(email).await?;

        let mut tx = self.shared.begin().await?;
        let caller = require_role(&mut *tx, org_id, principal.user_id, OrganizationRole::Admin)
            .await?;
        policy::check_grant(caller, role)?;

        if let Some(user_id) = existing_user {
            if tx.get_membership(org_id, user_id).await?.is_some() {
                return Err(AuthzError::AlreadyMember);
            }
        }

        let now = self.shared.clock.now();
        let mut superseded = Vec::new();
        for mut old in tx.list_pending_for_email(email).await? {
            if old.organization_id != org_id {
                continue;
            }
            old.transition(InvitationStatus::Expired)?;
            tx.update_invitation(old.clone()).await?;
            superseded.push(old);
        }

        let invitation = Invitation::new(
            org_id,
            email,
            role,
            self.shared.tokens.generate(),
            principal.user_id,
            now,
            self.shared.config.invitation_ttl(),
        );
        tx.insert_invitation(invitation.clone()).await?;
        tx.commit().await?;

        Ok(Issued {
            invitation,
            superseded,
        })
    }

    /// Redeem an invitation token for the signed-in principal.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown token
    /// * `InvalidState` - invitation already accepted, revoked or expired
    /// * `Expired` - invitation lapsed; the transition is persisted
    /// * `EmailMismatch` - principal's verified email differs from the invitation
    /// * `AlreadyMember` - principal already belongs; the invitation is consumed
    /// * `InsufficientPrivilege` - the inviter can no longer grant the role
    pub async fn accept(
        &self,
        token: &str,
        principal: &Principal,
    ) -> AuthzResult<AcceptedInvitation> {
        let result: AuthzResult<AcceptOutcome> = async {
            let mut tx = self.shared.begin().await?;
            let mut invitation = tx
                .find_invitation_by_token(token)
                .await?
                .ok_or(AuthzError::NotFound("invitation"))?;

            if invitation.status != InvitationStatus::Pending {
                return Err(AuthzError::InvalidState(invitation.status));
            }

            let now = self.shared.clock.now();
            if invitation.is_past_expiry(now) {
                invitation.transition(InvitationStatus::Expired)?;
                tx.update_invitation(invitation.clone()).await?;
                tx.commit().await?;
                return Ok(AcceptOutcome::Lapsed(invitation));
            }

            match principal.verified_email.as_deref() {
                Some(email) if invitation.is_addressed_to(email) => {}
                _ => return Err(AuthzError::EmailMismatch),
            }

            let org_id = invitation.organization_id;
            if tx.get_membership(org_id, principal.user_id).await?.is_some() {
                invitation.accept(principal.user_id, now)?;
                tx.update_invitation(invitation.clone()).await?;
                tx.commit().await?;
                return Ok(AcceptOutcome::AlreadyJoined(invitation));
            }

            let inviter = tx
                .get_membership(org_id, invitation.invited_by)
                .await?
                .ok_or_else(|| {
                    AuthzError::InsufficientPrivilege("inviter is no longer a member".to_string())
                })?;
            policy::check_grant(inviter.role, invitation.role)?;

            let membership =
                OrganizationMembership::new(org_id, principal.user_id, invitation.role, now)
                    .with_inviter(invitation.invited_by)
                    .with_metadata("invitation_id", serde_json::json!(invitation.id));
            tx.insert_membership(membership.clone())
                .await
                .map_err(membership_conflict)?;
            invitation.accept(principal.user_id, now)?;
            tx.update_invitation(invitation.clone()).await?;
            tx.commit().await?;
            Ok(AcceptOutcome::Joined(invitation, membership))
        }
        .await;

        match result.log_fault("accept_invitation")? {
            AcceptOutcome::Lapsed(invitation) => {
                tracing::info!(invitation_id = %invitation.id, "Invitation expired on redemption");
                self.publish_expired(&invitation).await;
                Err(AuthzError::Expired)
            }
            AcceptOutcome::AlreadyJoined(invitation) => {
                tracing::info!(
                    invitation_id = %invitation.id,
                    user_id = %principal.user_id,
                    "Invitation consumed by existing member"
                );
                self.publish_accepted(&invitation, principal.user_id).await;
                Err(AuthzError::AlreadyMember)
            }
            AcceptOutcome::Joined(invitation, membership) => {
                tracing::info!(
                    invitation_id = %invitation.id,
                    org_id = %membership.organization_id,
                    user_id = %membership.user_id,
                    role = %membership.role,
                    "Invitation accepted"
                );
                self.shared
                    .publish(
                        MemberEvent::Added {
                            organization_id: membership.organization_id,
                            user_id: membership.user_id,
                            role: membership.role,
                            invited_by: membership.invited_by,
                        }
                        .to_event(),
                    )
                    .await;
                self.publish_accepted(&invitation, principal.user_id).await;
                Ok(AcceptedInvitation {
                    invitation: invitation.summary(self.shared.clock.now()),
                    membership,
                })
            }
        }
    }

    /// Revoke a pending invitation. Admins and owners of its organization.
    ///
    /// # Errors
    ///
    /// * `NotFound` - unknown invitation
    /// * `NotAuthorized` / `InsufficientPrivilege` - caller below admin
    /// * `InvalidState` - invitation is not pending (a lapsed one is persisted as expired)
    pub async fn revoke(
        &self,
        principal: &Principal,
        invitation_id: Uuid,
    ) -> AuthzResult<InvitationSummary> {
        let result: AuthzResult<Result<Invitation, Invitation>> = async {
            let mut tx = self.shared.begin().await?;
            let mut invitation = tx
                .get_invitation(invitation_id)
                .await?
                .ok_or(AuthzError::NotFound("invitation"))?;
            require_role(
                &mut *tx,
                invitation.organization_id,
                principal.user_id,
                OrganizationRole::Admin,
            )
            .await?;

            if invitation.status == InvitationStatus::Pending
                && invitation.is_past_expiry(self.shared.clock.now())
            {
                invitation.transition(InvitationStatus::Expired)?;
                tx.update_invitation(invitation.clone()).await?;
                tx.commit().await?;
                return Ok(Err(invitation));
            }

            invitation.transition(InvitationStatus::Revoked)?;
            tx.update_invitation(invitation.clone()).await?;
            tx.commit().await?;
            Ok(Ok(invitation))
        }
        .await;

        let invitation = match result.log_fault("revoke_invitation")? {
            Ok(invitation) => invitation,
            Err(lapsed) => {
                self.publish_expired(&lapsed).await;
                return Err(AuthzError::InvalidState(InvitationStatus::Expired));
            }
        };

        tracing::info!(
            invitation_id = %invitation.id,
            org_id = %invitation.organization_id,
            revoked_by = %principal.user_id,
            "Invitation revoked"
        );
        self.shared
            .publish(
                InvitationEvent::Revoked {
                    invitation_id: invitation.id,
                    organization_id: invitation.organization_id,
                    revoked_by: principal.user_id,
                }
                .to_event(),
            )
            .await;

        Ok(invitation.summary(self.shared.clock.now()))
    }

    /// Look up an invitation by token for display. Never writes.
    pub async fn get_by_token(&self, token: &str) -> AuthzResult<InvitationView> {
        let result: AuthzResult<InvitationView> = async {
            let mut tx = self.shared.begin().await?;
            let invitation = tx
                .find_invitation_by_token(token)
                .await?
                .ok_or(AuthzError::NotFound("invitation"))?;
            self.view(&mut *tx, &invitation).await
        }
        .await;
        result.log_fault("get_invitation_by_token")
    }

    /// List an organization's invitations, newest first. Any member.
    pub async fn list(
        &self,
        principal: &Principal,
        org_id: Uuid,
    ) -> AuthzResult<Vec<InvitationSummary>> {
        let result: AuthzResult<Vec<InvitationSummary>> = async {
            let mut tx = self.shared.begin().await?;
            require_member(&mut *tx, org_id, principal.user_id).await?;
            let now = self.shared.clock.now();
            Ok(tx
                .list_invitations(org_id)
                .await?
                .iter()
                .map(|inv| inv.summary(now))
                .collect())
        }
        .await;
        result.log_fault("list_invitations")
    }

    /// Redeemable invitations addressed to the principal's verified email.
    pub async fn list_pending_for_email(
        &self,
        principal: &Principal,
    ) -> AuthzResult<Vec<InvitationView>> {
        let Some(email) = principal.verified_email.as_deref().and_then(normalize_email) else {
            return Ok(Vec::new());
        };

        let result: AuthzResult<Vec<InvitationView>> = async {
            let mut tx = self.shared.begin().await?;
            let now = self.shared.clock.now();
            let mut views = Vec::new();
            for invitation in tx.list_pending_for_email(&email).await? {
                if invitation.is_past_expiry(now) {
                    continue;
                }
                views.push(self.view(&mut *tx, &invitation).await?);
            }
            Ok(views)
        }
        .await;
        result.log_fault("list_pending_invitations")
    }

    /// Persist `expired` on every pending invitation past its expiry.
    ///
    /// # Returns
    ///
    /// Number of invitations transitioned
    pub async fn expire_stale(&self) -> AuthzResult<usize> {
        let result: AuthzResult<Vec<Invitation>> = async {
            let mut tx = self.shared.begin().await?;
            let now = self.shared.clock.now();
            let mut expired = Vec::new();
            for mut invitation in tx.list_stale_pending(now).await? {
                invitation.transition(InvitationStatus::Expired)?;
                tx.update_invitation(invitation.clone()).await?;
                expired.push(invitation);
            }
            tx.commit().await?;
            Ok(expired)
        }
        .await;
        let expired = result.log_fault("expire_stale_invitations")?;

        for invitation in &expired {
            self.publish_expired(invitation).await;
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired stale invitations");
        }
        Ok(expired.len())
    }

    async fn view(
        &self,
        tx: &mut dyn crate::store::Transaction,
        invitation: &Invitation,
    ) -> AuthzResult<InvitationView> {
        let org = tx
            .get_organization(invitation.organization_id)
            .await?
            .ok_or(AuthzError::NotFound("organization"))?;
        Ok(InvitationView {
            id: invitation.id,
            organization_id: org.id,
            organization_name: org.name,
            organization_slug: org.slug,
            email: invitation.email.clone(),
            role: invitation.role,
            status: invitation.effective_status(self.shared.clock.now()),
            invited_by: invitation.invited_by,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            accepted_at: invitation.accepted_at,
        })
    }

    async fn publish_expired(&self, invitation: &Invitation) {
        self.shared
            .publish(
                InvitationEvent::Expired {
                    invitation_id: invitation.id,
                    organization_id: invitation.organization_id,
                }
                .to_event(),
            )
            .await;
    }

    async fn publish_accepted(&self, invitation: &Invitation, user_id: Uuid) {
        self.shared
            .publish(
                InvitationEvent::Accepted {
                    invitation_id: invitation.id,
                    organization_id: invitation.organization_id,
                    user_id,
                }
                .to_event(),
            )
            .await;
    }
}
