//! Integration tests for membership and invitation workflows.
//!
//! Each test drives the public engine API against the in-memory store with
//! a manual clock and scripted invitation tokens, so expiry and token
//! lookups are deterministic.

mod common;

use chrono::Duration;
use common::TestFixture;
use tenancy_authz::{AuthzConfig, AuthzError, Principal};
use tenancy_events::InvitationEvent;
use tenancy_org::{InvitationStatus, OrganizationRole};
use uuid::Uuid;

#[tokio::test]
async fn test_reinvite_supersedes_pending_invitation() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;

    let members = fx.engine.members().list_members(&owner, org.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, owner.user_id);
    assert_eq!(members[0].role, OrganizationRole::Owner);

    let invitations = fx.engine.invitations();
    let first = invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();
    assert_eq!(first.status, InvitationStatus::Pending);

    fx.clock.advance(Duration::minutes(1));
    let second = invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Admin)
        .await
        .unwrap();

    let listed = invitations.list(&owner, org.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[0].status, InvitationStatus::Pending);
    assert_eq!(listed[0].role, OrganizationRole::Admin);
    assert_eq!(listed[1].id, first.id);
    assert_eq!(listed[1].status, InvitationStatus::Expired);
}

#[tokio::test]
async fn test_accept_with_different_email_is_rejected() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    fx.engine
        .invitations()
        .create(&owner, org.id, "b@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    let a = fx.user("a@x.com").await;
    let err = fx.engine.invitations().accept("token-0", &a).await.unwrap_err();
    assert!(matches!(err, AuthzError::EmailMismatch));
    assert_eq!(fx.engine.members().get_role(org.id, a.user_id).await.unwrap(), None);

    let unverified = Principal::new(Uuid::now_v7());
    let err = fx
        .engine
        .invitations()
        .accept("token-0", &unverified)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::EmailMismatch));
}

#[tokio::test]
async fn test_sole_owner_cannot_leave_or_demote_self() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let members = fx.engine.members();

    let err = members.leave(&owner, org.id).await.unwrap_err();
    assert!(matches!(err, AuthzError::LastOwnerProtected));

    let err = members
        .update_role(&owner, org.id, owner.user_id, OrganizationRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::LastOwnerProtected));

    let second = fx.user("second@acme.test").await;
    members
        .add_member(&owner, org.id, second.user_id, OrganizationRole::Owner)
        .await
        .unwrap();
    members.leave(&owner, org.id).await.unwrap();

    assert_eq!(members.get_role(org.id, owner.user_id).await.unwrap(), None);
    assert_eq!(
        members.get_role(org.id, second.user_id).await.unwrap(),
        Some(OrganizationRole::Owner)
    );
}

#[tokio::test]
async fn test_admin_cannot_grant_admin() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let admin = fx.user("admin@acme.test").await;
    let members = fx.engine.members();
    members
        .add_member(&owner, org.id, admin.user_id, OrganizationRole::Admin)
        .await
        .unwrap();

    let user = Uuid::now_v7();
    let err = members
        .add_member(&admin, org.id, user, OrganizationRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientPrivilege(_)));

    let added = members
        .add_member(&admin, org.id, user, OrganizationRole::Member)
        .await
        .unwrap();
    assert_eq!(added.role, OrganizationRole::Member);
    assert_eq!(added.invited_by, Some(admin.user_id));
}

#[tokio::test]
async fn test_lapsed_invitation_reads_expired_and_cannot_be_accepted() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let invitations = fx.engine.invitations();
    invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    fx.clock.advance(Duration::days(8));

    let view = invitations.get_by_token("token-0").await.unwrap();
    assert_eq!(view.status, InvitationStatus::Expired);
    assert_eq!(view.organization_slug, "acme");

    let invitee = fx.user("a@x.com").await;
    let err = invitations.accept("token-0", &invitee).await.unwrap_err();
    assert!(matches!(err, AuthzError::Expired));
    assert_eq!(
        fx.engine.members().get_role(org.id, invitee.user_id).await.unwrap(),
        None
    );

    // The transition is now persisted.
    let err = invitations.accept("token-0", &invitee).await.unwrap_err();
    assert!(matches!(err, AuthzError::InvalidState(InvitationStatus::Expired)));
}

#[tokio::test]
async fn test_accept_creates_membership_and_consumes_token() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let mut events = fx.subscribe("tenancy.#").await;

    fx.engine
        .invitations()
        .create(&owner, org.id, "New.Hire@X.com", OrganizationRole::Member)
        .await
        .unwrap();
    let invitee = fx.user("new.hire@x.com").await;

    let accepted = fx
        .engine
        .invitations()
        .accept("token-0", &invitee)
        .await
        .unwrap();
    assert_eq!(accepted.membership.role, OrganizationRole::Member);
    assert_eq!(accepted.membership.invited_by, Some(owner.user_id));
    assert_eq!(accepted.invitation.status, InvitationStatus::Accepted);
    assert_eq!(accepted.invitation.accepted_by, Some(invitee.user_id));
    assert_eq!(
        accepted.membership.metadata["invitation_id"],
        serde_json::json!(accepted.invitation.id)
    );

    assert_eq!(
        TestFixture::drain(&mut events),
        vec!["invitation.issued", "member.added", "invitation.accepted"]
    );

    let err = fx
        .engine
        .invitations()
        .accept("token-0", &invitee)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InvalidState(InvitationStatus::Accepted)));
}

#[tokio::test]
async fn test_issued_event_carries_token() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let mut issued = fx.subscribe("tenancy.invitation.issued").await;

    let summary = fx
        .engine
        .invitations()
        .create(&owner, org.id, "a@x.com", OrganizationRole::Viewer)
        .await
        .unwrap();

    let event = issued.try_recv().unwrap();
    assert_eq!(event.org_id, Some(org.id));
    match event.parse_payload::<InvitationEvent>().unwrap() {
        InvitationEvent::Issued {
            invitation_id,
            token,
            email,
            ..
        } => {
            assert_eq!(invitation_id, summary.id);
            assert_eq!(token, "token-0");
            assert_eq!(email, "a@x.com");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_token() {
    let fx = TestFixture::new();
    let user = fx.user("a@x.com").await;

    let err = fx.engine.invitations().get_by_token("nope").await.unwrap_err();
    assert!(matches!(err, AuthzError::NotFound("invitation")));
    let err = fx.engine.invitations().accept("nope", &user).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_invite_privileges() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let admin = fx.user("admin@acme.test").await;
    let viewer = fx.user("viewer@acme.test").await;
    let outsider = fx.user("out@else.test").await;
    let members = fx.engine.members();
    members
        .add_member(&owner, org.id, admin.user_id, OrganizationRole::Admin)
        .await
        .unwrap();
    members
        .add_member(&owner, org.id, viewer.user_id, OrganizationRole::Viewer)
        .await
        .unwrap();

    let invitations = fx.engine.invitations();
    let err = invitations
        .create(&outsider, org.id, "a@x.com", OrganizationRole::Viewer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotAuthorized));

    let err = invitations
        .create(&viewer, org.id, "a@x.com", OrganizationRole::Viewer)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientPrivilege(_)));

    let err = invitations
        .create(&admin, org.id, "a@x.com", OrganizationRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientPrivilege(_)));

    invitations
        .create(&admin, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    let err = invitations
        .create(&owner, org.id, "not-an-email", OrganizationRole::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InvalidInput(_)));
}

#[tokio::test]
async fn test_invite_existing_member_is_rejected() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let member = fx.user("member@acme.test").await;
    fx.engine
        .members()
        .add_member(&owner, org.id, member.user_id, OrganizationRole::Member)
        .await
        .unwrap();

    let err = fx
        .engine
        .invitations()
        .create(&owner, org.id, "MEMBER@acme.test", OrganizationRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::AlreadyMember));
}

#[tokio::test]
async fn test_accept_by_existing_member_consumes_invitation() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    fx.engine
        .invitations()
        .create(&owner, org.id, "late@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    let late = fx.user("late@x.com").await;
    fx.engine
        .members()
        .add_member(&owner, org.id, late.user_id, OrganizationRole::Viewer)
        .await
        .unwrap();

    let err = fx
        .engine
        .invitations()
        .accept("token-0", &late)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::AlreadyMember));

    let view = fx.engine.invitations().get_by_token("token-0").await.unwrap();
    assert_eq!(view.status, InvitationStatus::Accepted);
    assert_eq!(
        fx.engine.members().get_role(org.id, late.user_id).await.unwrap(),
        Some(OrganizationRole::Viewer)
    );
}

#[tokio::test]
async fn test_accept_fails_when_inviter_lost_privilege() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let co_owner = fx.user("co@acme.test").await;
    let members = fx.engine.members();
    members
        .add_member(&owner, org.id, co_owner.user_id, OrganizationRole::Owner)
        .await
        .unwrap();

    fx.engine
        .invitations()
        .create(&owner, org.id, "a@x.com", OrganizationRole::Admin)
        .await
        .unwrap();
    members
        .update_role(&co_owner, org.id, owner.user_id, OrganizationRole::Member)
        .await
        .unwrap();

    let invitee = fx.user("a@x.com").await;
    let err = fx
        .engine
        .invitations()
        .accept("token-0", &invitee)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientPrivilege(_)));
    assert_eq!(members.get_role(org.id, invitee.user_id).await.unwrap(), None);

    let view = fx.engine.invitations().get_by_token("token-0").await.unwrap();
    assert_eq!(view.status, InvitationStatus::Pending);
}

#[tokio::test]
async fn test_revoke() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let member = fx.user("member@acme.test").await;
    fx.engine
        .members()
        .add_member(&owner, org.id, member.user_id, OrganizationRole::Member)
        .await
        .unwrap();

    let invitations = fx.engine.invitations();
    let invitation = invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    let err = invitations.revoke(&member, invitation.id).await.unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientPrivilege(_)));

    let revoked = invitations.revoke(&owner, invitation.id).await.unwrap();
    assert_eq!(revoked.status, InvitationStatus::Revoked);

    let err = invitations.revoke(&owner, invitation.id).await.unwrap_err();
    assert!(matches!(err, AuthzError::InvalidState(InvitationStatus::Revoked)));

    let invitee = fx.user("a@x.com").await;
    let err = invitations.accept("token-0", &invitee).await.unwrap_err();
    assert!(matches!(err, AuthzError::InvalidState(InvitationStatus::Revoked)));

    let err = invitations.revoke(&owner, Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
}

#[tokio::test]
async fn test_revoke_lapsed_invitation_persists_expiry() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let invitations = fx.engine.invitations();
    let invitation = invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    fx.clock.advance(Duration::days(30));
    let err = invitations.revoke(&owner, invitation.id).await.unwrap_err();
    assert!(matches!(err, AuthzError::InvalidState(InvitationStatus::Expired)));
    assert_eq!(invitations.expire_stale().await.unwrap(), 0);
}

#[tokio::test]
async fn test_pending_invitations_for_email() {
    let fx = TestFixture::new();
    let (acme, acme_owner) = fx.org("acme").await;
    let (globex, globex_owner) = fx.org("globex").await;
    let invitations = fx.engine.invitations();

    invitations
        .create(&acme_owner, acme.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();
    fx.clock.advance(Duration::days(6));
    invitations
        .create(&globex_owner, globex.id, "a@x.com", OrganizationRole::Viewer)
        .await
        .unwrap();

    let invitee = fx.user("a@x.com").await;
    let pending = invitations.list_pending_for_email(&invitee).await.unwrap();
    assert_eq!(pending.len(), 2);

    fx.clock.advance(Duration::days(2));
    let pending = invitations.list_pending_for_email(&invitee).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].organization_id, globex.id);
    assert_eq!(pending[0].organization_name, "globex");

    let anonymous = Principal::new(Uuid::now_v7());
    assert!(invitations
        .list_pending_for_email(&anonymous)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_expire_stale_publishes_events() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    let invitations = fx.engine.invitations();
    for email in ["a@x.com", "b@x.com"] {
        invitations
            .create(&owner, org.id, email, OrganizationRole::Member)
            .await
            .unwrap();
    }
    let mut expired = fx.subscribe("tenancy.invitation.expired").await;

    assert_eq!(invitations.expire_stale().await.unwrap(), 0);
    fx.clock.advance(Duration::days(7) + Duration::seconds(1));
    assert_eq!(invitations.expire_stale().await.unwrap(), 2);
    assert_eq!(invitations.expire_stale().await.unwrap(), 0);

    assert_eq!(TestFixture::drain(&mut expired).len(), 2);
    let listed = invitations.list(&owner, org.id).await.unwrap();
    assert!(listed.iter().all(|i| i.status == InvitationStatus::Expired));
}

#[tokio::test]
async fn test_duplicate_token_is_retried() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    fx.tokens.push("dup");
    fx.tokens.push("dup");

    let invitations = fx.engine.invitations();
    invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();
    let second = invitations
        .create(&owner, org.id, "b@x.com", OrganizationRole::Member)
        .await
        .unwrap();

    let view = invitations.get_by_token("token-0").await.unwrap();
    assert_eq!(view.id, second.id);
    assert_eq!(invitations.get_by_token("dup").await.unwrap().email, "a@x.com");
}

#[tokio::test]
async fn test_duplicate_token_without_retry_surfaces_conflict() {
    let fx = TestFixture::with_config(AuthzConfig::default().with_create_max_attempts(1));
    let (org, owner) = fx.org("acme").await;
    fx.tokens.push("dup");
    fx.tokens.push("dup");

    let invitations = fx.engine.invitations();
    invitations
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();
    let err = invitations
        .create(&owner, org.id, "b@x.com", OrganizationRole::Member)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_storage_fault_surfaces_as_server_error() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;

    fx.store.set_unavailable(true);
    let err = fx
        .engine
        .invitations()
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.status_code(), 500);

    fx.store.set_unavailable(false);
    assert_eq!(
        fx.engine.members().get_role(org.id, owner.user_id).await.unwrap(),
        Some(OrganizationRole::Owner)
    );
}
