//! Concurrent mutation and background sweeper tests.
//!
//! Operations race on a multi-threaded runtime; the store's transactions
//! must keep the owner count and pending-invitation uniqueness intact.

mod common;

use chrono::Duration;
use common::TestFixture;
use std::sync::Arc;
use tenancy_authz::{AuthzConfig, AuthzError};
use tenancy_org::{InvitationStatus, OrganizationRole};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_owners_demoting_each_other_keep_one_owner() {
    for _ in 0..20 {
        let fx = TestFixture::new();
        let (org, first) = fx.org("acme").await;
        let second = fx.user("second@acme.test").await;
        fx.engine
            .members()
            .add_member(&first, org.id, second.user_id, OrganizationRole::Owner)
            .await
            .unwrap();

        let a = {
            let members = fx.engine.members();
            let (caller, target) = (first.clone(), second.user_id);
            tokio::spawn(async move {
                members
                    .update_role(&caller, org.id, target, OrganizationRole::Admin)
                    .await
            })
        };
        let b = {
            let members = fx.engine.members();
            let (caller, target) = (second.clone(), first.user_id);
            tokio::spawn(async move {
                members
                    .update_role(&caller, org.id, target, OrganizationRole::Admin)
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(AuthzError::InsufficientPrivilege(_)) | Err(AuthzError::LastOwnerProtected)
        )));

        let owners = fx
            .engine
            .members()
            .list_members(&first, org.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.role == OrganizationRole::Owner)
            .count();
        assert_eq!(owners, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sole_owners_leaving_concurrently() {
    let fx = TestFixture::new();
    let (org, first) = fx.org("acme").await;
    let second = fx.user("second@acme.test").await;
    fx.engine
        .members()
        .add_member(&first, org.id, second.user_id, OrganizationRole::Owner)
        .await
        .unwrap();

    let handles: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .map(|principal| {
            let members = fx.engine.members();
            tokio::spawn(async move { members.leave(&principal, org.id).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AuthzError::LastOwnerProtected))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_invitations_leave_one_pending() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let invitations = fx.engine.invitations();
            let owner = owner.clone();
            tokio::spawn(async move {
                invitations
                    .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = fx.engine.invitations().list(&owner, org.id).await.unwrap();
    assert_eq!(listed.len(), 8);
    let pending = listed
        .iter()
        .filter(|i| i.status == InvitationStatus::Pending)
        .count();
    assert_eq!(pending, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweeper_and_accept_race() {
    let fx = TestFixture::new();
    let (org, owner) = fx.org("acme").await;
    fx.engine
        .invitations()
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();
    let invitee = fx.user("a@x.com").await;
    fx.clock.advance(Duration::days(7) + Duration::seconds(1));

    let invitations = fx.engine.invitations();
    let sweep = {
        let invitations = invitations.clone();
        tokio::spawn(async move { invitations.expire_stale().await })
    };
    let accept = {
        let invitations = invitations.clone();
        let invitee = invitee.clone();
        tokio::spawn(async move { invitations.accept("token-0", &invitee).await })
    };

    let swept = sweep.await.unwrap().unwrap();
    let accepted = accept.await.unwrap();
    assert!(matches!(
        accepted,
        Err(AuthzError::Expired) | Err(AuthzError::InvalidState(InvitationStatus::Expired))
    ));
    assert!(swept <= 1);
    assert_eq!(
        fx.engine.members().get_role(org.id, invitee.user_id).await.unwrap(),
        None
    );
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_task_expires_invitations() {
    let fx = TestFixture::with_config(AuthzConfig::default().with_sweep_interval_secs(60));
    let (org, owner) = fx.org("acme").await;
    fx.engine
        .invitations()
        .create(&owner, org.id, "a@x.com", OrganizationRole::Member)
        .await
        .unwrap();
    let mut expired = fx.subscribe("tenancy.invitation.expired").await;

    let handle = fx.engine.sweeper().start();
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert!(expired.try_recv().is_none());

    fx.clock.advance(Duration::days(8));
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;

    let event = expired.try_recv().unwrap();
    assert_eq!(event.org_id, Some(org.id));
    let listed = fx.engine.invitations().list(&owner, org.id).await.unwrap();
    assert_eq!(listed[0].status, InvitationStatus::Expired);

    assert!(handle.is_running());
    assert!(handle.shutdown().await);
}

#[tokio::test]
async fn test_engine_is_shareable_across_tasks() {
    let fx = Arc::new(TestFixture::new());
    let (org, owner) = fx.org("acme").await;

    let mut handles = Vec::new();
    for i in 0..5 {
        let fx = fx.clone();
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            let user = fx.user(&format!("user{}@acme.test", i)).await;
            fx.engine
                .members()
                .add_member(&owner, org.id, user.user_id, OrganizationRole::Viewer)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let members = fx.engine.members().list_members(&owner, org.id).await.unwrap();
    assert_eq!(members.len(), 6);
}
