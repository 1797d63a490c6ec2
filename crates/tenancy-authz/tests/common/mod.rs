//! Shared fixture for tenancy-authz integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tenancy_authz::{
    AuthzConfig, AuthzEngine, ManualClock, MemoryStore, MemoryUserDirectory, Principal,
    TokenGenerator,
};
use tenancy_events::{EventBus, MemoryEventBus, Subscription};
use tenancy_org::{InvitationToken, Organization};
use uuid::Uuid;

/// Token generator that hands out scripted tokens first, then `token-N`.
#[derive(Default)]
pub struct ScriptedTokens {
    queue: Mutex<VecDeque<String>>,
    counter: AtomicUsize,
}

impl ScriptedTokens {
    /// Queue `token` to be returned by the next `generate` call.
    pub fn push(&self, token: &str) {
        self.queue
            .lock()
            .unwrap()
            .push_back(token.to_string());
    }
}

impl TokenGenerator for ScriptedTokens {
    fn generate(&self) -> InvitationToken {
        if let Some(token) = self.queue.lock().unwrap().pop_front() {
            return InvitationToken::new(token);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        InvitationToken::new(format!("token-{}", n))
    }
}

/// Test fixture wiring an engine to inspectable collaborators.
pub struct TestFixture {
    pub engine: AuthzEngine,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<MemoryEventBus>,
    pub directory: Arc<MemoryUserDirectory>,
    pub tokens: Arc<ScriptedTokens>,
}

impl TestFixture {
    /// Create a fixture with default configuration.
    pub fn new() -> Self {
        Self::with_config(AuthzConfig::default())
    }

    /// Create a fixture with `config`.
    pub fn with_config(config: AuthzConfig) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
        ));
        let bus = Arc::new(MemoryEventBus::new());
        let directory = Arc::new(MemoryUserDirectory::new());
        let tokens = Arc::new(ScriptedTokens::default());

        let engine = AuthzEngine::builder(Arc::new(store.clone()))
            .config(config)
            .events(bus.clone())
            .clock(clock.clone())
            .token_generator(tokens.clone())
            .directory(directory.clone())
            .build()
            .unwrap();

        Self {
            engine,
            store,
            clock,
            bus,
            directory,
            tokens,
        }
    }

    /// A new user with a verified email, registered in the directory.
    pub async fn user(&self, email: &str) -> Principal {
        let principal = Principal::new(Uuid::now_v7()).with_email(email);
        self.directory.register(email, principal.user_id).await;
        principal
    }

    /// A new organization owned by a fresh `owner@<slug>.test` user.
    pub async fn org(&self, slug: &str) -> (Organization, Principal) {
        let owner = self.user(&format!("owner@{}.test", slug)).await;
        let org = self
            .engine
            .organizations()
            .create(&owner, slug, slug)
            .await
            .unwrap();
        (org, owner)
    }

    /// Subscribe to a topic pattern on the fixture bus.
    pub async fn subscribe(&self, pattern: &str) -> Subscription {
        self.bus.subscribe(pattern).await.unwrap()
    }

    /// Event types received so far on `sub`.
    pub fn drain(sub: &mut Subscription) -> Vec<String> {
        let mut types = Vec::new();
        while let Some(event) = sub.try_recv() {
            types.push(event.event_type);
        }
        types
    }
}
