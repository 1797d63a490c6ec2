//! Engine assembly.
//!
//! [`AuthzEngine`] wires a store, event bus, clock, token generator and user
//! directory together and hands out the individual services. Services are
//! cheap to clone and share the same collaborators.

use std::sync::Arc;
use tenancy_events::{Event, EventBus, EventBusResult, MemoryEventBus};

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthzConfig, ConfigError};
use crate::context::ContextResolver;
use crate::directory::{MemoryUserDirectory, UserDirectory};
use crate::error::{AuthzError, AuthzResult};
use crate::evaluator::PermissionEvaluator;
use crate::invitation::InvitationService;
use crate::membership::MembershipService;
use crate::organization::OrganizationService;
use crate::store::{MemoryStore, Store, Transaction};
use crate::sweeper::ExpirySweeper;
use crate::token::{RandomTokenGenerator, TokenGenerator};

/// Collaborators shared by every service.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) events: Arc<dyn EventBus>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) tokens: Arc<dyn TokenGenerator>,
    pub(crate) directory: Arc<dyn UserDirectory>,
    pub(crate) config: AuthzConfig,
}

impl Shared {
    pub(crate) async fn begin(&self) -> AuthzResult<Box<dyn Transaction>> {
        Ok(self.store.begin().await?)
    }

    /// Publish a domain event. Failures are logged and never surface.
    pub(crate) async fn publish(&self, event: EventBusResult<Event>) {
        let result = match event {
            Ok(event) => {
                let event = event.with_timestamp(self.clock.now());
                self.events.publish(event).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to publish domain event");
        }
    }
}

/// Log unexpected faults at the service boundary.
pub(crate) trait LogFault {
    fn log_fault(self, operation: &'static str) -> Self;
}

impl<T> LogFault for AuthzResult<T> {
    fn log_fault(self, operation: &'static str) -> Self {
        if let Err(e) = &self {
            if e.is_server_error() {
                tracing::error!(operation, error = %e, "Storage fault");
            }
        }
        self
    }
}

/// Map a constraint hit on membership insert to `AlreadyMember`.
pub(crate) fn membership_conflict(err: crate::error::StoreError) -> AuthzError {
    if err.is_retryable() {
        AuthzError::AlreadyMember
    } else {
        AuthzError::Storage(err)
    }
}

/// The authorization engine.
///
/// # Examples
///
/// ```
/// use tenancy_authz::{AuthzEngine, Principal};
/// use tenancy_org::OrganizationRole;
/// use uuid::Uuid;
///
/// # async fn example() -> tenancy_authz::AuthzResult<()> {
/// let engine = AuthzEngine::in_memory();
/// let owner = Principal::new(Uuid::now_v7());
///
/// let org = engine.organizations().create(&owner, "Acme", "acme").await?;
/// let decision = engine
///     .evaluator()
///     .authorize(&owner, org.id, OrganizationRole::Admin)
///     .await?;
/// assert!(decision.is_allowed());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthzEngine {
    shared: Shared,
}

impl std::fmt::Debug for AuthzEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzEngine")
            .field("config", &self.shared.config)
            .finish()
    }
}

impl AuthzEngine {
    /// Start building an engine over `store`.
    pub fn builder(store: Arc<dyn Store>) -> AuthzEngineBuilder {
        AuthzEngineBuilder::new(store)
    }

    /// An engine over a fresh in-memory store with default collaborators.
    pub fn in_memory() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Self::from_parts(
            store,
            AuthzConfig::default(),
            Arc::new(MemoryEventBus::new()),
            Arc::new(SystemClock),
            None,
            Arc::new(MemoryUserDirectory::new()),
        )
    }

    fn from_parts(
        store: Arc<dyn Store>,
        config: AuthzConfig,
        events: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        tokens: Option<Arc<dyn TokenGenerator>>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let tokens =
            tokens.unwrap_or_else(|| Arc::new(RandomTokenGenerator::new(config.token_bytes)));
        Self {
            shared: Shared {
                store,
                events,
                clock,
                tokens,
                directory,
                config,
            },
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AuthzConfig {
        &self.shared.config
    }

    /// Role and permission checks.
    pub fn evaluator(&self) -> PermissionEvaluator {
        PermissionEvaluator::new(self.shared.clone())
    }

    /// Membership store operations.
    pub fn members(&self) -> MembershipService {
        MembershipService::new(self.shared.clone())
    }

    /// Organization lifecycle.
    pub fn organizations(&self) -> OrganizationService {
        OrganizationService::new(self.shared.clone())
    }

    /// Invitation lifecycle.
    pub fn invitations(&self) -> InvitationService {
        InvitationService::new(self.shared.clone())
    }

    /// Active organization resolution.
    pub fn context(&self) -> ContextResolver {
        ContextResolver::new(self.shared.clone())
    }

    /// Background expiry sweeper on the configured interval.
    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(self.invitations(), self.shared.config.sweep_interval())
    }
}

/// Builder for [`AuthzEngine`].
pub struct AuthzEngineBuilder {
    store: Arc<dyn Store>,
    config: AuthzConfig,
    events: Option<Arc<dyn EventBus>>,
    clock: Option<Arc<dyn Clock>>,
    tokens: Option<Arc<dyn TokenGenerator>>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl AuthzEngineBuilder {
    fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: AuthzConfig::default(),
            events: None,
            clock: None,
            tokens: None,
            directory: None,
        }
    }

    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: AuthzConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish domain events on `events`.
    pub fn events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Read time from `clock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Draw invitation tokens from `tokens`.
    pub fn token_generator(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Resolve invitee emails through `directory`.
    pub fn directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Validate the configuration and assemble the engine.
    pub fn build(self) -> Result<AuthzEngine, ConfigError> {
        self.config.validate()?;
        Ok(AuthzEngine::from_parts(
            self.store,
            self.config,
            self.events.unwrap_or_else(|| Arc::new(MemoryEventBus::new())),
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.tokens,
            self.directory
                .unwrap_or_else(|| Arc::new(MemoryUserDirectory::new())),
        ))
    }
}
