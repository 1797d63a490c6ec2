//! # Tenancy Events
//!
//! This crate provides the domain event bus for organization membership
//! and invitation changes.
//!
//! ## Overview
//!
//! - **Event Types**: Strongly-typed organization, member and invitation events
//! - **Event Bus**: Publish/subscribe messaging
//! - **Event Handlers**: Async event processing
//!
//! Events are published only after the change they describe has committed.
//! `invitation.issued` is the single event that carries an invitation token,
//! for delivery by a mail collaborator.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenancy_events::{EventBus, MemoryEventBus, MemberEvent};
//! use tenancy_org::OrganizationRole;
//! use uuid::Uuid;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!     let mut sub = bus.subscribe("tenancy.member.*").await.unwrap();
//!
//!     let event = MemberEvent::Added {
//!         organization_id: Uuid::now_v7(),
//!         user_id: Uuid::now_v7(),
//!         role: OrganizationRole::Member,
//!         invited_by: None,
//!     };
//!     bus.publish(event.to_event().unwrap()).await.unwrap();
//!
//!     while let Ok(event) = sub.recv().await {
//!         println!("Received: {}", event.event_type);
//!     }
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `{source}.{event_type}`:
//! - `tenancy.member.added` - Specific event
//! - `tenancy.invitation.*` - All invitation events
//! - `#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventHandler, MemoryEventBus,
    Subscription,
};
pub use types::{Event, InvitationEvent, MemberEvent, OrganizationEvent, DEFAULT_SOURCE};
