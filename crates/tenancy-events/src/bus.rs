//! Event bus implementation
//!
//! This module provides the event bus abstraction and the in-memory
//! implementation used by single-process hosts and tests.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }

    /// Receive an already-published event without waiting.
    ///
    /// Returns `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `tenancy.member.*` matches `tenancy.member.added`, `tenancy.member.removed`
    /// - `*.invitation.#` matches any source's invitation events
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register a handler invoked in the background for every matching event.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;
}

/// In-memory event bus implementation.
///
/// Suitable for single-process hosts and testing. Events published while
/// nobody is subscribed are dropped.
pub struct MemoryEventBus {
    /// Topic pattern -> broadcast channel
    subscribers: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    /// Per-pattern channel capacity
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            channel_capacity: capacity,
        }
    }

    /// Check if a topic matches a pattern.
    pub fn topic_matches(pattern: &str, topic: &str) -> bool {
        let pattern_parts: Vec<&str> = pattern.split('.').collect();
        let topic_parts: Vec<&str> = topic.split('.').collect();
        Self::segments_match(&pattern_parts, &topic_parts)
    }

    fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
        match pattern.split_first() {
            None => topic.is_empty(),
            Some((&"#", rest)) => (0..=topic.len()).any(|skip| Self::segments_match(rest, &topic[skip..])),
            Some((&"*", rest)) => !topic.is_empty() && Self::segments_match(rest, &topic[1..]),
            Some((segment, rest)) => {
                topic.first() == Some(segment) && Self::segments_match(rest, &topic[1..])
            }
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut delivered = 0usize;

        for (pattern, sender) in self.subscribers.read().await.iter() {
            if Self::topic_matches(pattern, &topic) && sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        for handler in self.handlers.read().await.iter() {
            if !handler
                .topics()
                .iter()
                .any(|pattern| Self::topic_matches(pattern, &topic))
            {
                continue;
            }
            let handler = handler.clone();
            let event = event.clone();
            delivered += 1;
            tokio::task::spawn(async move {
                if let Err(e) = handler.handle(event).await {
                    tracing::error!(error = %e, "Event handler failed");
                }
            });
        }

        tracing::trace!(topic = %topic, event_id = %event.id, delivered, "Event published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        let mut subscribers = self.subscribers.write().await;
        let receiver = match subscribers.get(topic) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.channel_capacity);
                subscribers.insert(topic.to_string(), sender);
                receiver
            }
        };

        Ok(Subscription {
            id: uuid::Uuid::now_v7().to_string(),
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        self.handlers.write().await.push(handler);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
