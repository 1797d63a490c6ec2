//! User directory lookups.
//!
//! Invitations target email addresses, not user IDs. The directory is the
//! external collaborator that maps a verified address to an existing user so
//! that inviting someone who already belongs to the organization is rejected.

use async_trait::async_trait;
use std::collections::HashMap;
use tenancy_org::invitation::normalize_email;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreResult;

/// Resolves email addresses to user IDs.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the user owning a normalized email address.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<Uuid>>;
}

/// In-memory directory for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, Uuid>>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-point) an address. Invalid addresses are ignored.
    pub async fn register(&self, email: &str, user_id: Uuid) {
        if let Some(email) = normalize_email(email) {
            self.users.write().await.insert(email, user_id);
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<Uuid>> {
        let Some(email) = normalize_email(email) else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&email).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let directory = MemoryUserDirectory::new();
        let user = Uuid::now_v7();
        directory.register("Alice@Example.com", user).await;

        assert_eq!(
            directory.find_user_by_email("alice@example.COM").await.unwrap(),
            Some(user)
        );
        assert_eq!(directory.find_user_by_email("bob@example.com").await.unwrap(), None);
        assert_eq!(directory.find_user_by_email("garbage").await.unwrap(), None);
    }
}
