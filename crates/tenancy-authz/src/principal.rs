//! The authenticated identity making a request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated principal, produced by an external authentication layer.
///
/// `verified_email` is only set when the upstream identity provider has
/// verified the address; invitation acceptance requires it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User ID
    pub user_id: Uuid,

    /// Verified email address, if any
    pub verified_email: Option<String>,
}

impl Principal {
    /// Create a principal without a verified email.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            verified_email: None,
        }
    }

    /// Attach a verified email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.verified_email = Some(email.into());
        self
    }
}
