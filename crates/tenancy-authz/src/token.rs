//! Invitation token generation.
//!
//! Tokens are drawn from the operating system RNG and encoded as URL-safe
//! base64 without padding, so they can be embedded in invitation links.
//! Logs only ever see [`fingerprint`] of a token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tenancy_org::InvitationToken;

use crate::config::MIN_TOKEN_BYTES;

/// Source of invitation tokens.
pub trait TokenGenerator: Send + Sync {
    /// Produce a fresh, unguessable token.
    fn generate(&self) -> InvitationToken;
}

/// Cryptographically random tokens from the OS RNG.
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    bytes: usize,
}

impl RandomTokenGenerator {
    /// Create a generator producing `bytes` bytes of entropy per token.
    ///
    /// Values below the minimum are raised to it.
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(MIN_TOKEN_BYTES),
        }
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> InvitationToken {
        let mut buf = vec![0u8; self.bytes];
        OsRng.fill_bytes(&mut buf);
        InvitationToken::new(URL_SAFE_NO_PAD.encode(&buf))
    }
}

/// Short, non-reversible identifier of a token for log correlation.
///
/// # Examples
///
/// ```
/// use tenancy_authz::token::fingerprint;
/// use tenancy_org::InvitationToken;
///
/// let token = InvitationToken::new("secret");
/// assert_eq!(fingerprint(&token).len(), 12);
/// assert!(!fingerprint(&token).contains("secret"));
/// ```
pub fn fingerprint(token: &InvitationToken) -> String {
    let digest = Sha256::digest(token.expose().as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(12);
    encoded
}
