//! Error types for authorization operations
//!
//! Every expected, user-facing outcome of a membership or invitation
//! operation is a variant of [`AuthzError`]. Storage faults are wrapped in
//! [`AuthzError::Storage`] and are the only server-side errors.

use tenancy_org::{InvalidTransition, InvitationStatus};
use thiserror::Error;

/// Storage fault types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The backend failed (connectivity, corruption, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if retrying the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Caller's role is too low, or an admin attempted an owner/admin-level grant
    #[error("Insufficient privilege: {0}")]
    InsufficientPrivilege(String),

    /// Caller has no membership in the target organization
    #[error("Not a member of this organization")]
    NotAuthorized,

    /// The (organization, user) membership already exists
    #[error("User is already a member of this organization")]
    AlreadyMember,

    /// Referenced membership does not exist
    #[error("User is not a member of this organization")]
    NotAMember,

    /// The operation would leave the organization without an owner
    #[error("Organization must keep at least one owner")]
    LastOwnerProtected,

    /// Invitation action on a non-pending invitation
    #[error("Invitation is {0}")]
    InvalidState(InvitationStatus),

    /// Invitation TTL has elapsed
    #[error("Invitation has expired")]
    Expired,

    /// Accepting principal's verified email does not match the invitation
    #[error("Invitation was issued to a different email address")]
    EmailMismatch,

    /// Unknown token, organization or user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Organization slug already in use
    #[error("Slug already taken: {0}")]
    SlugTaken(String),

    /// Malformed name, slug or email
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected storage fault
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl From<InvalidTransition> for AuthzError {
    fn from(err: InvalidTransition) -> Self {
        AuthzError::InvalidState(err.from)
    }
}

impl AuthzError {
    /// Check if this error should be logged at error level.
    ///
    /// Everything except storage faults is an expected outcome.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AuthzError::Storage(_))
    }

    /// Check if the failed unit of work may succeed when run again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthzError::Storage(e) if e.is_retryable())
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::InsufficientPrivilege(_) | AuthzError::NotAuthorized => 403,

            AuthzError::AlreadyMember
            | AuthzError::LastOwnerProtected
            | AuthzError::InvalidState(_)
            | AuthzError::EmailMismatch
            | AuthzError::SlugTaken(_) => 409,

            AuthzError::NotAMember | AuthzError::NotFound(_) => 404,
            AuthzError::Expired => 410,
            AuthzError::InvalidInput(_) => 422,
            AuthzError::Storage(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthzError::InsufficientPrivilege(_) => "INSUFFICIENT_PRIVILEGE",
            AuthzError::NotAuthorized => "NOT_AUTHORIZED",
            AuthzError::AlreadyMember => "ALREADY_MEMBER",
            AuthzError::NotAMember => "NOT_A_MEMBER",
            AuthzError::LastOwnerProtected => "LAST_OWNER_PROTECTED",
            AuthzError::InvalidState(_) => "INVALID_STATE",
            AuthzError::Expired => "EXPIRED",
            AuthzError::EmailMismatch => "EMAIL_MISMATCH",
            AuthzError::NotFound(_) => "NOT_FOUND",
            AuthzError::SlugTaken(_) => "SLUG_TAKEN",
            AuthzError::InvalidInput(_) => "INVALID_INPUT",
            AuthzError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}
