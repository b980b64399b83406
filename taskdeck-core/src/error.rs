//! Error types for parsing user input and talking to the hosted backend.

/// Rejected user input (CLI flags, config values, wire rows).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown category '{0}' (expected personal, work, shopping or health)")]
    Category(String),
    #[error("unknown priority '{0}' (expected low, medium or high)")]
    Priority(String),
    #[error("invalid due date '{0}' (expected YYYY-MM-DD)")]
    DueDate(String),
    #[error("unknown status filter '{0}' (expected all, completed or pending)")]
    Status(String),
    #[error("unknown sort key '{0}' (expected date, priority, category or name)")]
    SortKey(String),
}

/// Failure of a call to the task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Failure of a call to the auth provider.
///
/// `Provider` carries the provider's own message text; sign-in and sign-up
/// feedback is derived from it by pattern matching.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Provider(String),
    #[error("request failed: {0}")]
    Transport(String),
}

impl AuthError {
    pub fn message(&self) -> &str {
        match self {
            AuthError::Provider(m) | AuthError::Transport(m) => m,
        }
    }
}
