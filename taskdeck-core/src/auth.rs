//! Authentication gate: session state and provider-error categorization.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// An authenticated identity granted by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// Push notification from the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
    Expired,
}

impl SessionEvent {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionEvent::SignedIn(s) | SessionEvent::TokenRefreshed(s) => Some(s),
            SessionEvent::SignedOut | SessionEvent::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(s) => Some(s),
            AuthState::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

static EMAIL_NOT_CONFIRMED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)email\s+(address\s+)?not\s+confirmed|confirm\s+your\s+email").unwrap());
static INVALID_CREDENTIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)invalid\s+(login\s+)?credentials|invalid\s+(email\s+or\s+)?password").unwrap());
static WEAK_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)password.*(weak|at\s+least|should\s+(be|contain)|too\s+short|invalid)|weak.*password").unwrap()
});
static ALREADY_REGISTERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)already\s+(been\s+)?registered|user\s+already\s+exists|email\s+(address\s+)?(already\s+)?(in\s+use|exists)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFailure {
    EmailNotConfirmed,
    /// Wrong password or unknown email; the provider does not tell them apart.
    InvalidCredentials,
    Other,
}

impl SignInFailure {
    pub fn categorize(provider_message: &str) -> Self {
        if EMAIL_NOT_CONFIRMED.is_match(provider_message) {
            SignInFailure::EmailNotConfirmed
        } else if INVALID_CREDENTIALS.is_match(provider_message) {
            SignInFailure::InvalidCredentials
        } else {
            SignInFailure::Other
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SignInFailure::EmailNotConfirmed => {
                "Please confirm your email address before signing in. Check your inbox for the confirmation link."
            }
            SignInFailure::InvalidCredentials => {
                "Sign in failed. Check your email and password and try again."
            }
            SignInFailure::Other => "Sign in failed. Please try again in a moment.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpFailure {
    WeakPassword,
    AlreadyRegistered,
    Other,
}

impl SignUpFailure {
    pub fn categorize(provider_message: &str) -> Self {
        if ALREADY_REGISTERED.is_match(provider_message) {
            SignUpFailure::AlreadyRegistered
        } else if WEAK_PASSWORD.is_match(provider_message) {
            SignUpFailure::WeakPassword
        } else {
            SignUpFailure::Other
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SignUpFailure::WeakPassword => {
                "That password is too weak. Use at least 6 characters."
            }
            SignUpFailure::AlreadyRegistered => {
                "An account with this email already exists. Try signing in instead."
            }
            SignUpFailure::Other => "Sign up failed. Please try again in a moment.",
        }
    }
}

pub const SIGN_UP_SUCCESS: &str =
    "Account created. Check your email to confirm your address, then sign in.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_messages_are_categorized() {
        assert_eq!(
            SignInFailure::categorize("Email not confirmed"),
            SignInFailure::EmailNotConfirmed
        );
        assert_eq!(
            SignInFailure::categorize("Invalid login credentials"),
            SignInFailure::InvalidCredentials
        );
        assert_eq!(
            SignInFailure::categorize("connection reset by peer"),
            SignInFailure::Other
        );
    }

    #[test]
    fn sign_up_messages_are_categorized() {
        assert_eq!(
            SignUpFailure::categorize("User already registered"),
            SignUpFailure::AlreadyRegistered
        );
        assert_eq!(
            SignUpFailure::categorize("Password should be at least 6 characters."),
            SignUpFailure::WeakPassword
        );
        assert_eq!(
            SignUpFailure::categorize("Password is known to be weak and easy to guess"),
            SignUpFailure::WeakPassword
        );
        assert_eq!(SignUpFailure::categorize("Internal error"), SignUpFailure::Other);
    }

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let mut s = Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            user_id: "u".into(),
            email: None,
            expires_at: None,
        };
        assert!(!s.is_expired(now));
        s.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(s.is_expired(now));
    }
}
