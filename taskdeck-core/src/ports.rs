//! Collaborator traits for the hosted backend.
//!
//! The core never talks HTTP itself. The CLI provides REST adapters; tests
//! use in-memory fakes.

use std::future::Future;

use tokio::sync::mpsc;

use crate::auth::{Session, SessionEvent};
use crate::error::{AuthError, StoreError};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};

/// Remote record store keyed by task id.
pub trait TaskStore: Send + Sync {
    /// Every task visible to the current session, newest first.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Insert a new pending task and return the stored record.
    fn insert(&self, draft: &TaskDraft) -> impl Future<Output = Result<Task, StoreError>> + Send;

    fn update(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&self, id: &TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Session management delegated to an external auth provider.
pub trait AuthProvider: Send + Sync {
    fn current_session(&self) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    /// Register an account. The provider sends a confirmation email; no
    /// session is granted until the address is confirmed.
    fn sign_up(&self, email: &str, password: &str)
    -> impl Future<Output = Result<(), AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Session-change notifications (sign-in elsewhere, refresh, expiry).
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;
}
