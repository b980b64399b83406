use std::sync::Arc;

use taskdeck_core::{AuthError, AuthProvider, Session, SessionEvent};
use tokio::sync::mpsc;

use crate::backend::{provider_message, read_session, Backend};

/// `AuthProvider` backed by the hosted auth endpoints.
#[derive(Clone)]
pub struct RestAuth {
    backend: Arc<Backend>,
}

impl RestAuth {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    fn credentials(email: &str, password: &str) -> serde_json::Value {
        serde_json::json!({ "email": email, "password": password })
    }
}

impl AuthProvider for RestAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.backend.fresh_session().await
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let resp = self
            .backend
            .http
            .post(self.backend.endpoint("/auth/v1/token?grant_type=password"))
            .headers(self.backend.api_headers())
            .json(&Self::credentials(email, password))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let session = read_session(resp).await?;
        self.backend.set_session(Some(session.clone()));
        self.backend.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let resp = self
            .backend
            .http
            .post(self.backend.endpoint("/auth/v1/signup"))
            .headers(self.backend.api_headers())
            .json(&Self::credentials(email, password))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.map_err(|e| AuthError::Transport(e.to_string()))?;
        Err(AuthError::Provider(provider_message(&body, status.as_u16())))
    }

    #[tracing::instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.backend.load_persisted() else {
            return Ok(());
        };
        // The local session is gone even if the logout call fails.
        self.backend.set_session(None);
        self.backend.emit(SessionEvent::SignedOut);

        let resp = self
            .backend
            .http
            .post(self.backend.endpoint("/auth/v1/logout"))
            .headers(self.backend.bearer_headers(&session.access_token))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.map_err(|e| AuthError::Transport(e.to_string()))?;
        Err(AuthError::Provider(provider_message(&body, status.as_u16())))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.backend.subscribe()
    }
}
