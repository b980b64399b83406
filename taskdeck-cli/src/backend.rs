//! Shared connection to the hosted backend: HTTP client, project settings
//! and the current session, used by both the REST store and the auth adapter.

use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use taskdeck_core::{AuthError, Session, SessionEvent};
use tokio::sync::mpsc;

use crate::config::BackendSection;
use crate::state;

/// Refresh a little before the provider's expiry so a request never races it.
const EXPIRY_MARGIN_SECS: i64 = 30;

pub struct Backend {
    pub(crate) http: reqwest::Client,
    pub(crate) url: String,
    pub(crate) anon_key: String,
    pub(crate) table: String,
    session: RwLock<Option<Session>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
    persist: bool,
}

impl Backend {
    pub fn new(cfg: &BackendSection) -> Arc<Self> {
        Arc::new(Self {
            http: reqwest::Client::new(),
            url: cfg.url.trim_end_matches('/').to_string(),
            anon_key: cfg.anon_key.clone(),
            table: cfg.table.clone(),
            session: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            persist: true,
        })
    }

    /// A backend that never touches `~/.taskdeck/session.json`.
    #[cfg(test)]
    pub fn ephemeral(url: &str) -> Arc<Self> {
        Arc::new(Self {
            http: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            anon_key: "anon".to_string(),
            table: "todos".to_string(),
            session: RwLock::new(None),
            subscribers: Mutex::new(Vec::new()),
            persist: false,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    pub(crate) fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", v);
        }
        headers
    }

    pub(crate) fn bearer_headers(&self, access_token: &str) -> HeaderMap {
        let mut headers = self.api_headers();
        if let Ok(v) = HeaderValue::from_str(&format!("Bearer {access_token}")) {
            headers.insert(AUTHORIZATION, v);
        }
        headers
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    /// Install a session in memory and on disk.
    pub(crate) fn set_session(&self, session: Option<Session>) {
        if let Ok(mut slot) = self.session.write() {
            *slot = session.clone();
        }
        if !self.persist {
            return;
        }
        let res = match &session {
            Some(s) => state::save_session(s),
            None => state::clear_session(),
        };
        if let Err(e) = res {
            tracing::warn!(error = %e, "could not persist session");
        }
    }

    /// Load the persisted session the first time it is needed.
    pub(crate) fn load_persisted(&self) -> Option<Session> {
        if let Some(s) = self.session() {
            return Some(s);
        }
        if !self.persist {
            return None;
        }
        match state::load_session() {
            Ok(Some(s)) => {
                if let Ok(mut slot) = self.session.write() {
                    *slot = Some(s.clone());
                }
                Some(s)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session file");
                None
            }
        }
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// The current session, refreshed if it is about to expire.
    ///
    /// A failed refresh drops the session and notifies subscribers with
    /// `SessionEvent::Expired`.
    pub async fn fresh_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.load_persisted() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)) {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                tracing::debug!(user_id = %fresh.user_id, "session refreshed");
                self.set_session(Some(fresh.clone()));
                self.emit(SessionEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(AuthError::Provider(msg)) => {
                tracing::info!(reason = %msg, "session expired");
                self.set_session(None);
                self.emit(SessionEvent::Expired);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let resp = self
            .http
            .post(self.endpoint("/auth/v1/token?grant_type=refresh_token"))
            .headers(self.api_headers())
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        read_session(resp).await
    }
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_session(self) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => chrono::DateTime::from_timestamp(at, 0),
            (None, Some(secs)) => Some(Utc::now() + Duration::seconds(secs)),
            (None, None) => None,
        };
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            email: self.user.email,
            expires_at,
        }
    }
}

/// Decode a token grant, or turn a non-2xx reply into the provider's message.
pub(crate) async fn read_session(resp: reqwest::Response) -> Result<Session, AuthError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(AuthError::Provider(provider_message(&body, status.as_u16())));
    }
    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| AuthError::Transport(format!("parse token response: {e}")))?;
    Ok(token.into_session())
}

/// Pull the human-readable message out of an auth error body.
pub(crate) fn provider_message(body: &str, status: u16) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("auth error {status}: {}", body.trim()))
}
