//! In-memory stand-ins for the hosted store and auth provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use taskdeck_core::{
    AppState, AuthError, AuthProvider, Controller, Credentials, Session, SessionEvent, StoreError, Task,
    TaskDraft, TaskId, TaskPatch, TaskStore,
};
use tokio::sync::mpsc;

/// Newest-first record store with a switch to make every call fail.
#[derive(Default)]
pub struct MemStore {
    rows: Mutex<Vec<Task>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Task> {
        self.rows.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

impl TaskStore for MemStore {
    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        Ok(self.rows())
    }

    async fn insert(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        self.check()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let task = Task::from_draft(TaskId::new(format!("row-{n}")), draft)
            .ok_or_else(|| StoreError::Status {
                status: 400,
                body: "text must not be empty".to_string(),
            })?;
        self.rows.lock().unwrap().insert(0, task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(t) = rows.iter_mut().find(|t| &t.id == id) {
            t.apply(patch);
        }
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.check()?;
        self.rows.lock().unwrap().retain(|t| &t.id != id);
        Ok(())
    }
}

struct Account {
    password: String,
    confirmed: bool,
}

/// Auth provider with GoTrue-like error texts.
#[derive(Default)]
pub struct MemAuth {
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl MemAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str, confirmed: bool) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                confirmed,
            },
        );
        self
    }

    pub fn with_session(self, email: &str) -> Self {
        *self.session.lock().unwrap() = Some(session_for(email));
        self
    }

    /// Simulate the provider expiring the session on its own.
    pub fn expire(&self) {
        *self.session.lock().unwrap() = None;
        self.emit(SessionEvent::Expired);
    }

    fn emit(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

pub fn session_for(email: &str) -> Session {
    Session {
        access_token: format!("token-{email}"),
        refresh_token: "refresh".to_string(),
        user_id: format!("user-{email}"),
        email: Some(email.to_string()),
        expires_at: None,
    }
}

impl AuthProvider for MemAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(a) if a.password == password && !a.confirmed => {
                    return Err(AuthError::Provider("Email not confirmed".to_string()));
                }
                Some(a) if a.password == password => session_for(email),
                _ => return Err(AuthError::Provider("Invalid login credentials".to_string())),
            }
        };
        *self.session.lock().unwrap() = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if password.len() < 6 {
            return Err(AuthError::Provider(
                "Password should be at least 6 characters.".to_string(),
            ));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::Provider("User already registered".to_string()));
        }
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                confirmed: false,
            },
        );
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.session.lock().unwrap() = None;
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

pub type TestController = Controller<MemStore, MemAuth>;

/// A persisted controller already past `Start`.
pub async fn started(store: MemStore, auth: MemAuth) -> TestController {
    let mut c = Controller::new(AppState::persisted(), store, auth);
    c.send(taskdeck_core::Command::Start).await;
    c
}

pub fn creds(email: &str, password: &str) -> Credentials {
    Credentials::new(email, password)
}
