//! Application state and its reducer-style transitions.
//!
//! `AppState::dispatch` applies a user intent and returns the remote calls
//! (`Effect`s) it needs. `AppState::resolve` applies the result of one of
//! those calls (`Outcome`) and may ask for follow-ups. Neither awaits
//! anything; `runtime` is where effects are actually run.
//!
//! In the local variant every task command applies to the board directly
//! and no effects are produced. In the persisted variant the board only
//! changes after the store confirms a write.

use std::fmt;

use crate::auth::{AuthState, Session, SessionEvent, SignInFailure, SignUpFailure, SIGN_UP_SUCCESS};
use crate::board::TaskBoard;
use crate::edit::{EditField, FieldValue};
use crate::error::{AuthError, StoreError};
use crate::feedback::Feedback;
use crate::task::{Category, Task, TaskDraft, TaskId, TaskPatch};
use crate::view::{self, CategoryStats, Stats, ViewOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// In-memory only, no sign-in.
    Local,
    /// Backed by the hosted store, gated by a session.
    Persisted,
}

/// Email and password as typed. The password never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// App start: restore the current session (persisted variant).
    Start,
    SignIn(Credentials),
    SignUp(Credentials),
    SignOut,
    Refresh,
    /// Submit the create form.
    Create,
    Toggle(TaskId),
    Delete(TaskId),
    BeginRowEdit(TaskId),
    CancelRowEdit,
    SaveRowEdit,
    BeginFieldEdit(TaskId, EditField),
    SetFieldDraft(FieldValue),
    CancelFieldEdit,
    SaveFieldEdit,
    DismissFeedback,
}

/// Why an update was issued, so its confirmation can close the right session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    Toggle,
    RowEdit,
    FieldEdit(EditField),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadSession,
    SignIn(Credentials),
    SignUp(Credentials),
    SignOut,
    FetchTasks,
    Insert(TaskDraft),
    Update {
        id: TaskId,
        patch: TaskPatch,
        origin: UpdateOrigin,
    },
    Delete(TaskId),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::LoadSession => "load_session",
            Effect::SignIn(_) => "sign_in",
            Effect::SignUp(_) => "sign_up",
            Effect::SignOut => "sign_out",
            Effect::FetchTasks => "fetch_tasks",
            Effect::Insert(_) => "insert",
            Effect::Update { .. } => "update",
            Effect::Delete(_) => "delete",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    SessionLoaded(Result<Option<Session>, AuthError>),
    SignedIn(Result<Session, AuthError>),
    SignedUp(Result<(), AuthError>),
    SignedOut(Result<(), AuthError>),
    /// Pushed by the auth provider, not requested by an effect.
    SessionChanged(SessionEvent),
    TasksFetched(Result<Vec<Task>, StoreError>),
    Inserted(Result<Task, StoreError>),
    Updated {
        id: TaskId,
        patch: TaskPatch,
        origin: UpdateOrigin,
        result: Result<(), StoreError>,
    },
    Deleted {
        id: TaskId,
        result: Result<(), StoreError>,
    },
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub variant: Variant,
    pub auth: AuthState,
    pub board: TaskBoard,
    pub view: ViewOptions,
    /// The create form.
    pub form: TaskDraft,
    pub loading: bool,
    pub creating: bool,
    pub auth_pending: bool,
    pub feedback: Option<Feedback>,
    /// Form contents as sent with the in-flight insert.
    submitted: Option<TaskDraft>,
}

impl AppState {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            auth: AuthState::Unauthenticated,
            board: TaskBoard::new(),
            view: ViewOptions::default(),
            form: TaskDraft::default(),
            loading: false,
            creating: false,
            auth_pending: false,
            feedback: None,
            submitted: None,
        }
    }

    pub fn local() -> Self {
        Self::new(Variant::Local)
    }

    pub fn persisted() -> Self {
        Self::new(Variant::Persisted)
    }

    pub fn with_view(mut self, view: ViewOptions) -> Self {
        self.view = view;
        self
    }

    /// Whether the task-management surface is available.
    pub fn tasks_enabled(&self) -> bool {
        match self.variant {
            Variant::Local => true,
            Variant::Persisted => self.auth.is_authenticated(),
        }
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        view::derive_view(self.board.tasks(), &self.view)
    }

    pub fn stats(&self) -> Stats {
        view::stats(self.board.tasks())
    }

    pub fn category_stats(&self) -> Vec<(Category, CategoryStats)> {
        view::category_stats(self.board.tasks())
    }

    pub fn dispatch(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Start => self.start(),
            Command::SignIn(creds) => self.sign_in(creds),
            Command::SignUp(creds) => self.sign_up(creds),
            Command::SignOut => self.sign_out(),
            Command::DismissFeedback => {
                self.feedback = None;
                vec![]
            }
            cmd if !self.tasks_enabled() => {
                tracing::debug!(?cmd, "ignored while signed out");
                vec![]
            }
            Command::Refresh => self.refresh(),
            Command::Create => self.create(),
            Command::Toggle(id) => self.toggle(id),
            Command::Delete(id) => self.delete(id),
            Command::BeginRowEdit(id) => {
                self.board.begin_row_edit(&id);
                vec![]
            }
            Command::CancelRowEdit => {
                self.board.cancel_row_edit();
                vec![]
            }
            Command::SaveRowEdit => self.save_row_edit(),
            Command::BeginFieldEdit(id, field) => {
                self.board.begin_field_edit(&id, field);
                vec![]
            }
            Command::SetFieldDraft(value) => {
                self.board.set_field_draft(value);
                vec![]
            }
            Command::CancelFieldEdit => {
                self.board.cancel_field_edit();
                vec![]
            }
            Command::SaveFieldEdit => self.save_field_edit(),
        }
    }

    fn start(&mut self) -> Vec<Effect> {
        if self.variant == Variant::Local {
            return vec![];
        }
        self.loading = true;
        vec![Effect::LoadSession]
    }

    fn sign_in(&mut self, creds: Credentials) -> Vec<Effect> {
        if self.variant == Variant::Local
            || self.auth.is_authenticated()
            || self.auth_pending
            || !creds.is_complete()
        {
            return vec![];
        }
        self.auth_pending = true;
        self.feedback = None;
        vec![Effect::SignIn(creds)]
    }

    fn sign_up(&mut self, creds: Credentials) -> Vec<Effect> {
        if self.variant == Variant::Local
            || self.auth.is_authenticated()
            || self.auth_pending
            || !creds.is_complete()
        {
            return vec![];
        }
        self.auth_pending = true;
        self.feedback = None;
        vec![Effect::SignUp(creds)]
    }

    fn sign_out(&mut self) -> Vec<Effect> {
        if !self.auth.is_authenticated() {
            return vec![];
        }
        self.enter_unauthenticated();
        self.feedback = Some(Feedback::info("Signed out."));
        vec![Effect::SignOut]
    }

    fn refresh(&mut self) -> Vec<Effect> {
        if self.variant == Variant::Local {
            return vec![];
        }
        self.loading = true;
        vec![Effect::FetchTasks]
    }

    fn create(&mut self) -> Vec<Effect> {
        if self.form.trimmed_text().is_none() {
            return vec![];
        }
        match self.variant {
            Variant::Local => {
                if self.board.create(&self.form).is_some() {
                    self.form = TaskDraft::default();
                }
                vec![]
            }
            Variant::Persisted => {
                if self.creating {
                    return vec![];
                }
                self.creating = true;
                self.submitted = Some(self.form.clone());
                let mut draft = self.form.clone();
                draft.text = draft.text.trim().to_string();
                vec![Effect::Insert(draft)]
            }
        }
    }

    fn toggle(&mut self, id: TaskId) -> Vec<Effect> {
        match self.variant {
            Variant::Local => {
                self.board.toggle(&id);
                vec![]
            }
            Variant::Persisted => {
                let Some(task) = self.board.get(&id) else {
                    return vec![];
                };
                vec![Effect::Update {
                    patch: TaskPatch::completed(!task.completed),
                    id,
                    origin: UpdateOrigin::Toggle,
                }]
            }
        }
    }

    fn delete(&mut self, id: TaskId) -> Vec<Effect> {
        match self.variant {
            Variant::Local => {
                self.board.delete(&id);
                vec![]
            }
            Variant::Persisted => {
                if self.board.get(&id).is_none() {
                    return vec![];
                }
                vec![Effect::Delete(id)]
            }
        }
    }

    fn save_row_edit(&mut self) -> Vec<Effect> {
        match self.variant {
            Variant::Local => {
                self.board.save_row_edit();
                vec![]
            }
            Variant::Persisted => match self.board.pending_row_patch() {
                Some((id, patch)) => vec![Effect::Update {
                    id,
                    patch,
                    origin: UpdateOrigin::RowEdit,
                }],
                None => vec![],
            },
        }
    }

    fn save_field_edit(&mut self) -> Vec<Effect> {
        match self.variant {
            Variant::Local => {
                self.board.save_field_edit();
                vec![]
            }
            Variant::Persisted => {
                let Some(field) = self.board.edits().field().map(|f| f.value.field()) else {
                    return vec![];
                };
                match self.board.pending_field_patch() {
                    Some((id, patch)) => vec![Effect::Update {
                        id,
                        patch,
                        origin: UpdateOrigin::FieldEdit(field),
                    }],
                    None => vec![],
                }
            }
        }
    }

    pub fn resolve(&mut self, outcome: Outcome) -> Vec<Effect> {
        match outcome {
            Outcome::SessionLoaded(Ok(session)) => self.apply_session(session),
            Outcome::SessionLoaded(Err(e)) => {
                tracing::warn!(error = %e, "could not restore session");
                self.enter_unauthenticated();
                self.feedback = Some(Feedback::error("Could not restore your session. Please sign in."));
                vec![]
            }
            Outcome::SignedIn(result) => {
                self.auth_pending = false;
                match result {
                    Ok(session) => {
                        tracing::info!(user_id = %session.user_id, "signed in");
                        self.feedback = None;
                        self.apply_session(Some(session))
                    }
                    Err(e) => {
                        let kind = SignInFailure::categorize(e.message());
                        tracing::warn!(error = %e, ?kind, "sign in failed");
                        self.feedback = Some(Feedback::error(kind.message()));
                        vec![]
                    }
                }
            }
            Outcome::SignedUp(result) => {
                self.auth_pending = false;
                match result {
                    Ok(()) => self.feedback = Some(Feedback::success(SIGN_UP_SUCCESS)),
                    Err(e) => {
                        let kind = SignUpFailure::categorize(e.message());
                        tracing::warn!(error = %e, ?kind, "sign up failed");
                        self.feedback = Some(Feedback::error(kind.message()));
                    }
                }
                vec![]
            }
            Outcome::SignedOut(result) => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "remote sign out failed; local session already dropped");
                }
                vec![]
            }
            Outcome::SessionChanged(event) => {
                tracing::debug!(?event, "session changed");
                self.apply_session(event.session().cloned())
            }
            Outcome::TasksFetched(result) => {
                self.loading = false;
                if !self.tasks_enabled() {
                    return vec![];
                }
                match result {
                    Ok(tasks) => {
                        tracing::debug!(count = tasks.len(), "tasks fetched");
                        self.board.replace_all(tasks);
                    }
                    Err(e) => self.store_failed("Could not load tasks", &e),
                }
                vec![]
            }
            Outcome::Inserted(result) => {
                self.creating = false;
                let submitted = self.submitted.take();
                if !self.tasks_enabled() {
                    return vec![];
                }
                match result {
                    Ok(task) => {
                        self.board.insert_confirmed(task);
                        // Keep anything typed while the insert was in flight.
                        if submitted.as_ref() == Some(&self.form) {
                            self.form = TaskDraft::default();
                        }
                    }
                    Err(e) => self.store_failed("Could not add task", &e),
                }
                vec![]
            }
            Outcome::Updated {
                id,
                patch,
                origin,
                result,
            } => {
                if !self.tasks_enabled() {
                    return vec![];
                }
                match result {
                    Ok(()) => {
                        self.board.apply_patch(&id, &patch);
                        self.close_session_after_update(&id, origin);
                    }
                    Err(e) => self.store_failed("Could not update task", &e),
                }
                vec![]
            }
            Outcome::Deleted { id, result } => {
                if !self.tasks_enabled() {
                    return vec![];
                }
                match result {
                    Ok(()) => {
                        self.board.remove(&id);
                    }
                    Err(e) => self.store_failed("Could not delete task", &e),
                }
                vec![]
            }
        }
    }

    /// Move the gate to match `session`. Only a transition into
    /// `Authenticated` triggers a fetch; a refreshed token just swaps the session.
    fn apply_session(&mut self, session: Option<Session>) -> Vec<Effect> {
        match session {
            Some(s) => {
                let was_authenticated = self.auth.is_authenticated();
                self.auth = AuthState::Authenticated(s);
                if was_authenticated {
                    return vec![];
                }
                self.loading = true;
                vec![Effect::FetchTasks]
            }
            None => {
                self.enter_unauthenticated();
                vec![]
            }
        }
    }

    fn enter_unauthenticated(&mut self) {
        self.auth = AuthState::Unauthenticated;
        self.board.clear();
        self.loading = false;
        self.creating = false;
        self.submitted = None;
    }

    fn close_session_after_update(&mut self, id: &TaskId, origin: UpdateOrigin) {
        let edits = self.board.edits_mut();
        match origin {
            UpdateOrigin::Toggle => {}
            UpdateOrigin::RowEdit => {
                if edits.is_row_editing(id) {
                    edits.cancel_row();
                }
            }
            UpdateOrigin::FieldEdit(field) => {
                if edits
                    .field()
                    .is_some_and(|f| &f.task_id == id && f.value.field() == field)
                {
                    edits.cancel_field();
                }
            }
        }
    }

    fn store_failed(&mut self, what: &str, err: &StoreError) {
        tracing::error!(error = %err, "{what}");
        self.feedback = Some(Feedback::error(format!("{what}: {err}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    fn session() -> Session {
        Session {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            user_id: "user-1".into(),
            email: Some("me@example.com".into()),
            expires_at: None,
        }
    }

    fn task(id: &str, text: &str) -> Task {
        Task::from_draft(TaskId::new(id), &TaskDraft::new(text)).unwrap()
    }

    fn signed_in() -> AppState {
        let mut s = AppState::persisted();
        let effects = s.resolve(Outcome::SessionLoaded(Ok(Some(session()))));
        assert_eq!(effects, vec![Effect::FetchTasks]);
        s.resolve(Outcome::TasksFetched(Ok(vec![task("t1", "first")])));
        s
    }

    #[test]
    fn local_create_resets_form() {
        let mut s = AppState::local();
        s.form = TaskDraft::new("  Walk dog ").with_priority(Priority::High);
        assert!(s.dispatch(Command::Create).is_empty());
        assert_eq!(s.board.len(), 1);
        assert_eq!(s.board.tasks()[0].text, "Walk dog");
        assert_eq!(s.form, TaskDraft::default());
    }

    #[test]
    fn start_without_session_stops_loading() {
        let mut s = AppState::persisted();
        assert_eq!(s.dispatch(Command::Start), vec![Effect::LoadSession]);
        assert!(s.loading);
        assert!(s.resolve(Outcome::SessionLoaded(Ok(None))).is_empty());
        assert!(!s.loading);
        assert!(!s.tasks_enabled());
    }

    #[test]
    fn persisted_create_is_guarded_while_in_flight() {
        let mut s = signed_in();
        s.form = TaskDraft::new("second");
        assert_eq!(s.dispatch(Command::Create).len(), 1);
        assert!(s.dispatch(Command::Create).is_empty());
        assert_eq!(s.board.len(), 1, "nothing mirrored before confirmation");

        s.resolve(Outcome::Inserted(Ok(task("t2", "second"))));
        assert!(!s.creating);
        assert_eq!(s.board.tasks()[0].id, TaskId::new("t2"));
        assert_eq!(s.form, TaskDraft::default());
    }

    #[test]
    fn typing_during_insert_survives_confirmation() {
        let mut s = signed_in();
        s.form = TaskDraft::new("second");
        assert_eq!(s.dispatch(Command::Create).len(), 1);
        s.form = TaskDraft::new("third").with_priority(Priority::Low);

        s.resolve(Outcome::Inserted(Ok(task("t2", "second"))));
        assert_eq!(s.board.len(), 2);
        assert_eq!(s.form.text, "third");
        assert_eq!(s.form.priority, Priority::Low);
    }

    #[test]
    fn failed_insert_keeps_form_for_retry() {
        let mut s = signed_in();
        s.form = TaskDraft::new("retry me");
        s.dispatch(Command::Create);
        s.resolve(Outcome::Inserted(Err(StoreError::Transport("offline".into()))));
        assert_eq!(s.form.text, "retry me");
        assert_eq!(s.board.len(), 1);
        assert!(s.feedback.as_ref().unwrap().is_error());
        assert!(!s.creating);
    }

    #[test]
    fn failed_update_keeps_row_session_open() {
        let mut s = signed_in();
        let id = TaskId::new("t1");
        s.dispatch(Command::BeginRowEdit(id.clone()));
        s.board.edits_mut().row_mut().unwrap().draft.text = "renamed".into();
        let effects = s.dispatch(Command::SaveRowEdit);
        let Effect::Update { patch, origin, .. } = effects[0].clone() else {
            panic!("expected update");
        };
        s.resolve(Outcome::Updated {
            id: id.clone(),
            patch: patch.clone(),
            origin,
            result: Err(StoreError::Status {
                status: 500,
                body: "boom".into(),
            }),
        });
        assert_eq!(s.board.get(&id).unwrap().text, "first");
        assert!(s.board.edits().is_row_editing(&id));

        s.resolve(Outcome::Updated {
            id: id.clone(),
            patch,
            origin,
            result: Ok(()),
        });
        assert_eq!(s.board.get(&id).unwrap().text, "renamed");
        assert!(s.board.edits().row().is_none());
    }

    #[test]
    fn task_commands_ignored_while_signed_out() {
        let mut s = AppState::persisted();
        s.form = TaskDraft::new("nope");
        assert!(s.dispatch(Command::Create).is_empty());
        assert!(s.dispatch(Command::Refresh).is_empty());
    }

    #[test]
    fn sign_out_clears_immediately() {
        let mut s = signed_in();
        assert_eq!(s.dispatch(Command::SignOut), vec![Effect::SignOut]);
        assert!(s.board.is_empty());
        assert!(!s.auth.is_authenticated());
        assert_eq!(s.feedback, Some(Feedback::info("Signed out.")));
        // A late fetch result must not repopulate the board.
        s.resolve(Outcome::TasksFetched(Ok(vec![task("t9", "late")])));
        assert!(s.board.is_empty());
    }

    #[test]
    fn refreshed_token_does_not_refetch() {
        let mut s = signed_in();
        let mut fresh = session();
        fresh.access_token = "at2".into();
        let effects = s.resolve(Outcome::SessionChanged(SessionEvent::TokenRefreshed(fresh)));
        assert!(effects.is_empty());
        assert_eq!(s.auth.session().unwrap().access_token, "at2");
        assert_eq!(s.board.len(), 1);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials::new("a@b.c", "hunter2");
        assert!(!format!("{c:?}").contains("hunter2"));
    }

    #[test]
    fn incomplete_credentials_are_a_no_op() {
        let mut s = AppState::persisted();
        assert!(s.dispatch(Command::SignIn(Credentials::new("  ", "pw"))).is_empty());
        assert!(s.dispatch(Command::SignUp(Credentials::new("a@b.c", ""))).is_empty());
        assert!(!s.auth_pending);
    }
}
