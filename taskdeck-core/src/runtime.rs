//! Running effects against the store and auth collaborators.

use std::collections::VecDeque;

use crate::app::{AppState, Command, Effect, Outcome};
use crate::auth::SessionEvent;
use crate::ports::{AuthProvider, TaskStore};

/// Run a single effect and package its result for `AppState::resolve`.
#[tracing::instrument(skip_all, fields(effect = effect.name()))]
pub async fn run_effect<S: TaskStore, A: AuthProvider>(effect: Effect, store: &S, auth: &A) -> Outcome {
    match effect {
        Effect::LoadSession => Outcome::SessionLoaded(auth.current_session().await),
        Effect::SignIn(c) => Outcome::SignedIn(auth.sign_in(c.email.trim(), &c.password).await),
        Effect::SignUp(c) => Outcome::SignedUp(auth.sign_up(c.email.trim(), &c.password).await),
        Effect::SignOut => Outcome::SignedOut(auth.sign_out().await),
        Effect::FetchTasks => Outcome::TasksFetched(store.fetch_all().await),
        Effect::Insert(draft) => Outcome::Inserted(store.insert(&draft).await),
        Effect::Update { id, patch, origin } => {
            let result = store.update(&id, &patch).await;
            Outcome::Updated {
                id,
                patch,
                origin,
                result,
            }
        }
        Effect::Delete(id) => {
            let result = store.delete(&id).await;
            Outcome::Deleted { id, result }
        }
    }
}

/// Drives an `AppState` to quiescence one command at a time.
///
/// Effects run in the order they were produced, and each outcome is applied
/// before the next effect starts. Used by the one-shot CLI commands and by tests;
/// the interactive UI runs effects on a worker instead so key handling never waits.
pub struct Controller<S, A> {
    state: AppState,
    store: S,
    auth: A,
}

impl<S: TaskStore, A: AuthProvider> Controller<S, A> {
    pub fn new(state: AppState, store: S, auth: A) -> Self {
        Self { state, store, auth }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    pub async fn send(&mut self, cmd: Command) {
        let effects = self.state.dispatch(cmd);
        self.run(effects).await;
    }

    /// Apply a session-change notification pushed by the auth provider.
    pub async fn notify(&mut self, event: SessionEvent) {
        let effects = self.state.resolve(Outcome::SessionChanged(event));
        self.run(effects).await;
    }

    async fn run(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let outcome = run_effect(effect, &self.store, &self.auth).await;
            queue.extend(self.state.resolve(outcome));
        }
    }
}
