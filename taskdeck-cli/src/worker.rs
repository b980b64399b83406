use tokio::sync::mpsc;

use taskdeck_core::{run_effect, AuthProvider, Effect, Outcome, TaskStore};

/// Runs effects for the terminal UI off the render thread.
///
/// Effects are executed one at a time in submission order. Session-change
/// notifications from the auth provider are forwarded as
/// `Outcome::SessionChanged` between effects.
pub async fn run_worker<S, A>(
    mut rx: mpsc::UnboundedReceiver<Effect>,
    tx: std::sync::mpsc::Sender<Outcome>,
    store: S,
    auth: A,
) where
    S: TaskStore,
    A: AuthProvider,
{
    let mut events = auth.subscribe();

    loop {
        tokio::select! {
            effect = rx.recv() => {
                let Some(effect) = effect else { break };
                let outcome = run_effect(effect, &store, &auth).await;
                if tx.send(outcome).is_err() {
                    break;
                }
            }
            Some(event) = events.recv() => {
                if tx.send(Outcome::SessionChanged(event)).is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("effect worker stopped");
}

/// The UI side of the worker: submit effects, drain outcomes without blocking.
pub struct WorkerHandle {
    effects: mpsc::UnboundedSender<Effect>,
    outcomes: std::sync::mpsc::Receiver<Outcome>,
}

impl WorkerHandle {
    pub fn spawn<S, A>(store: S, auth: A) -> Self
    where
        S: TaskStore + 'static,
        A: AuthProvider + 'static,
    {
        let (effects, rx) = mpsc::unbounded_channel();
        let (tx, outcomes) = std::sync::mpsc::channel();
        tokio::spawn(run_worker(rx, tx, store, auth));
        Self { effects, outcomes }
    }

    pub fn submit(&self, effects: Vec<Effect>) {
        for effect in effects {
            if self.effects.send(effect).is_err() {
                tracing::error!("effect worker is gone");
                return;
            }
        }
    }

    pub fn try_recv(&self) -> Option<Outcome> {
        self.outcomes.try_recv().ok()
    }
}
