//! taskdeck-core: task model, derived views and the authenticated board state

pub mod app;
pub mod auth;
pub mod board;
pub mod edit;
pub mod error;
pub mod feedback;
pub mod ports;
pub mod runtime;
pub mod task;
pub mod view;

pub use app::{AppState, Command, Credentials, Effect, Outcome, UpdateOrigin, Variant};
pub use auth::{AuthState, Session, SessionEvent, SignInFailure, SignUpFailure};
pub use board::TaskBoard;
pub use edit::{EditField, EditSessions, FieldEdit, FieldValue, RowEdit};
pub use error::{AuthError, ParseError, StoreError};
pub use feedback::{Feedback, FeedbackKind};
pub use ports::{AuthProvider, TaskStore};
pub use runtime::{run_effect, Controller};
pub use task::{format_due_date, parse_due_date, Category, Priority, Task, TaskDraft, TaskId, TaskPatch};
pub use view::{
    category_stats, derive_view, filter_tasks, sort_tasks, stats, CategoryFilter, CategoryStats, SortKey,
    Stats, StatusFilter, ViewOptions,
};
