//! The task collection plus its open edit sessions.
//!
//! Two families of operations:
//! - local mutations (`create`, `toggle`, `delete`, `save_row_edit`, ...) used
//!   by the in-memory variant, which apply immediately;
//! - mirror operations (`insert_confirmed`, `apply_patch`, `remove`,
//!   `replace_all`) used by the persisted variant once the store confirms a
//!   write.
//!
//! Both keep the same invariants: ids are unique, text is never empty, and
//! deleting a task drops its edit sessions.

use crate::edit::{EditField, EditSessions, FieldValue};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};

#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    edits: EditSessions,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut b = Self::new();
        b.replace_all(tasks);
        b
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    pub fn edits(&self) -> &EditSessions {
        &self.edits
    }

    pub fn edits_mut(&mut self) -> &mut EditSessions {
        &mut self.edits
    }

    /// Append a new pending task. Whitespace-only text is a no-op.
    pub fn create(&mut self, draft: &TaskDraft) -> Option<TaskId> {
        let task = Task::from_draft(TaskId::generate(), draft)?;
        let id = task.id.clone();
        self.tasks.push(task);
        Some(id)
    }

    /// Flip `completed`. Returns the new value, or `None` if the id is unknown.
    pub fn toggle(&mut self, id: &TaskId) -> Option<bool> {
        let t = self.get_mut(id)?;
        t.completed = !t.completed;
        Some(t.completed)
    }

    pub fn delete(&mut self, id: &TaskId) -> Option<Task> {
        self.remove(id)
    }

    pub fn begin_row_edit(&mut self, id: &TaskId) -> bool {
        let Some(task) = self.get(id).cloned() else {
            return false;
        };
        self.edits.begin_row(&task);
        true
    }

    pub fn begin_field_edit(&mut self, id: &TaskId, field: EditField) -> bool {
        let Some(task) = self.get(id).cloned() else {
            return false;
        };
        self.edits.begin_field(&task, field)
    }

    pub fn cancel_row_edit(&mut self) {
        self.edits.cancel_row();
    }

    pub fn cancel_field_edit(&mut self) {
        self.edits.cancel_field();
    }

    /// Commit the row draft. An empty draft text keeps the session open and
    /// changes nothing.
    pub fn save_row_edit(&mut self) -> bool {
        let Some((id, patch)) = self.pending_row_patch() else {
            return false;
        };
        self.edits.cancel_row();
        self.apply_patch(&id, &patch)
    }

    pub fn save_field_edit(&mut self) -> bool {
        let Some(edit) = self.edits.take_field() else {
            return false;
        };
        self.apply_patch(&edit.task_id, &edit.value.to_patch())
    }

    /// The patch a row save would send, if the draft is valid.
    pub fn pending_row_patch(&self) -> Option<(TaskId, TaskPatch)> {
        let row = self.edits.row()?;
        let patch = row.draft.to_patch()?;
        Some((row.task_id.clone(), patch))
    }

    pub fn pending_field_patch(&self) -> Option<(TaskId, TaskPatch)> {
        let f = self.edits.field()?;
        Some((f.task_id.clone(), f.value.to_patch()))
    }

    pub fn set_field_draft(&mut self, value: FieldValue) -> bool {
        match self.edits.field_mut() {
            Some(f) if f.value.field() == value.field() => {
                f.value = value;
                true
            }
            _ => false,
        }
    }

    /// Place a store-confirmed task at the front, matching newest-first order.
    /// Replaces an existing task with the same id instead of duplicating it.
    pub fn insert_confirmed(&mut self, task: Task) {
        if let Some(existing) = self.get_mut(&task.id) {
            *existing = task;
            return;
        }
        self.tasks.insert(0, task);
    }

    pub fn apply_patch(&mut self, id: &TaskId, patch: &TaskPatch) -> bool {
        match self.get_mut(id) {
            Some(t) => {
                t.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| &t.id == id)?;
        self.edits.forget(id);
        Some(self.tasks.remove(idx))
    }

    /// Replace the whole collection, dropping sessions whose task disappeared.
    /// Later duplicates of an id are ignored.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut seen = std::collections::HashSet::new();
        self.tasks = tasks
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();

        let stale: Vec<TaskId> = [
            self.edits.row().map(|r| r.task_id.clone()),
            self.edits.field().map(|f| f.task_id.clone()),
        ]
        .into_iter()
        .flatten()
        .filter(|id| self.get(id).is_none())
        .collect();
        for id in stale {
            self.edits.forget(&id);
        }
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.edits.clear();
    }

    /// Resolve a full id or a unique prefix of one.
    pub fn resolve_id(&self, needle: &str) -> Option<TaskId> {
        if let Some(t) = self.tasks.iter().find(|t| t.id.as_str() == needle) {
            return Some(t.id.clone());
        }
        let mut hits = self.tasks.iter().filter(|t| t.id.as_str().starts_with(needle));
        match (hits.next(), hits.next()) {
            (Some(t), None) if !needle.is_empty() => Some(t.id.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Category, Priority};

    #[test]
    fn create_rejects_blank_text() {
        let mut b = TaskBoard::new();
        assert!(b.create(&TaskDraft::new("  \t ")).is_none());
        assert!(b.is_empty());

        let id = b.create(&TaskDraft::new(" Buy milk ")).unwrap();
        let t = b.get(&id).unwrap();
        assert_eq!(t.text, "Buy milk");
        assert!(!t.completed);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut b = TaskBoard::new();
        let id = b.create(&TaskDraft::new("x")).unwrap();
        assert_eq!(b.toggle(&id), Some(true));
        assert_eq!(b.toggle(&id), Some(false));
        assert_eq!(b.toggle(&TaskId::new("missing")), None);
    }

    #[test]
    fn delete_cancels_edits_on_that_task() {
        let mut b = TaskBoard::new();
        let a = b.create(&TaskDraft::new("a")).unwrap();
        let c = b.create(&TaskDraft::new("c")).unwrap();
        b.begin_row_edit(&a);
        b.begin_field_edit(&c, EditField::Category);

        b.delete(&a).unwrap();
        assert!(b.edits().row().is_none());
        assert!(b.edits().field().is_some());
        assert_eq!(b.len(), 1);
        assert!(b.get(&c).is_some());
    }

    #[test]
    fn row_edit_save_and_cancel() {
        let mut b = TaskBoard::new();
        let id = b.create(&TaskDraft::new("draft me")).unwrap();

        b.begin_row_edit(&id);
        b.edits_mut().row_mut().unwrap().draft.text = "   ".to_string();
        assert!(!b.save_row_edit());
        assert!(b.edits().row().is_some(), "blank draft keeps the session open");

        {
            let row = b.edits_mut().row_mut().unwrap();
            row.draft.text = "  edited ".to_string();
            row.draft.priority = Priority::High;
        }
        assert!(b.save_row_edit());
        assert!(b.edits().row().is_none());
        let t = b.get(&id).unwrap();
        assert_eq!(t.text, "edited");
        assert_eq!(t.priority, Priority::High);

        b.begin_row_edit(&id);
        b.edits_mut().row_mut().unwrap().draft.text = "discarded".to_string();
        b.cancel_row_edit();
        assert_eq!(b.get(&id).unwrap().text, "edited");
    }

    #[test]
    fn field_edit_commits_single_field() {
        let mut b = TaskBoard::new();
        let id = b.create(&TaskDraft::new("x")).unwrap();
        assert!(b.begin_field_edit(&id, EditField::Category));
        assert!(!b.set_field_draft(FieldValue::Priority(Priority::Low)));
        assert!(b.set_field_draft(FieldValue::Category(Category::Health)));
        assert!(b.save_field_edit());
        let t = b.get(&id).unwrap();
        assert_eq!(t.category, Category::Health);
        assert_eq!(t.priority, Priority::Medium);
    }

    #[test]
    fn replace_all_drops_stale_sessions_and_duplicates() {
        let mut b = TaskBoard::new();
        let id = b.create(&TaskDraft::new("gone")).unwrap();
        b.begin_row_edit(&id);

        let keep = Task::from_draft(TaskId::new("k"), &TaskDraft::new("keep")).unwrap();
        b.replace_all(vec![keep.clone(), keep]);
        assert_eq!(b.len(), 1);
        assert!(b.edits().row().is_none());
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let b = TaskBoard::from_tasks(vec![
            Task::from_draft(TaskId::new("abc1"), &TaskDraft::new("a")).unwrap(),
            Task::from_draft(TaskId::new("abd2"), &TaskDraft::new("b")).unwrap(),
        ]);
        assert_eq!(b.resolve_id("abc"), Some(TaskId::new("abc1")));
        assert_eq!(b.resolve_id("ab"), None);
        assert_eq!(b.resolve_id("abd2"), Some(TaskId::new("abd2")));
    }
}
