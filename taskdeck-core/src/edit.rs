//! Edit sessions: a full-row draft and a single-field inline draft.
//!
//! At most one of each is open. A row session on a task blocks a field
//! session on that same task.

use chrono::NaiveDate;

use crate::task::{Category, Priority, Task, TaskDraft, TaskId, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Category,
    Priority,
    DueDate,
}

/// Draft value of a single-field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Category(Category),
    Priority(Priority),
    DueDate(Option<NaiveDate>),
}

impl FieldValue {
    pub fn field(&self) -> EditField {
        match self {
            FieldValue::Category(_) => EditField::Category,
            FieldValue::Priority(_) => EditField::Priority,
            FieldValue::DueDate(_) => EditField::DueDate,
        }
    }

    /// Current value of `field` on `task`.
    pub fn of(task: &Task, field: EditField) -> Self {
        match field {
            EditField::Category => FieldValue::Category(task.category),
            EditField::Priority => FieldValue::Priority(task.priority),
            EditField::DueDate => FieldValue::DueDate(task.due_date),
        }
    }

    pub fn to_patch(self) -> TaskPatch {
        let mut patch = TaskPatch::default();
        match self {
            FieldValue::Category(c) => patch.category = Some(c),
            FieldValue::Priority(p) => patch.priority = Some(p),
            FieldValue::DueDate(d) => patch.due_date = Some(d),
        }
        patch
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowEdit {
    pub task_id: TaskId,
    pub draft: TaskDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub task_id: TaskId,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSessions {
    row: Option<RowEdit>,
    field: Option<FieldEdit>,
}

impl EditSessions {
    pub fn row(&self) -> Option<&RowEdit> {
        self.row.as_ref()
    }

    pub fn row_mut(&mut self) -> Option<&mut RowEdit> {
        self.row.as_mut()
    }

    pub fn field(&self) -> Option<&FieldEdit> {
        self.field.as_ref()
    }

    pub fn field_mut(&mut self) -> Option<&mut FieldEdit> {
        self.field.as_mut()
    }

    pub fn is_row_editing(&self, id: &TaskId) -> bool {
        self.row.as_ref().is_some_and(|r| &r.task_id == id)
    }

    /// Open a row session seeded from the task, replacing any other row session.
    pub fn begin_row(&mut self, task: &Task) {
        if self.field.as_ref().is_some_and(|f| f.task_id == task.id) {
            self.field = None;
        }
        self.row = Some(RowEdit {
            task_id: task.id.clone(),
            draft: task.draft(),
        });
    }

    /// Open a field session. Returns `false` when the row is under full edit.
    pub fn begin_field(&mut self, task: &Task, field: EditField) -> bool {
        if self.is_row_editing(&task.id) {
            return false;
        }
        self.field = Some(FieldEdit {
            task_id: task.id.clone(),
            value: FieldValue::of(task, field),
        });
        true
    }

    pub fn cancel_row(&mut self) {
        self.row = None;
    }

    pub fn cancel_field(&mut self) {
        self.field = None;
    }

    pub fn take_field(&mut self) -> Option<FieldEdit> {
        self.field.take()
    }

    /// Drop whichever sessions belong to a deleted task.
    pub fn forget(&mut self, id: &TaskId) {
        if self.row.as_ref().is_some_and(|r| &r.task_id == id) {
            self.row = None;
        }
        if self.field.as_ref().is_some_and(|f| &f.task_id == id) {
            self.field = None;
        }
    }

    pub fn clear(&mut self) {
        self.row = None;
        self.field = None;
    }
}
