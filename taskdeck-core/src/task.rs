//! Task model shared by the local and persisted boards.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Opaque task identifier. Local boards mint UUIDs; the hosted store assigns its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Shopping,
    Health,
}

impl Category {
    /// All categories in declaration order. The first one is the default.
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Work,
        Category::Shopping,
        Category::Health,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Personal => "Personal",
            Category::Work => "Work",
            Category::Shopping => "Shopping",
            Category::Health => "Health",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Health => "health",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::Category(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Sort rank: higher is more important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::Priority(s.to_string()))
    }
}

/// Parse a due date from user input. Empty input means "no due date".
pub fn parse_due_date(s: &str) -> Result<Option<NaiveDate>, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ParseError::DueDate(s.to_string()))
}

/// Render a due date the way it is stored: ISO date or empty.
pub fn format_due_date(due: Option<NaiveDate>) -> String {
    due.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
}

impl Task {
    /// Build a task from a draft. Returns `None` when the trimmed text is empty.
    pub fn from_draft(id: TaskId, draft: &TaskDraft) -> Option<Self> {
        let text = draft.trimmed_text()?;
        Some(Self {
            id,
            text,
            category: draft.category,
            priority: draft.priority,
            due_date: draft.due_date,
            completed: false,
        })
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            text: self.text.clone(),
            category: self.category,
            priority: self.priority,
            due_date: self.due_date,
        }
    }

    /// Apply a partial update in place. Text is only replaced when non-empty after trimming.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(text) = patch.text.as_deref().map(str::trim) {
            if !text.is_empty() {
                self.text = text.to_string();
            }
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// The user-editable fields of a task: the create form and the row edit draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub text: String,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn trimmed_text(&self) -> Option<String> {
        let t = self.text.trim();
        if t.is_empty() { None } else { Some(t.to_string()) }
    }

    /// Full-row patch carrying every editable field, with trimmed text.
    pub fn to_patch(&self) -> Option<TaskPatch> {
        let text = self.trimmed_text()?;
        Some(TaskPatch {
            text: Some(text),
            category: Some(self.category),
            priority: Some(self.priority),
            due_date: Some(self.due_date),
            completed: None,
        })
    }
}

/// Partial update sent to the store. `due_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_first_category_and_medium() {
        let d = TaskDraft::new("x");
        assert_eq!(d.category, Category::Personal);
        assert_eq!(d.priority, Priority::Medium);
        assert_eq!(d.due_date, None);
    }

    #[test]
    fn from_draft_rejects_whitespace_text() {
        assert!(Task::from_draft(TaskId::new("a"), &TaskDraft::new("   ")).is_none());
        let t = Task::from_draft(TaskId::new("a"), &TaskDraft::new("  Buy milk ")).unwrap();
        assert_eq!(t.text, "Buy milk");
        assert!(!t.completed);
    }

    #[test]
    fn category_parse_is_closed() {
        assert_eq!("Work".parse::<Category>().unwrap(), Category::Work);
        assert_eq!(" health ".parse::<Category>().unwrap(), Category::Health);
        assert!("errands".parse::<Category>().is_err());
    }

    #[test]
    fn due_date_empty_means_none() {
        assert_eq!(parse_due_date("").unwrap(), None);
        assert_eq!(
            parse_due_date("2024-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert!(parse_due_date("01/05/2024").is_err());
        assert_eq!(format_due_date(None), "");
    }

    #[test]
    fn patch_serializes_cleared_date_as_null() {
        let patch = TaskPatch {
            due_date: Some(None),
            ..TaskPatch::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"due_date":null}"#);
        assert_eq!(
            serde_json::to_string(&TaskPatch::completed(true)).unwrap(),
            r#"{"completed":true}"#
        );
    }

    #[test]
    fn apply_ignores_empty_text() {
        let mut t = Task::from_draft(TaskId::new("a"), &TaskDraft::new("keep")).unwrap();
        t.apply(&TaskPatch {
            text: Some("  ".to_string()),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        });
        assert_eq!(t.text, "keep");
        assert_eq!(t.priority, Priority::High);
    }
}
