//! Derived views: filtering, sorting and completion statistics.
//!
//! Everything here is a pure function of the task slice and the selectors.
//! Nothing is cached; callers recompute whenever they render.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::task::{Category, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
        }
    }

    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Completed => "completed",
            StatusFilter::Pending => "pending",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "open" => Ok(StatusFilter::Pending),
            other => Err(ParseError::Status(other.to_string())),
        }
    }
}

/// `All` or one specific category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => task.category == c,
        }
    }

    /// All -> each category in order -> All.
    pub fn next(self) -> Self {
        match self {
            CategoryFilter::All => CategoryFilter::Only(Category::ALL[0]),
            CategoryFilter::Only(c) => {
                let n = c.next();
                if n == Category::ALL[0] {
                    CategoryFilter::All
                } else {
                    CategoryFilter::Only(n)
                }
            }
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(c) => f.write_str(c.slug()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Priority,
    Category,
    Name,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Date => SortKey::Priority,
            SortKey::Priority => SortKey::Category,
            SortKey::Category => SortKey::Name,
            SortKey::Name => SortKey::Date,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Priority => "priority",
            SortKey::Category => "category",
            SortKey::Name => "name",
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
            SortKey::Category => locale_cmp(a.category.label(), b.category.label()),
            SortKey::Name => locale_cmp(&a.text, &b.text),
            SortKey::Date => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "due" => Ok(SortKey::Date),
            "priority" => Ok(SortKey::Priority),
            "category" => Ok(SortKey::Category),
            "name" | "text" => Ok(SortKey::Name),
            other => Err(ParseError::SortKey(other.to_string())),
        }
    }
}

/// Case-insensitive first, then case-sensitive so the order is total.
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// The three selectors of the filter/sort bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewOptions {
    pub status: StatusFilter,
    pub category: CategoryFilter,
    pub sort: SortKey,
}

impl ViewOptions {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task) && self.category.matches(task)
    }
}

/// Filtered tasks, in collection order.
pub fn filter_tasks<'a>(tasks: &'a [Task], opts: &ViewOptions) -> Vec<&'a Task> {
    tasks.iter().filter(|t| opts.matches(t)).collect()
}

/// Stable sort of an already-filtered view.
pub fn sort_tasks(view: &mut [&Task], key: SortKey) {
    view.sort_by(|a, b| key.compare(a, b));
}

/// Filter then sort. The source slice is left in its original order.
pub fn derive_view<'a>(tasks: &'a [Task], opts: &ViewOptions) -> Vec<&'a Task> {
    let mut view = filter_tasks(tasks, opts);
    sort_tasks(&mut view, opts.sort);
    view
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub percent: u32,
}

pub fn stats(tasks: &[Task]) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    Stats {
        total,
        completed,
        pending: total - completed,
        percent: completion_percent(completed, total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryStats {
    pub total: usize,
    pub completed: usize,
}

impl CategoryStats {
    pub fn percent(&self) -> u32 {
        completion_percent(self.completed, self.total)
    }
}

/// One entry per category, in `Category::ALL` order, ignoring any active filter.
pub fn category_stats(tasks: &[Task]) -> Vec<(Category, CategoryStats)> {
    Category::ALL
        .into_iter()
        .map(|c| {
            let mut s = CategoryStats::default();
            for t in tasks.iter().filter(|t| t.category == c) {
                s.total += 1;
                if t.completed {
                    s.completed += 1;
                }
            }
            (c, s)
        })
        .collect()
}

/// `round(completed / total * 100)`, `0` when there is nothing to complete.
pub fn completion_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, TaskDraft, TaskId};
    use chrono::NaiveDate;

    fn task(id: &str, text: &str, category: Category, priority: Priority, due: Option<&str>) -> Task {
        let mut d = TaskDraft::new(text)
            .with_category(category)
            .with_priority(priority);
        d.due_date = due.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        Task::from_draft(TaskId::new(id), &d).unwrap()
    }

    fn scenario() -> Vec<Task> {
        vec![
            task("1", "Buy milk", Category::Personal, Priority::Low, None),
            task("2", "Finish report", Category::Work, Priority::High, Some("2024-01-10")),
            task("3", "Review PR", Category::Work, Priority::Medium, Some("2024-01-05")),
        ]
    }

    fn texts(view: &[&Task]) -> Vec<String> {
        view.iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn date_sort_puts_undated_last() {
        let tasks = scenario();
        let view = derive_view(&tasks, &ViewOptions::default());
        assert_eq!(texts(&view), ["Review PR", "Finish report", "Buy milk"]);
    }

    #[test]
    fn priority_sort_is_descending() {
        let tasks = scenario();
        let opts = ViewOptions {
            sort: SortKey::Priority,
            ..ViewOptions::default()
        };
        let view = derive_view(&tasks, &opts);
        assert_eq!(texts(&view), ["Finish report", "Review PR", "Buy milk"]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let tasks = vec![
            task("1", "banana", Category::Personal, Priority::Low, None),
            task("2", "Apple", Category::Personal, Priority::Low, None),
            task("3", "cherry", Category::Personal, Priority::Low, None),
        ];
        let opts = ViewOptions {
            sort: SortKey::Name,
            ..ViewOptions::default()
        };
        assert_eq!(texts(&derive_view(&tasks, &opts)), ["Apple", "banana", "cherry"]);
    }

    #[test]
    fn category_sort_uses_labels() {
        let tasks = scenario();
        let opts = ViewOptions {
            sort: SortKey::Category,
            ..ViewOptions::default()
        };
        let view = derive_view(&tasks, &opts);
        assert_eq!(view[0].category, Category::Personal);
        assert_eq!(view[2].category, Category::Work);
    }

    #[test]
    fn sorting_leaves_source_untouched() {
        let tasks = scenario();
        let before = tasks.clone();
        let opts = ViewOptions {
            sort: SortKey::Name,
            ..ViewOptions::default()
        };
        let _ = derive_view(&tasks, &opts);
        assert_eq!(tasks, before);
    }

    #[test]
    fn filters_combine_with_and() {
        let mut tasks = scenario();
        tasks[1].completed = true;
        let opts = ViewOptions {
            status: StatusFilter::Pending,
            category: CategoryFilter::Only(Category::Work),
            sort: SortKey::Date,
        };
        assert_eq!(texts(&derive_view(&tasks, &opts)), ["Review PR"]);
    }

    #[test]
    fn percent_rounds_and_handles_empty() {
        assert_eq!(stats(&[]).percent, 0);
        let mut tasks = scenario();
        tasks.push(task("4", "Walk", Category::Health, Priority::Low, None));
        tasks[0].completed = true;
        let s = stats(&tasks);
        assert_eq!((s.total, s.completed, s.pending, s.percent), (4, 1, 3, 25));
        assert_eq!(completion_percent(2, 3), 67);
    }

    #[test]
    fn category_stats_cover_every_category() {
        let mut tasks = scenario();
        tasks[2].completed = true;
        let cs = category_stats(&tasks);
        assert_eq!(cs.len(), 4);
        assert_eq!(cs[1], (Category::Work, CategoryStats { total: 2, completed: 1 }));
        assert_eq!(cs[3].1, CategoryStats::default());
        assert_eq!(cs[1].1.percent(), 50);
    }

    #[test]
    fn selectors_parse_and_cycle() {
        assert_eq!("Pending".parse::<StatusFilter>().unwrap(), StatusFilter::Pending);
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "shopping".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Shopping)
        );
        assert!("soon".parse::<SortKey>().is_err());

        let mut f = CategoryFilter::All;
        for _ in 0..=Category::ALL.len() {
            f = f.next();
        }
        assert_eq!(f, CategoryFilter::All);
    }
}
