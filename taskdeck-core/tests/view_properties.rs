//! Property tests for the derived-view engine.

use chrono::NaiveDate;
use proptest::prelude::*;
use taskdeck_core::{
    derive_view, stats, Category, CategoryFilter, Priority, SortKey, StatusFilter, Task, TaskDraft, TaskId,
    ViewOptions,
};

fn arb_task() -> impl Strategy<Value = (String, usize, usize, Option<u32>, bool)> {
    (
        "[a-zA-Z ]{1,12}",
        0..Category::ALL.len(),
        0..Priority::ALL.len(),
        prop::option::of(0u32..400),
        any::<bool>(),
    )
}

fn build(raw: Vec<(String, usize, usize, Option<u32>, bool)>) -> Vec<Task> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    raw.into_iter()
        .enumerate()
        .map(|(i, (text, c, p, due, completed))| Task {
            id: TaskId::new(format!("t{i}")),
            text: format!("x{text}"),
            category: Category::ALL[c],
            priority: Priority::ALL[p],
            due_date: due.map(|d| base + chrono::Duration::days(d as i64)),
            completed,
        })
        .collect()
}

fn ids(view: &[&Task]) -> Vec<TaskId> {
    view.iter().map(|t| t.id.clone()).collect()
}

proptest! {
    #[test]
    fn priority_sort_groups_high_medium_low(raw in prop::collection::vec(arb_task(), 0..40)) {
        let tasks = build(raw);
        let opts = ViewOptions { sort: SortKey::Priority, ..ViewOptions::default() };
        let view = derive_view(&tasks, &opts);
        let ranks: Vec<u8> = view.iter().map(|t| t.priority.rank()).collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] >= w[1]));
        prop_assert_eq!(view.len(), tasks.len());
    }

    #[test]
    fn date_sort_puts_undated_last_and_dates_in_order(raw in prop::collection::vec(arb_task(), 0..40)) {
        let tasks = build(raw);
        let view = derive_view(&tasks, &ViewOptions::default());
        let first_undated = view.iter().position(|t| t.due_date.is_none()).unwrap_or(view.len());
        prop_assert!(view[first_undated..].iter().all(|t| t.due_date.is_none()));
        let dated: Vec<NaiveDate> = view[..first_undated].iter().filter_map(|t| t.due_date).collect();
        prop_assert_eq!(dated.len(), first_undated);
        prop_assert!(dated.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn completed_and_pending_partition_the_collection(raw in prop::collection::vec(arb_task(), 0..40)) {
        let tasks = build(raw);
        let done = derive_view(&tasks, &ViewOptions { status: StatusFilter::Completed, ..ViewOptions::default() });
        let open = derive_view(&tasks, &ViewOptions { status: StatusFilter::Pending, ..ViewOptions::default() });
        let all = derive_view(&tasks, &ViewOptions::default());

        let done_ids = ids(&done);
        prop_assert!(ids(&open).iter().all(|id| !done_ids.contains(id)));

        let mut union = done_ids.clone();
        union.extend(ids(&open));
        union.sort();
        let mut every = ids(&all);
        every.sort();
        prop_assert_eq!(union, every);
    }

    #[test]
    fn view_never_reorders_source(raw in prop::collection::vec(arb_task(), 0..30), c in 0..Category::ALL.len()) {
        let tasks = build(raw);
        let before = tasks.clone();
        let opts = ViewOptions {
            status: StatusFilter::All,
            category: CategoryFilter::Only(Category::ALL[c]),
            sort: SortKey::Name,
        };
        let view = derive_view(&tasks, &opts);
        prop_assert!(view.iter().all(|t| t.category == Category::ALL[c]));
        prop_assert_eq!(tasks, before);
    }

    #[test]
    fn stats_add_up(raw in prop::collection::vec(arb_task(), 0..40)) {
        let tasks = build(raw);
        let s = stats(&tasks);
        prop_assert_eq!(s.completed + s.pending, s.total);
        prop_assert!(s.percent <= 100);
    }
}

#[test]
fn percent_examples() {
    assert_eq!(stats(&[]).percent, 0);
    let mut tasks: Vec<Task> = (0..4)
        .map(|i| Task::from_draft(TaskId::new(format!("t{i}")), &TaskDraft::new("t")).unwrap())
        .collect();
    tasks[0].completed = true;
    assert_eq!(stats(&tasks).percent, 25);
}
