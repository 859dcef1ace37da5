//! Task listing pipeline.
//!
//! A [`TaskQuery`] narrows an in-memory task collection through the scope
//! filter, the saved-view clauses, the interactive UI filters and the
//! free-text search (in that order, each a conjunction with the previous),
//! then applies at most one sort.

use serde::{Deserialize, Serialize};

use crate::filter::{matches_all, FilterClause, ScopeFilter, UiFilters};
use crate::model::Task;
use crate::search;
use crate::sort::{sort_tasks, SortSpec};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub scope: ScopeFilter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub view_filters: Vec<FilterClause>,
    #[serde(default)]
    pub ui: UiFilters,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_view_filters(mut self, filters: impl IntoIterator<Item = FilterClause>) -> Self {
        self.view_filters.extend(filters);
        self
    }

    pub fn with_ui(mut self, ui: UiFilters) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Whether `task` passes every filter layer.
    pub fn admits(&self, task: &Task) -> bool {
        self.scope.matches(task)
            && matches_all(&self.view_filters, task)
            && self.ui.matches(task)
            && search::matches(task, &self.search)
    }

    /// Filtered and sorted references into `tasks`.
    pub fn apply<'a, I>(&self, tasks: I) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut visible: Vec<&Task> = tasks.into_iter().filter(|task| self.admits(task)).collect();
        if let Some(sort) = &self.sort {
            sort_tasks(&mut visible, sort);
        }
        visible
    }

    /// Owned variant of [`TaskQuery::apply`].
    pub fn run(&self, tasks: &[Task]) -> Vec<Task> {
        self.apply(tasks).into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Selection;
    use crate::model::{Rating, TaskStatus};
    use chrono::Utc;
    use serde_json::json;

    fn task(id: &str, status: TaskStatus, client: Option<&str>, leverage: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            description: None,
            project_id: None,
            client_id: client.map(str::to_string),
            domain_id: None,
            leverage: Rating::new(leverage).expect("rating"),
            urgency: Rating::new(1).expect("rating"),
            effort: Rating::new(1).expect("rating"),
            status,
            due_date: None,
            template_task_id: None,
            created_at: Utc::now(),
            completed_at: None,
            custom_fields: Default::default(),
            domain: None,
            client: None,
            project: None,
        }
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn layers_compose_as_conjunction() {
        let tasks = vec![
            task("a", TaskStatus::Todo, Some("cli-1"), 2),
            task("b", TaskStatus::Done, Some("cli-1"), 5),
            task("c", TaskStatus::Todo, Some("cli-2"), 4),
            task("d", TaskStatus::Todo, Some("cli-1"), 4),
        ];
        let query = TaskQuery::new()
            .with_scope(ScopeFilter::client("cli-1"))
            .with_view_filters([FilterClause::new("leverage", "gte", json!(3))])
            .with_ui(UiFilters {
                status: Selection::Only(TaskStatus::Todo),
                ..UiFilters::default()
            });
        assert_eq!(ids(&query.apply(&tasks)), vec!["d"]);
    }

    #[test]
    fn sort_is_applied_after_filtering() {
        let tasks = vec![
            task("low", TaskStatus::Todo, None, 1),
            task("high", TaskStatus::Todo, None, 5),
        ];
        let query = TaskQuery::new().with_sort(Some(SortSpec::by_priority()));
        assert_eq!(ids(&query.apply(&tasks)), vec!["high", "low"]);
        let unsorted = TaskQuery::new();
        assert_eq!(ids(&unsorted.apply(&tasks)), vec!["low", "high"]);
    }

    #[test]
    fn search_narrows_results() {
        let tasks = vec![
            task("1", TaskStatus::Todo, None, 1),
            task("2", TaskStatus::Todo, None, 1),
        ];
        let query = TaskQuery::new().with_search("task 2");
        assert_eq!(query.run(&tasks).len(), 1);
    }
}
