//! Saved table views.
//!
//! A view stores a column layout, filter clauses and an optional sort. Which
//! view is active is held by the caller in a [`ViewSelection`] and passed in
//! explicitly; nothing here keeps global state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::FilterClause;
use crate::query::TaskQuery;
use crate::sort::SortSpec;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    #[default]
    #[serde(rename = "built-in")]
    BuiltIn,
    #[serde(rename = "custom")]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewColumn {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ViewColumn {
    pub fn built_in(key: &str, label: &str, visible: bool, width: u32) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            column_type: ColumnType::BuiltIn,
            visible,
            width: Some(width),
        }
    }

    pub fn custom(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            column_type: ColumnType::Custom,
            visible: true,
            width: None,
        }
    }
}

/// Every built-in column, in display order.
pub fn built_in_columns() -> Vec<ViewColumn> {
    vec![
        ViewColumn::built_in("title", "Title", true, 280),
        ViewColumn::built_in("status", "Status", true, 120),
        ViewColumn::built_in("domain", "Domain", true, 140),
        ViewColumn::built_in("client", "Client", true, 140),
        ViewColumn::built_in("project", "Project", true, 140),
        ViewColumn::built_in("leverage", "Leverage", true, 90),
        ViewColumn::built_in("urgency", "Urgency", true, 90),
        ViewColumn::built_in("effort", "Effort", true, 90),
        ViewColumn::built_in("priority_score", "Score", true, 80),
        ViewColumn::built_in("due_date", "Due Date", true, 120),
        ViewColumn::built_in("description", "Description", false, 200),
        ViewColumn::built_in("created_at", "Created", false, 120),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ViewColumn>,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Columns to render: the view's visible columns when it defines any,
/// otherwise the built-in columns that are visible by default.
pub fn resolve_columns(view: Option<&View>) -> Vec<ViewColumn> {
    match view {
        Some(view) if !view.columns.is_empty() => view
            .columns
            .iter()
            .filter(|column| column.visible)
            .cloned()
            .collect(),
        _ => built_in_columns()
            .into_iter()
            .filter(|column| column.visible)
            .collect(),
    }
}

/// Sort a view starts with: its own, else `fallback`.
pub fn effective_sort(view: Option<&View>, fallback: &SortSpec) -> SortSpec {
    view.and_then(|view| view.sort.clone())
        .unwrap_or_else(|| fallback.clone())
}

/// Query seeded from a view: its clauses and its sort (or `fallback`).
pub fn query_for_view(view: Option<&View>, fallback: &SortSpec) -> TaskQuery {
    let filters = view.map(|view| view.filters.clone()).unwrap_or_default();
    TaskQuery::new()
        .with_view_filters(filters)
        .with_sort(Some(effective_sort(view, fallback)))
}

/// Built-in columns with per-key visibility overrides, for a new view.
pub fn columns_with_overrides(overrides: &HashMap<String, bool>) -> Vec<ViewColumn> {
    built_in_columns()
        .into_iter()
        .map(|mut column| {
            if let Some(visible) = overrides.get(&column.key) {
                column.visible = *visible;
            }
            column
        })
        .collect()
}

pub fn validate_view_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("view name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Which saved view is active for one listing surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSelection {
    active: Option<String>,
}

impl ViewSelection {
    /// Start on the default view, else the first view, else none.
    pub fn initial(views: &[View]) -> Self {
        let active = views
            .iter()
            .find(|view| view.is_default)
            .or_else(|| views.first())
            .map(|view| view.id.clone());
        Self { active }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active<'a>(&self, views: &'a [View]) -> Option<&'a View> {
        let id = self.active.as_deref()?;
        views.iter().find(|view| view.id == id)
    }

    pub fn select(&mut self, views: &[View], id: &str) -> Result<()> {
        if !views.iter().any(|view| view.id == id) {
            return Err(Error::not_found("view", id));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    /// Refresh after a reload. Keeps the current choice, or picks the
    /// initial view when nothing is selected yet.
    pub fn reconcile(&mut self, views: &[View]) {
        if self.active.is_none() {
            *self = Self::initial(views);
        }
    }

    /// Update after `deleted` was removed. Deleting the active view falls
    /// back to the first remaining view, or none (built-in columns).
    pub fn after_delete(&mut self, deleted: &str, remaining: &[View]) {
        if self.active.as_deref() == Some(deleted) {
            self.active = remaining
                .iter()
                .find(|view| view.id != deleted)
                .map(|view| view.id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(id: &str, is_default: bool) -> View {
        View {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            columns: Vec::new(),
            filters: Vec::new(),
            sort: None,
            group_by: None,
            is_default,
            sort_order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn builtin_columns_used_without_view() {
        let keys: Vec<String> = resolve_columns(None).into_iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![
                "title",
                "status",
                "domain",
                "client",
                "project",
                "leverage",
                "urgency",
                "effort",
                "priority_score",
                "due_date"
            ]
        );
    }

    #[test]
    fn view_columns_govern_when_present() {
        let mut v = view("v1", false);
        v.columns = vec![
            ViewColumn::built_in("effort", "Effort", true, 90),
            ViewColumn::built_in("title", "Title", true, 280),
            ViewColumn::built_in("status", "Status", false, 120),
            ViewColumn::custom("budget", "Budget"),
        ];
        let keys: Vec<String> = resolve_columns(Some(&v)).into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["effort", "title", "budget"]);

        let empty = view("v2", false);
        assert_eq!(resolve_columns(Some(&empty)).len(), 10);
    }

    #[test]
    fn selection_prefers_default_then_first() {
        let views = vec![view("a", false), view("b", true)];
        assert_eq!(ViewSelection::initial(&views).active_id(), Some("b"));
        let views = vec![view("a", false), view("c", false)];
        assert_eq!(ViewSelection::initial(&views).active_id(), Some("a"));
        assert_eq!(ViewSelection::initial(&[]).active_id(), None);
    }

    #[test]
    fn deleting_active_view_falls_back() {
        let views = vec![view("a", true), view("b", false)];
        let mut selection = ViewSelection::initial(&views);
        let remaining = vec![view("b", false)];
        selection.after_delete("a", &remaining);
        assert_eq!(selection.active_id(), Some("b"));

        selection.after_delete("b", &[]);
        assert_eq!(selection.active_id(), None);
        assert!(resolve_columns(selection.active(&[])).iter().all(|c| c.visible));
    }

    #[test]
    fn deleting_other_view_keeps_selection() {
        let views = vec![view("a", true), view("b", false)];
        let mut selection = ViewSelection::initial(&views);
        selection.after_delete("b", &views[..1]);
        assert_eq!(selection.active_id(), Some("a"));
    }

    #[test]
    fn query_for_view_uses_view_sort_or_fallback() {
        let mut v = view("a", false);
        v.filters = vec![FilterClause::new("status", "eq", json!("todo"))];
        let query = query_for_view(Some(&v), &SortSpec::by_priority());
        assert_eq!(query.view_filters.len(), 1);
        assert_eq!(query.sort, Some(SortSpec::by_priority()));

        v.sort = Some(SortSpec::asc("due_date"));
        let query = query_for_view(Some(&v), &SortSpec::by_priority());
        assert_eq!(query.sort, Some(SortSpec::asc("due_date")));
    }

    #[test]
    fn overrides_toggle_visibility() {
        let overrides: HashMap<String, bool> =
            [("description".to_string(), true), ("title".to_string(), false)]
                .into_iter()
                .collect();
        let columns = columns_with_overrides(&overrides);
        let visible: Vec<&str> = columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.key.as_str())
            .collect();
        assert!(visible.contains(&"description"));
        assert!(!visible.contains(&"title"));
        assert_eq!(columns.len(), 12);
    }

    #[test]
    fn select_rejects_unknown_view() {
        let views = vec![view("a", false)];
        let mut selection = ViewSelection::default();
        assert!(selection.select(&views, "zzz").is_err());
        selection.select(&views, "a").expect("select");
        assert_eq!(selection.active(&views).map(|v| v.id.as_str()), Some("a"));
    }
}
