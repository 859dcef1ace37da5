//! Filter clauses and filter layers.
//!
//! Three independently sourced layers narrow a task listing:
//! - [`ScopeFilter`]: fixed equality constraints from the calling context
//! - [`FilterClause`]: `(field, operator, value)` clauses saved on a view
//! - [`UiFilters`]: interactive status/domain pickers with an "all" choice

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{filter_value, FieldValue};
use crate::model::{Task, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    Eq,
    Neq,
    In,
    Gte,
    Lte,
    Contains,
    /// Any operator this build does not know. Always passes.
    Unknown(String),
}

impl FilterOperator {
    pub fn as_str(&self) -> &str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::In => "in",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::Contains => "contains",
            FilterOperator::Unknown(raw) => raw,
        }
    }
}

impl From<String> for FilterOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "eq" => FilterOperator::Eq,
            "neq" => FilterOperator::Neq,
            "in" => FilterOperator::In,
            "gte" => FilterOperator::Gte,
            "lte" => FilterOperator::Lte,
            "contains" => FilterOperator::Contains,
            _ => FilterOperator::Unknown(value),
        }
    }
}

impl From<&str> for FilterOperator {
    fn from(value: &str) -> Self {
        FilterOperator::from(value.to_string())
    }
}

impl From<FilterOperator> for String {
    fn from(value: FilterOperator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One saved-view clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterClause {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<FilterOperator>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }

    /// Parse `field:operator:value`. The value is read as JSON when it is
    /// valid JSON and as a plain string otherwise; for `in`, a non-array
    /// value is split on commas.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.splitn(3, ':');
        let (field, operator, raw) = match (parts.next(), parts.next(), parts.next()) {
            (Some(field), Some(operator), Some(raw)) if !field.trim().is_empty() => {
                (field.trim(), operator.trim(), raw.trim())
            }
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "filter '{input}' must look like field:operator:value"
                )))
            }
        };
        let operator = FilterOperator::from(operator);
        let value = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) if operator != FilterOperator::In || value.is_array() => value,
            _ if operator == FilterOperator::In => serde_json::Value::Array(
                raw.split(',')
                    .map(|item| serde_json::Value::String(item.trim().to_string()))
                    .collect(),
            ),
            _ => serde_json::Value::String(raw.to_string()),
        };
        Ok(Self::new(field, operator, value))
    }

    pub fn matches(&self, task: &Task) -> bool {
        let actual = filter_value(task, &self.field);
        match &self.operator {
            FilterOperator::Eq => strict_eq(&actual, &self.value),
            FilterOperator::Neq => !strict_eq(&actual, &self.value),
            FilterOperator::In => match &self.value {
                serde_json::Value::Array(candidates) => {
                    candidates.iter().any(|candidate| strict_eq(&actual, candidate))
                }
                _ => false,
            },
            FilterOperator::Gte => compare_numeric(&actual, &self.value, |a, b| a >= b),
            FilterOperator::Lte => compare_numeric(&actual, &self.value, |a, b| a <= b),
            FilterOperator::Contains => match (actual.as_text(), self.value.as_str()) {
                (Some(text), Some(needle)) => {
                    text.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            FilterOperator::Unknown(_) => true,
        }
    }
}

/// Keep tasks satisfying every clause.
pub fn matches_all(clauses: &[FilterClause], task: &Task) -> bool {
    clauses.iter().all(|clause| clause.matches(task))
}

/// Strict equality between a task field and a clause value: same kind and
/// same value. Structured values never compare equal.
fn strict_eq(actual: &FieldValue<'_>, expected: &serde_json::Value) -> bool {
    match (actual, expected) {
        (FieldValue::Null, serde_json::Value::Null) => true,
        (FieldValue::Number(a), serde_json::Value::Number(b)) => b.as_f64() == Some(*a),
        (FieldValue::Text(a), serde_json::Value::String(b)) => a.as_ref() == b.as_str(),
        (FieldValue::Bool(a), serde_json::Value::Bool(b)) => a == b,
        _ => false,
    }
}

/// Numeric comparison; only numeric fields can satisfy it. The clause value
/// may be a number or a numeric string.
fn compare_numeric<F>(actual: &FieldValue<'_>, expected: &serde_json::Value, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let Some(actual) = actual.as_number() else {
        return false;
    };
    let expected = match expected {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match expected {
        Some(expected) => cmp(actual, expected),
        None => false,
    }
}

/// A picker that is either unconstrained or fixed to one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl<T> From<Option<T>> for Selection<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Selection::Only(value),
            None => Selection::All,
        }
    }
}

/// Context-supplied constraints (a client page, a project page, ...).
/// Never editable by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ScopeFilter {
    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }

    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.domain_id.is_none()
            && self.client_id.is_none()
            && self.project_id.is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        eq_opt(&self.domain_id, &task.domain_id)
            && eq_opt(&self.client_id, &task.client_id)
            && eq_opt(&self.project_id, &task.project_id)
    }
}

fn eq_opt(expected: &Option<String>, actual: &Option<String>) -> bool {
    match expected {
        Some(expected) => actual.as_deref() == Some(expected.as_str()),
        None => true,
    }
}

/// Interactive status and domain pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFilters {
    #[serde(default)]
    pub status: Selection<TaskStatus>,
    #[serde(default)]
    pub domain: Selection<String>,
}

impl UiFilters {
    pub fn matches(&self, task: &Task) -> bool {
        if !self.status.admits(&task.status) {
            return false;
        }
        match &self.domain {
            Selection::All => true,
            Selection::Only(domain_id) => task.domain_id.as_deref() == Some(domain_id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rating;
    use chrono::Utc;
    use serde_json::json;

    fn task(title: &str, status: TaskStatus) -> Task {
        Task {
            id: format!("tsk-{title}"),
            title: title.to_string(),
            description: None,
            project_id: None,
            client_id: Some("cli-1".to_string()),
            domain_id: None,
            leverage: Rating::new(3).expect("rating"),
            urgency: Rating::new(3).expect("rating"),
            effort: Rating::new(3).expect("rating"),
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

    #[test]
    fn eq_and_neq_are_strict() {
        let t = task("a", TaskStatus::Todo);
        assert!(FilterClause::new("leverage", "eq", json!(3)).matches(&t));
        assert!(FilterClause::new("leverage", "eq", json!(3.0)).matches(&t));
        assert!(!FilterClause::new("leverage", "eq", json!("3")).matches(&t));
        assert!(FilterClause::new("leverage", "neq", json!("3")).matches(&t));
        assert!(FilterClause::new("description", "eq", json!(null)).matches(&t));
    }

    #[test]
    fn in_requires_array_value() {
        let todo = task("a", TaskStatus::Todo);
        let done = task("b", TaskStatus::Done);
        let archived = task("c", TaskStatus::Archived);
        let clause = FilterClause::new("status", "in", json!(["todo", "done"]));
        assert!(clause.matches(&todo));
        assert!(clause.matches(&done));
        assert!(!clause.matches(&archived));
        assert!(!FilterClause::new("status", "in", json!("todo")).matches(&todo));
    }

    #[test]
    fn numeric_comparisons_need_numeric_field() {
        let t = task("a", TaskStatus::Todo);
        assert!(FilterClause::new("effort", "gte", json!(3)).matches(&t));
        assert!(!FilterClause::new("effort", "gte", json!(4)).matches(&t));
        assert!(FilterClause::new("effort", "lte", json!("3")).matches(&t));
        assert!(!FilterClause::new("title", "gte", json!(0)).matches(&t));
        assert!(!FilterClause::new("due_date", "lte", json!(99)).matches(&t));
    }

    #[test]
    fn contains_is_case_insensitive_on_text() {
        let t = task("Quarterly report", TaskStatus::Todo);
        assert!(FilterClause::new("title", "contains", json!("REPORT")).matches(&t));
        assert!(!FilterClause::new("title", "contains", json!("invoice")).matches(&t));
        assert!(!FilterClause::new("leverage", "contains", json!("3")).matches(&t));
    }

    #[test]
    fn unknown_operator_passes() {
        let t = task("a", TaskStatus::Todo);
        let clause = FilterClause::new("title", "startswith", json!("zzz"));
        assert!(matches!(clause.operator, FilterOperator::Unknown(_)));
        assert!(clause.matches(&t));
    }

    #[test]
    fn operator_serde_keeps_unknown_text() {
        let clause: FilterClause = serde_json::from_value(json!({
            "field": "title",
            "operator": "regex",
            "value": "x"
        }))
        .expect("clause");
        assert_eq!(clause.operator, FilterOperator::Unknown("regex".to_string()));
        let back = serde_json::to_value(&clause).expect("json");
        assert_eq!(back["operator"], "regex");
    }

    #[test]
    fn related_records_never_equal_scalars() {
        let mut t = task("a", TaskStatus::Todo);
        t.domain = Some(crate::model::Domain {
            id: "dom-1".to_string(),
            name: "Work".to_string(),
            parent_id: None,
            color: None,
            sort_order: 0,
            created_at: Utc::now(),
        });
        assert!(!FilterClause::new("domain", "eq", json!("Work")).matches(&t));
        assert!(FilterClause::new("domain", "neq", json!("Work")).matches(&t));
    }

    #[test]
    fn scope_and_ui_filters() {
        let t = task("a", TaskStatus::Todo);
        assert!(ScopeFilter::client("cli-1").matches(&t));
        assert!(!ScopeFilter::client("cli-2").matches(&t));
        assert!(!ScopeFilter::project("prj-1").matches(&t));

        let mut ui = UiFilters::default();
        assert!(ui.matches(&t));
        ui.status = Selection::Only(TaskStatus::Done);
        assert!(!ui.matches(&t));
        ui.status = Selection::All;
        ui.domain = Selection::Only("dom-1".to_string());
        assert!(!ui.matches(&t));
    }

    #[test]
    fn parse_reads_json_or_plain_values() {
        let clause = FilterClause::parse("leverage:gte:4").expect("parse");
        assert_eq!(clause, FilterClause::new("leverage", "gte", json!(4)));

        let clause = FilterClause::parse("due_date:lte:2026-01-01").expect("parse");
        assert_eq!(clause.value, json!("2026-01-01"));

        let clause = FilterClause::parse("status:in:todo, in_progress").expect("parse");
        assert_eq!(clause.value, json!(["todo", "in_progress"]));

        let clause = FilterClause::parse("status:in:[\"done\"]").expect("parse");
        assert_eq!(clause.value, json!(["done"]));

        assert!(matches!(
            FilterClause::parse("leverage:gte"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
