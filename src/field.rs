//! Field lookup on tasks by key.
//!
//! Filters and sorts name task fields with strings (they come from saved
//! views). Lookup resolves built-in keys first and falls back to the task's
//! custom fields. Missing values resolve to [`FieldValue::Null`].

use std::borrow::Cow;

use crate::model::Task;

/// Keys whose values live on a related record. Filtering sees the record
/// itself; sorting sees the record's name.
pub const RELATED_KEYS: [&str; 3] = ["domain", "client", "project"];

/// Keys resolved from the task itself. Custom fields cannot reuse them.
pub const TASK_KEYS: [&str; 16] = [
    "id",
    "title",
    "description",
    "project_id",
    "client_id",
    "domain_id",
    "leverage",
    "urgency",
    "effort",
    "priority_score",
    "status",
    "due_date",
    "template_task_id",
    "created_at",
    "completed_at",
    "custom_fields",
];

/// Whether `key` names a built-in or related task field.
pub fn is_reserved_key(key: &str) -> bool {
    TASK_KEYS.contains(&key) || RELATED_KEYS.contains(&key)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Number(f64),
    Text(Cow<'a, str>),
    Bool(bool),
    /// A structured value (related record, list, object). Never equal to a
    /// scalar comparison value.
    Opaque(Cow<'a, str>),
}

impl<'a> FieldValue<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    fn text(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }

    fn optional_text(value: Option<&'a str>) -> Self {
        value.map(FieldValue::text).unwrap_or(FieldValue::Null)
    }

    fn owned_text(value: String) -> Self {
        FieldValue::Text(Cow::Owned(value))
    }

    /// Convert a stored JSON scalar (custom field value).
    pub fn from_json(value: &'a serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(flag) => FieldValue::Bool(*flag),
            serde_json::Value::Number(number) => number
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
            serde_json::Value::String(text) => FieldValue::text(text),
            other => FieldValue::Opaque(Cow::Owned(other.to_string())),
        }
    }
}

/// Value of `key` as seen by filter clauses.
pub fn filter_value<'a>(task: &'a Task, key: &str) -> FieldValue<'a> {
    match key {
        "domain" => related(task.domain.as_ref().map(|d| d.name.as_str())),
        "client" => related(task.client.as_ref().map(|c| c.name.as_str())),
        "project" => related(task.project.as_ref().map(|p| p.name.as_str())),
        _ => base_value(task, key),
    }
}

/// Value of `key` as seen by the sort comparator. Related keys resolve to
/// the related record's name.
pub fn sort_value<'a>(task: &'a Task, key: &str) -> FieldValue<'a> {
    match key {
        "domain" => FieldValue::optional_text(task.domain.as_ref().map(|d| d.name.as_str())),
        "client" => FieldValue::optional_text(task.client.as_ref().map(|c| c.name.as_str())),
        "project" => FieldValue::optional_text(task.project.as_ref().map(|p| p.name.as_str())),
        _ => base_value(task, key),
    }
}

fn related(name: Option<&str>) -> FieldValue<'_> {
    match name {
        Some(name) => FieldValue::Opaque(Cow::Borrowed(name)),
        None => FieldValue::Null,
    }
}

fn base_value<'a>(task: &'a Task, key: &str) -> FieldValue<'a> {
    match key {
        "id" => FieldValue::text(&task.id),
        "title" => FieldValue::text(&task.title),
        "description" => FieldValue::optional_text(task.description.as_deref()),
        "project_id" => FieldValue::optional_text(task.project_id.as_deref()),
        "client_id" => FieldValue::optional_text(task.client_id.as_deref()),
        "domain_id" => FieldValue::optional_text(task.domain_id.as_deref()),
        "leverage" => FieldValue::Number(f64::from(task.leverage.get())),
        "urgency" => FieldValue::Number(f64::from(task.urgency.get())),
        "effort" => FieldValue::Number(f64::from(task.effort.get())),
        "priority_score" => FieldValue::Number(task.priority_score()),
        "status" => FieldValue::text(task.status.as_str()),
        "due_date" => task
            .due_date
            .map(|date| FieldValue::owned_text(date.format("%Y-%m-%d").to_string()))
            .unwrap_or(FieldValue::Null),
        "template_task_id" => FieldValue::optional_text(task.template_task_id.as_deref()),
        "created_at" => FieldValue::owned_text(task.created_at.to_rfc3339()),
        "completed_at" => task
            .completed_at
            .map(|at| FieldValue::owned_text(at.to_rfc3339()))
            .unwrap_or(FieldValue::Null),
        "custom_fields" => {
            if task.custom_fields.is_empty() {
                FieldValue::Opaque(Cow::Borrowed("{}"))
            } else {
                FieldValue::Opaque(Cow::Owned(
                    serde_json::to_string(&task.custom_fields).unwrap_or_default(),
                ))
            }
        }
        other => task
            .custom_fields
            .get(other)
            .map(FieldValue::from_json)
            .unwrap_or(FieldValue::Null),
    }
}
