//! Task and inbox mutations.
//!
//! Every mutation returns its outcome; callers decide whether to reload,
//! patch local state or report the error. Bulk actions try every record and
//! return a [`BulkReport`] instead of stopping at the first failure.

use std::thread;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{Backend, InboxPatch, TaskPatch};
use crate::error::{Error, Result};
use crate::filter::ScopeFilter;
use crate::model::{
    Client, CustomFieldType, DashboardStats, InboxItem, InboxStatus, Rating, Task, TaskStatus,
};

/// Writes in flight at once during a bulk action.
pub const BULK_CONCURRENCY: usize = 8;

/// Clients shown on the dashboard.
pub const RECENT_CLIENTS: usize = 4;

#[derive(Debug)]
pub struct BulkFailure {
    pub id: String,
    pub error: Error,
}

/// Outcome of a multi-record operation, in input order.
#[derive(Debug)]
pub struct BulkReport<T> {
    pub operation: String,
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> BulkReport<T> {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Ok` when nothing failed, [`Error::PartialFailure`] when some steps
    /// succeeded, and the first underlying error when none did.
    pub fn into_result(self) -> Result<Vec<T>> {
        let mut failed = self.failed;
        if failed.is_empty() {
            return Ok(self.succeeded);
        }
        if self.succeeded.is_empty() {
            return Err(failed.remove(0).error);
        }
        let first = &failed[0];
        Err(Error::PartialFailure {
            operation: self.operation,
            succeeded: self.succeeded.len(),
            failed: failed.len(),
            reason: format!("{}: {}", first.id, first.error),
        })
    }
}

/// Run `op` for every id, [`BULK_CONCURRENCY`] at a time.
pub fn run_bulk<B, T, F>(backend: &B, operation: &str, ids: &[String], op: F) -> BulkReport<T>
where
    B: Backend + ?Sized,
    T: Send,
    F: Fn(&B, &str) -> Result<T> + Sync,
{
    let mut report = BulkReport::new(operation);
    for chunk in ids.chunks(BULK_CONCURRENCY) {
        thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|id| {
                    let op = &op;
                    (id, scope.spawn(move || op(backend, id)))
                })
                .collect();
            for (id, handle) in handles {
                match handle.join() {
                    Ok(Ok(value)) => report.succeeded.push(value),
                    Ok(Err(error)) => report.failed.push(BulkFailure {
                        id: id.clone(),
                        error,
                    }),
                    Err(_) => report.failed.push(BulkFailure {
                        id: id.clone(),
                        error: Error::OperationFailed(format!("{operation} worker panicked")),
                    }),
                }
            }
        });
    }

    if report.is_complete() {
        info!(operation, count = report.succeeded.len(), "bulk action finished");
    } else {
        warn!(
            operation,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk action finished with failures"
        );
    }
    report
}

/// Patch for a status change. `completed_at` is stamped when the task
/// becomes done and cleared for any other status.
pub fn status_patch(status: TaskStatus) -> TaskPatch {
    TaskPatch {
        status: Some(status),
        completed_at: Some((status == TaskStatus::Done).then(Utc::now)),
        ..TaskPatch::default()
    }
}

/// Checkbox behaviour: done goes back to todo, anything else becomes done.
pub fn toggled_status(status: TaskStatus) -> TaskStatus {
    match status {
        TaskStatus::Done => TaskStatus::Todo,
        _ => TaskStatus::Done,
    }
}

pub fn set_status<B: Backend + ?Sized>(backend: &B, id: &str, status: TaskStatus) -> Result<Task> {
    backend.update_task(id, status_patch(status))
}

pub fn toggle_status<B: Backend + ?Sized>(backend: &B, id: &str) -> Result<Task> {
    let task = backend
        .get_task(id)?
        .ok_or_else(|| Error::not_found("task", id))?;
    set_status(backend, id, toggled_status(task.status))
}

pub fn bulk_set_status<B: Backend + ?Sized>(
    backend: &B,
    ids: &[String],
    status: TaskStatus,
) -> BulkReport<Task> {
    run_bulk(backend, "bulk status change", ids, |backend, id| {
        set_status(backend, id, status)
    })
}

pub fn bulk_delete<B: Backend + ?Sized>(backend: &B, ids: &[String]) -> BulkReport<String> {
    run_bulk(backend, "bulk delete", ids, |backend, id| {
        backend.delete_task(id).map(|()| id.to_string())
    })
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_date(raw: &str) -> Result<Option<NaiveDate>> {
    match optional_text(raw) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::Validation(format!("invalid date '{text}' (expected YYYY-MM-DD)"))),
    }
}

/// Patch for editing one built-in cell from raw text. Empty text clears
/// optional fields; ratings must be integers in 1..=5. Returns `None` for
/// keys that are not built-in editable fields.
pub fn inline_edit_patch(field: &str, raw: &str) -> Result<Option<TaskPatch>> {
    let mut patch = TaskPatch::default();
    match field {
        "title" => {
            let title = optional_text(raw)
                .ok_or_else(|| Error::Validation("task title cannot be empty".to_string()))?;
            patch.title = Some(title);
        }
        "description" => patch.description = Some(optional_text(raw)),
        "leverage" => patch.leverage = Some(raw.parse::<Rating>()?),
        "urgency" => patch.urgency = Some(raw.parse::<Rating>()?),
        "effort" => patch.effort = Some(raw.parse::<Rating>()?),
        "due_date" => patch.due_date = Some(parse_date(raw)?),
        "status" => return Ok(Some(status_patch(raw.parse()?))),
        _ => return Ok(None),
    }
    Ok(Some(patch))
}

/// JSON value for a custom field typed in as text.
pub fn custom_field_value(field_type: CustomFieldType, raw: &str) -> Result<serde_json::Value> {
    let Some(text) = optional_text(raw) else {
        return Ok(serde_json::Value::Null);
    };
    match field_type {
        CustomFieldType::Number => {
            let number: f64 = text
                .parse()
                .map_err(|_| Error::Validation(format!("'{text}' is not a number")))?;
            serde_json::Number::from_f64(number)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::Validation(format!("'{text}' is not a finite number")))
        }
        CustomFieldType::Checkbox => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(serde_json::Value::Bool(true)),
            "false" | "no" | "0" => Ok(serde_json::Value::Bool(false)),
            _ => Err(Error::Validation(format!("'{text}' is not a checkbox value"))),
        },
        CustomFieldType::Date => {
            parse_date(&text)?;
            Ok(serde_json::Value::String(text))
        }
        CustomFieldType::Text | CustomFieldType::Select | CustomFieldType::Url => {
            Ok(serde_json::Value::String(text))
        }
    }
}

/// Edit one cell of a task: a built-in field or a defined custom field.
pub fn inline_edit<B: Backend + ?Sized>(
    backend: &B,
    id: &str,
    field: &str,
    raw: &str,
) -> Result<Task> {
    if let Some(patch) = inline_edit_patch(field, raw)? {
        return backend.update_task(id, patch);
    }

    let def = backend
        .list_custom_fields()?
        .into_iter()
        .find(|def| def.field_key == field)
        .ok_or_else(|| Error::InvalidArgument(format!("field '{field}' cannot be edited")))?;
    if def.field_type == CustomFieldType::Select {
        if let Some(choice) = optional_text(raw) {
            if !def.options.is_empty() && !def.options.contains(&choice) {
                return Err(Error::Validation(format!(
                    "'{choice}' is not an option of {} (expected {})",
                    def.name,
                    def.options.join("|")
                )));
            }
        }
    }
    let value = custom_field_value(def.field_type, raw)?;

    let task = backend
        .get_task(id)?
        .ok_or_else(|| Error::not_found("task", id))?;
    let mut custom_fields = task.custom_fields;
    if value.is_null() {
        custom_fields.remove(field);
    } else {
        custom_fields.insert(field.to_string(), value);
    }
    backend.update_task(
        id,
        TaskPatch {
            custom_fields: Some(custom_fields),
            ..TaskPatch::default()
        },
    )
}

/// Apply a JSON patch to a task. The object may be a task read back from
/// the backend with edits; its score and related records are ignored.
pub fn update_task_json<B: Backend + ?Sized>(
    backend: &B,
    id: &str,
    value: serde_json::Value,
) -> Result<Task> {
    let mut patch = TaskPatch::from_json(value)?;
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "task patch changes nothing".to_string(),
        ));
    }
    if patch.completed_at.is_none() {
        if let Some(status) = patch.status {
            patch.completed_at = status_patch(status).completed_at;
        }
    }
    backend.update_task(id, patch)
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub top_tasks: Vec<Task>,
    pub recent_clients: Vec<Client>,
}

/// Counts, the `top_n` highest priority todo tasks and the most recently
/// added clients.
pub fn dashboard<B: Backend + ?Sized>(backend: &B, top_n: usize) -> Result<Dashboard> {
    let stats = backend.dashboard_stats()?;
    let scope = ScopeFilter {
        status: Some(TaskStatus::Todo),
        ..ScopeFilter::default()
    };
    let mut top_tasks = backend.list_tasks(&scope)?;
    top_tasks.truncate(top_n);
    let mut recent_clients = backend.list_clients()?;
    recent_clients.truncate(RECENT_CLIENTS);
    Ok(Dashboard {
        stats,
        top_tasks,
        recent_clients,
    })
}

pub fn mark_inbox<B: Backend + ?Sized>(
    backend: &B,
    id: &str,
    status: InboxStatus,
) -> Result<InboxItem> {
    backend.update_inbox_item(
        id,
        InboxPatch {
            status: Some(status),
            ..InboxPatch::default()
        },
    )
}
