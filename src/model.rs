//! Record types shared by the engine and the storage backends.
//!
//! Tasks, projects and views are the records the query engine works on.
//! Related records (domain, client, project) are attached to tasks by the
//! backend at read time and never persisted alongside the task.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest accepted value for leverage, urgency and effort.
pub const RATING_MIN: u8 = 1;
/// Highest accepted value for leverage, urgency and effort.
pub const RATING_MAX: u8 = 5;

/// A task rating constrained to `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const DEFAULT: Rating = Rating(3);

    pub fn new(value: i64) -> Result<Self> {
        if value < i64::from(RATING_MIN) || value > i64::from(RATING_MAX) {
            return Err(Error::Validation(format!(
                "rating must be between {RATING_MIN} and {RATING_MAX}, got {value}"
            )));
        }
        Ok(Rating(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating::DEFAULT
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl FromStr for Rating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("rating must be an integer, got '{s}'")))?;
        Rating::new(value)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a snake_case status enum.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidArgument(format!(
                        concat!("unknown ", $label, " '{}' (expected {})"),
                        other,
                        [$($text),+].join("|")
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Archived,
}

string_enum!(TaskStatus, "task status", {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
    Archived => "archived",
});

impl TaskStatus {
    /// Statuses counted as active work.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Active,
    Onboarding,
    Paused,
    Completed,
}

string_enum!(ClientStatus, "client status", {
    Active => "active",
    Onboarding => "onboarding",
    Paused => "paused",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Archived,
}

string_enum!(ProjectStatus, "project status", {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Archived => "archived",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxSource {
    Slack,
    Email,
    #[default]
    Manual,
}

string_enum!(InboxSource, "inbox source", {
    Slack => "slack",
    Email => "email",
    Manual => "manual",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxStatus {
    #[default]
    Unread,
    Read,
    Actioned,
    Archived,
}

string_enum!(InboxStatus, "inbox status", {
    Unread => "unread",
    Read => "read",
    Actioned => "actioned",
    Archived => "archived",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldType {
    #[default]
    Text,
    Number,
    Select,
    Date,
    Checkbox,
    Url,
}

string_enum!(CustomFieldType, "custom field type", {
    Text => "text",
    Number => "number",
    Select => "select",
    Date => "date",
    Checkbox => "checkbox",
    Url => "url",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
}

impl Project {
    /// Copy without the attached related records.
    pub fn detached(&self) -> Project {
        Project {
            client: None,
            domain: None,
            ..self.clone()
        }
    }
}

/// A task record.
///
/// The priority score is not stored: [`Task::priority_score`] derives it
/// from the three ratings on every read, so no update path can make it
/// disagree with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub leverage: Rating,
    #[serde(default)]
    pub urgency: Rating,
    #[serde(default)]
    pub effort: Rating,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_task_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

impl Task {
    pub fn priority_score(&self) -> f64 {
        crate::priority::score(self.leverage, self.urgency, self.effort)
    }

    /// Copy without the attached related records.
    pub fn detached(&self) -> Task {
        Task {
            domain: None,
            client: None,
            project: None,
            ..self.clone()
        }
    }
}

/// Serialization view of a task that includes the derived score.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub priority_score: f64,
}

impl<'a> From<&'a Task> for TaskView<'a> {
    fn from(task: &'a Task) -> Self {
        TaskView {
            task,
            priority_score: task.priority_score(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub id: String,
    pub template_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub default_urgency: Rating,
    #[serde(default)]
    pub default_leverage: Rating,
    #[serde(default)]
    pub default_effort: Rating,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_tasks: Vec<TemplateTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxItem {
    pub id: String,
    #[serde(default)]
    pub source: InboxSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub status: InboxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_task_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub id: String,
    pub name: String,
    pub field_key: String,
    #[serde(default)]
    pub field_type: CustomFieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub active_tasks: usize,
    pub done_tasks: usize,
    pub total_clients: usize,
    pub unread_inbox: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_rejects_out_of_range() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(5).expect("rating").get(), 5);
        assert!("abc".parse::<Rating>().is_err());
        assert_eq!(" 2 ".parse::<Rating>().expect("parse").get(), 2);
    }

    #[test]
    fn rating_deserialization_validates() {
        let ok: Rating = serde_json::from_str("4").expect("valid rating");
        assert_eq!(ok.get(), 4);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().expect("parse"), *status);
        }
        let err = "later".parse::<TaskStatus>().expect_err("unknown status");
        assert!(err.to_string().contains("todo|in_progress|done|archived"));
    }

    #[test]
    fn task_view_includes_score() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "tsk-1",
            "title": "Write report",
            "leverage": 5,
            "urgency": 5,
            "effort": 1,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .expect("task");
        let json = serde_json::to_value(TaskView::from(&task)).expect("json");
        assert_eq!(json["priority_score"], serde_json::json!(15.0));
        assert_eq!(json["status"], "todo");
    }
}
