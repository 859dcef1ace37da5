//! Storage collaborator contract.
//!
//! Every read and write the engine needs goes through [`Backend`]. Fetching
//! a missing record by id is `Ok(None)`; updating or deleting one is
//! [`Error::NotFound`]. Task reads come back with their domain, client and
//! project attached.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::field::RELATED_KEYS;
use crate::filter::{FilterClause, ScopeFilter};
use crate::model::{
    Client, ClientStatus, CustomFieldDef, CustomFieldType, DashboardStats, Domain, InboxItem,
    InboxSource, InboxStatus, Project, ProjectStatus, Rating, Task, TaskStatus, Template,
    TemplateTask,
};
use crate::sort::SortSpec;
use crate::view::{View, ViewColumn};

pub trait Backend: Send + Sync {
    fn list_domains(&self) -> Result<Vec<Domain>>;
    fn create_domain(&self, new: NewDomain) -> Result<Domain>;
    fn delete_domain(&self, id: &str) -> Result<()>;

    fn list_clients(&self) -> Result<Vec<Client>>;
    fn get_client(&self, id: &str) -> Result<Option<Client>>;
    fn create_client(&self, new: NewClient) -> Result<Client>;
    fn update_client(&self, id: &str, patch: ClientPatch) -> Result<Client>;
    fn delete_client(&self, id: &str) -> Result<()>;

    fn list_projects(&self, client_id: Option<&str>) -> Result<Vec<Project>>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn create_project(&self, new: NewProject) -> Result<Project>;
    fn update_project(&self, id: &str, patch: ProjectPatch) -> Result<Project>;
    fn delete_project(&self, id: &str) -> Result<()>;

    /// Tasks matching `scope`, highest priority first.
    fn list_tasks(&self, scope: &ScopeFilter) -> Result<Vec<Task>>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    fn create_task(&self, new: NewTask) -> Result<Task>;
    fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task>;
    fn delete_task(&self, id: &str) -> Result<()>;

    fn list_templates(&self) -> Result<Vec<Template>>;
    fn get_template(&self, id: &str) -> Result<Option<Template>>;
    fn create_template(&self, new: NewTemplate) -> Result<Template>;
    fn update_template(&self, id: &str, patch: TemplatePatch) -> Result<Template>;
    fn delete_template(&self, id: &str) -> Result<()>;
    fn create_template_task(&self, new: NewTemplateTask) -> Result<TemplateTask>;
    fn delete_template_task(&self, id: &str) -> Result<()>;

    /// Inbox items, newest first, optionally narrowed to one status.
    fn list_inbox(&self, status: Option<InboxStatus>) -> Result<Vec<InboxItem>>;
    fn create_inbox_item(&self, new: NewInboxItem) -> Result<InboxItem>;
    fn update_inbox_item(&self, id: &str, patch: InboxPatch) -> Result<InboxItem>;
    fn delete_inbox_item(&self, id: &str) -> Result<()>;

    fn list_views(&self) -> Result<Vec<View>>;
    fn get_view(&self, id: &str) -> Result<Option<View>>;
    fn create_view(&self, new: NewView) -> Result<View>;
    fn update_view(&self, id: &str, patch: ViewPatch) -> Result<View>;
    fn delete_view(&self, id: &str) -> Result<()>;

    fn list_custom_fields(&self) -> Result<Vec<CustomFieldDef>>;
    fn create_custom_field(&self, new: NewCustomField) -> Result<CustomFieldDef>;
    fn delete_custom_field(&self, id: &str) -> Result<()>;

    fn dashboard_stats(&self) -> Result<DashboardStats>;
}

/// Distinguishes an absent key from an explicit `null` in patches.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn require_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{kind} name cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDomain {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClientStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub onboarded_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl ClientPatch {
    pub fn apply(&self, client: &mut Client) -> Result<()> {
        if let Some(name) = &self.name {
            client.name = require_name("client", name)?;
        }
        if let Some(status) = self.status {
            client.status = status;
        }
        if let Some(onboarded_at) = self.onboarded_at {
            client.onboarded_at = onboarded_at;
        }
        if let Some(notes) = &self.notes {
            client.notes = notes.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            client.avatar_url = avatar_url.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl ProjectPatch {
    pub fn apply(&self, project: &mut Project) -> Result<()> {
        if let Some(name) = &self.name {
            project.name = require_name("project", name)?;
        }
        if let Some(client_id) = &self.client_id {
            project.client_id = client_id.clone();
        }
        if let Some(domain_id) = &self.domain_id {
            project.domain_id = domain_id.clone();
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub leverage: Rating,
    #[serde(default)]
    pub urgency: Rating,
    #[serde(default)]
    pub effort: Rating,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub template_task_id: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

/// Partial task update. Only present keys change; an explicit `null` on a
/// nullable key clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<BTreeMap<String, serde_json::Value>>,
}

/// Keys a caller may send back from a read that are derived, not stored.
pub const DERIVED_TASK_KEYS: [&str; 1] = ["priority_score"];

/// Keys fixed at creation. A read record carries them; a patch ignores them.
pub const READ_ONLY_TASK_KEYS: [&str; 3] = ["id", "created_at", "template_task_id"];

impl TaskPatch {
    /// Build a patch from a JSON object, dropping derived keys, read-only
    /// keys and attached related records. A task as returned by a read,
    /// edited in place, is a valid patch.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(Error::InvalidArgument(
                "task patch must be a JSON object".to_string(),
            ));
        };
        for key in DERIVED_TASK_KEYS
            .iter()
            .chain(READ_ONLY_TASK_KEYS.iter())
            .chain(RELATED_KEYS.iter())
        {
            map.remove(*key);
        }
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| Error::InvalidArgument(format!("invalid task patch: {e}")))
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, task: &mut Task) -> Result<()> {
        if let Some(title) = &self.title {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                return Err(Error::Validation("task title cannot be empty".to_string()));
            }
            task.title = trimmed.to_string();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(project_id) = &self.project_id {
            task.project_id = project_id.clone();
        }
        if let Some(client_id) = &self.client_id {
            task.client_id = client_id.clone();
        }
        if let Some(domain_id) = &self.domain_id {
            task.domain_id = domain_id.clone();
        }
        if let Some(leverage) = self.leverage {
            task.leverage = leverage;
        }
        if let Some(urgency) = self.urgency {
            task.urgency = urgency;
        }
        if let Some(effort) = self.effort {
            task.effort = effort;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(custom_fields) = &self.custom_fields {
            task.custom_fields = custom_fields.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl TemplatePatch {
    pub fn apply(&self, template: &mut Template) -> Result<()> {
        if let Some(name) = &self.name {
            template.name = require_name("template", name)?;
        }
        if let Some(description) = &self.description {
            template.description = description.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTemplateTask {
    pub template_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub default_urgency: Rating,
    #[serde(default)]
    pub default_leverage: Rating,
    #[serde(default)]
    pub default_effort: Rating,
    /// Appended after the template's last task when absent.
    #[serde(default)]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInboxItem {
    #[serde(default)]
    pub source: InboxSource,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InboxPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InboxStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub linked_task_id: Option<Option<String>>,
}

impl InboxPatch {
    pub fn apply(&self, item: &mut InboxItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(linked_task_id) = &self.linked_task_id {
            item.linked_task_id = linked_task_id.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewView {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ViewColumn>,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ViewColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterClause>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub sort: Option<Option<SortSpec>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl ViewPatch {
    pub fn apply(&self, view: &mut View) -> Result<()> {
        if let Some(name) = &self.name {
            view.name = require_name("view", name)?;
        }
        if let Some(description) = &self.description {
            view.description = description.clone();
        }
        if let Some(columns) = &self.columns {
            view.columns = columns.clone();
        }
        if let Some(filters) = &self.filters {
            view.filters = filters.clone();
        }
        if let Some(sort) = &self.sort {
            view.sort = sort.clone();
        }
        if let Some(group_by) = &self.group_by {
            view.group_by = group_by.clone();
        }
        if let Some(is_default) = self.is_default {
            view.is_default = is_default;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomField {
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    pub field_key: Option<String>,
    #[serde(default)]
    pub field_type: CustomFieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// `"Contract Value"` becomes `"contract_value"`.
pub fn field_key_from_name(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    key
}
