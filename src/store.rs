//! Dataset-backed implementations of [`Backend`].
//!
//! The whole dataset is one JSON document. [`MemoryBackend`] keeps it behind
//! a mutex; [`FileBackend`] loads it, applies the change and writes it back
//! atomically while holding an exclusive lock on `<data file>.lock`.
//!
//! # File layout
//!
//! ```text
//! .pos.toml            # configuration
//! .pos/
//!   data.json          # dataset (schema pos.data.v1)
//!   data.json.lock     # writer lock
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::backend::{
    field_key_from_name, require_name, Backend, ClientPatch, InboxPatch, NewClient,
    NewCustomField, NewDomain, NewInboxItem, NewProject, NewTask, NewTemplate, NewTemplateTask,
    NewView, ProjectPatch, TaskPatch, TemplatePatch, ViewPatch,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::field::is_reserved_key;
use crate::filter::ScopeFilter;
use crate::lock::{self, lock_path_for, FileLock};
use crate::model::{
    Client, CustomFieldDef, DashboardStats, Domain, InboxItem, InboxStatus, Project, Task,
    TaskStatus, Template, TemplateTask,
};
use crate::sort::{sort_tasks, SortSpec};
use crate::view::{validate_view_name, View};

pub const DATA_SCHEMA_VERSION: &str = "pos.data.v1";
const ID_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Domain,
    Client,
    Project,
    Task,
    Template,
    TemplateTask,
    InboxItem,
    View,
    CustomField,
}

impl RecordKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Domain => "dom",
            RecordKind::Client => "cli",
            RecordKind::Project => "prj",
            RecordKind::Task => "tsk",
            RecordKind::Template => "tpl",
            RecordKind::TemplateTask => "tt",
            RecordKind::InboxItem => "inb",
            RecordKind::View => "viw",
            RecordKind::CustomField => "cf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Domain => "domain",
            RecordKind::Client => "client",
            RecordKind::Project => "project",
            RecordKind::Task => "task",
            RecordKind::Template => "template",
            RecordKind::TemplateTask => "template task",
            RecordKind::InboxItem => "inbox item",
            RecordKind::View => "view",
            RecordKind::CustomField => "custom field",
        }
    }
}

/// New id of the form `<prefix>-<8 lowercase ulid chars>`, skipping any id
/// `taken` reports as used.
pub fn generate_id(kind: RecordKind, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let raw = Ulid::new().to_string().to_ascii_lowercase();
        let candidate = format!("{}-{}", kind.prefix(), &raw[raw.len() - ID_SUFFIX_LEN..]);
        if !taken(&candidate) {
            return candidate;
        }
    }
}

/// Resolve user input to one id: an exact match wins, otherwise a unique
/// prefix of the full id or of the part after the kind prefix.
pub fn resolve_id<'a, I>(kind: RecordKind, ids: I, input: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{} id cannot be empty",
            kind.label()
        )));
    }
    let needle = trimmed.to_ascii_lowercase();
    let mut prefix = Vec::new();
    for id in ids {
        let lowered = id.to_ascii_lowercase();
        if lowered == needle {
            return Ok(id.to_string());
        }
        let suffix = lowered.split_once('-').map(|(_, rest)| rest).unwrap_or("");
        if lowered.starts_with(&needle) || suffix.starts_with(&needle) {
            prefix.push(id.to_string());
        }
    }

    prefix.sort();
    prefix.dedup();
    match prefix.len() {
        0 => Err(Error::not_found(kind.label(), trimmed)),
        1 => Ok(prefix.remove(0)),
        _ => Err(Error::AmbiguousId(format!(
            "{} '{}' matches {}",
            kind.label(),
            trimmed,
            prefix.join(", ")
        ))),
    }
}

trait Record {
    fn id(&self) -> &str;
}

macro_rules! impl_record {
    ($($ty:ty),+) => {
        $(impl Record for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })+
    };
}

impl_record!(Domain, Client, Project, Task, Template, TemplateTask, InboxItem, View, CustomFieldDef);

fn find<'a, T: Record>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

fn position<T: Record>(items: &[T], kind: RecordKind, id: &str) -> Result<usize> {
    items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| Error::not_found(kind.label(), id))
}

fn take<T: Record>(items: &mut Vec<T>, kind: RecordKind, id: &str) -> Result<T> {
    let index = position(items, kind, id)?;
    Ok(items.remove(index))
}

fn next_sort_order(orders: impl Iterator<Item = i64>) -> i64 {
    orders.map(|order| order + 1).max().unwrap_or(0)
}

fn clear_if(slot: &mut Option<String>, id: &str) {
    if slot.as_deref() == Some(id) {
        *slot = None;
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn default_schema_version() -> String {
    DATA_SCHEMA_VERSION.to_string()
}

/// Every record, as persisted. Tasks and projects are stored without their
/// related records; template tasks are stored apart from their templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub template_tasks: Vec<TemplateTask>,
    #[serde(default)]
    pub inbox: Vec<InboxItem>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDef>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            domains: Vec::new(),
            clients: Vec::new(),
            projects: Vec::new(),
            tasks: Vec::new(),
            templates: Vec::new(),
            template_tasks: Vec::new(),
            inbox: Vec::new(),
            views: Vec::new(),
            custom_fields: Vec::new(),
        }
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: RecordKind, id: &str) -> bool {
        match kind {
            RecordKind::Domain => find(&self.domains, id).is_some(),
            RecordKind::Client => find(&self.clients, id).is_some(),
            RecordKind::Project => find(&self.projects, id).is_some(),
            RecordKind::Task => find(&self.tasks, id).is_some(),
            RecordKind::Template => find(&self.templates, id).is_some(),
            RecordKind::TemplateTask => find(&self.template_tasks, id).is_some(),
            RecordKind::InboxItem => find(&self.inbox, id).is_some(),
            RecordKind::View => find(&self.views, id).is_some(),
            RecordKind::CustomField => find(&self.custom_fields, id).is_some(),
        }
    }

    /// Ids of every record of `kind`, for prefix resolution.
    pub fn ids(&self, kind: RecordKind) -> Vec<String> {
        fn collect<T: Record>(items: &[T]) -> Vec<String> {
            items.iter().map(|item| item.id().to_string()).collect()
        }
        match kind {
            RecordKind::Domain => collect(&self.domains),
            RecordKind::Client => collect(&self.clients),
            RecordKind::Project => collect(&self.projects),
            RecordKind::Task => collect(&self.tasks),
            RecordKind::Template => collect(&self.templates),
            RecordKind::TemplateTask => collect(&self.template_tasks),
            RecordKind::InboxItem => collect(&self.inbox),
            RecordKind::View => collect(&self.views),
            RecordKind::CustomField => collect(&self.custom_fields),
        }
    }

    fn new_id(&self, kind: RecordKind) -> String {
        generate_id(kind, |candidate| self.contains(kind, candidate))
    }

    fn ensure_reference(&self, kind: RecordKind, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if !self.contains(kind, id) => Err(Error::Validation(format!(
                "unknown {} '{}'",
                kind.label(),
                id
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_task_references(&self, task: &Task) -> Result<()> {
        self.ensure_reference(RecordKind::Domain, task.domain_id.as_deref())?;
        self.ensure_reference(RecordKind::Client, task.client_id.as_deref())?;
        self.ensure_reference(RecordKind::Project, task.project_id.as_deref())
    }

    fn hydrate_task(&self, stored: &Task) -> Task {
        let mut task = stored.detached();
        task.domain = task
            .domain_id
            .as_deref()
            .and_then(|id| find(&self.domains, id))
            .cloned();
        task.client = task
            .client_id
            .as_deref()
            .and_then(|id| find(&self.clients, id))
            .cloned();
        task.project = task
            .project_id
            .as_deref()
            .and_then(|id| find(&self.projects, id))
            .map(Project::detached);
        task
    }

    fn hydrate_project(&self, stored: &Project) -> Project {
        let mut project = stored.detached();
        project.client = project
            .client_id
            .as_deref()
            .and_then(|id| find(&self.clients, id))
            .cloned();
        project.domain = project
            .domain_id
            .as_deref()
            .and_then(|id| find(&self.domains, id))
            .cloned();
        project
    }

    fn hydrate_template(&self, stored: &Template) -> Template {
        let mut template = stored.clone();
        template.template_tasks = self
            .template_tasks
            .iter()
            .filter(|task| task.template_id == template.id)
            .cloned()
            .collect();
        template.template_tasks.sort_by_key(|task| task.sort_order);
        template
    }

    // Domains

    pub fn list_domains(&self) -> Vec<Domain> {
        let mut domains = self.domains.clone();
        domains.sort_by_key(|domain| domain.sort_order);
        domains
    }

    pub fn create_domain(&mut self, new: NewDomain) -> Result<Domain> {
        let name = require_name("domain", &new.name)?;
        self.ensure_reference(RecordKind::Domain, new.parent_id.as_deref())?;
        let sort_order = new.sort_order.unwrap_or_else(|| {
            next_sort_order(self.domains.iter().map(|domain| domain.sort_order))
        });
        let domain = Domain {
            id: self.new_id(RecordKind::Domain),
            name,
            parent_id: new.parent_id,
            color: non_empty(new.color),
            sort_order,
            created_at: Utc::now(),
        };
        self.domains.push(domain.clone());
        Ok(domain)
    }

    /// Children become top-level; tasks, projects and template tasks lose
    /// the reference.
    pub fn delete_domain(&mut self, id: &str) -> Result<()> {
        take(&mut self.domains, RecordKind::Domain, id)?;
        for domain in &mut self.domains {
            clear_if(&mut domain.parent_id, id);
        }
        for task in &mut self.tasks {
            clear_if(&mut task.domain_id, id);
        }
        for project in &mut self.projects {
            clear_if(&mut project.domain_id, id);
        }
        for template_task in &mut self.template_tasks {
            clear_if(&mut template_task.domain_id, id);
        }
        Ok(())
    }

    // Clients

    pub fn list_clients(&self) -> Vec<Client> {
        let mut clients = self.clients.clone();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        clients
    }

    pub fn get_client(&self, id: &str) -> Option<Client> {
        find(&self.clients, id).cloned()
    }

    pub fn create_client(&mut self, new: NewClient) -> Result<Client> {
        let name = require_name("client", &new.name)?;
        let client = Client {
            id: self.new_id(RecordKind::Client),
            name,
            status: new.status,
            onboarded_at: None,
            notes: non_empty(new.notes),
            avatar_url: non_empty(new.avatar_url),
            created_at: Utc::now(),
        };
        self.clients.push(client.clone());
        Ok(client)
    }

    pub fn update_client(&mut self, id: &str, patch: &ClientPatch) -> Result<Client> {
        let index = position(&self.clients, RecordKind::Client, id)?;
        let mut client = self.clients[index].clone();
        patch.apply(&mut client)?;
        self.clients[index] = client.clone();
        Ok(client)
    }

    /// Removes the client's projects and every task belonging to the client
    /// or to one of those projects.
    pub fn delete_client(&mut self, id: &str) -> Result<()> {
        take(&mut self.clients, RecordKind::Client, id)?;
        let project_ids: Vec<String> = self
            .projects
            .iter()
            .filter(|project| project.client_id.as_deref() == Some(id))
            .map(|project| project.id.clone())
            .collect();
        self.projects
            .retain(|project| !project_ids.contains(&project.id));

        let (removed, kept): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|task| {
                task.client_id.as_deref() == Some(id)
                    || task
                        .project_id
                        .as_ref()
                        .is_some_and(|project_id| project_ids.contains(project_id))
            });
        self.tasks = kept;
        for task in &removed {
            self.unlink_task(&task.id);
        }
        Ok(())
    }

    // Projects

    pub fn list_projects(&self, client_id: Option<&str>) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|project| match client_id {
                Some(client_id) => project.client_id.as_deref() == Some(client_id),
                None => true,
            })
            .map(|project| self.hydrate_project(project))
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    pub fn get_project(&self, id: &str) -> Option<Project> {
        find(&self.projects, id).map(|project| self.hydrate_project(project))
    }

    pub fn create_project(&mut self, new: NewProject) -> Result<Project> {
        let name = require_name("project", &new.name)?;
        self.ensure_reference(RecordKind::Client, new.client_id.as_deref())?;
        self.ensure_reference(RecordKind::Domain, new.domain_id.as_deref())?;
        let project = Project {
            id: self.new_id(RecordKind::Project),
            name,
            client_id: new.client_id,
            domain_id: new.domain_id,
            status: new.status,
            description: non_empty(new.description),
            created_at: Utc::now(),
            client: None,
            domain: None,
        };
        self.projects.push(project.clone());
        Ok(self.hydrate_project(&project))
    }

    pub fn update_project(&mut self, id: &str, patch: &ProjectPatch) -> Result<Project> {
        let index = position(&self.projects, RecordKind::Project, id)?;
        let mut project = self.projects[index].clone();
        patch.apply(&mut project)?;
        self.ensure_reference(RecordKind::Client, project.client_id.as_deref())?;
        self.ensure_reference(RecordKind::Domain, project.domain_id.as_deref())?;
        self.projects[index] = project.detached();
        Ok(self.hydrate_project(&project))
    }

    pub fn delete_project(&mut self, id: &str) -> Result<()> {
        take(&mut self.projects, RecordKind::Project, id)?;
        for task in &mut self.tasks {
            clear_if(&mut task.project_id, id);
        }
        Ok(())
    }

    // Tasks

    /// Tasks in `scope`, highest priority first. Ties keep insertion order.
    pub fn list_tasks(&self, scope: &ScopeFilter) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|task| scope.matches(task))
            .map(|task| self.hydrate_task(task))
            .collect();
        sort_tasks(&mut tasks, &SortSpec::by_priority());
        tasks
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        find(&self.tasks, id).map(|task| self.hydrate_task(task))
    }

    pub fn create_task(&mut self, new: NewTask) -> Result<Task> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(Error::Validation("task title cannot be empty".to_string()));
        }
        let now = Utc::now();
        let task = Task {
            id: self.new_id(RecordKind::Task),
            title: title.to_string(),
            description: non_empty(new.description),
            project_id: new.project_id,
            client_id: new.client_id,
            domain_id: new.domain_id,
            leverage: new.leverage,
            urgency: new.urgency,
            effort: new.effort,
            status: new.status,
            due_date: new.due_date,
            template_task_id: new.template_task_id,
            created_at: now,
            completed_at: (new.status == TaskStatus::Done).then_some(now),
            custom_fields: new.custom_fields,
            domain: None,
            client: None,
            project: None,
        };
        self.ensure_task_references(&task)?;
        self.ensure_reference(RecordKind::TemplateTask, task.template_task_id.as_deref())?;
        self.tasks.push(task.clone());
        Ok(self.hydrate_task(&task))
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let index = position(&self.tasks, RecordKind::Task, id)?;
        let mut task = self.tasks[index].clone();
        patch.apply(&mut task)?;
        self.ensure_task_references(&task)?;
        let stored = task.detached();
        self.tasks[index] = stored;
        Ok(self.hydrate_task(&task))
    }

    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        take(&mut self.tasks, RecordKind::Task, id)?;
        self.unlink_task(id);
        Ok(())
    }

    fn unlink_task(&mut self, id: &str) {
        for item in &mut self.inbox {
            clear_if(&mut item.linked_task_id, id);
        }
    }

    // Templates

    pub fn list_templates(&self) -> Vec<Template> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .map(|template| self.hydrate_template(template))
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        templates
    }

    pub fn get_template(&self, id: &str) -> Option<Template> {
        find(&self.templates, id).map(|template| self.hydrate_template(template))
    }

    pub fn create_template(&mut self, new: NewTemplate) -> Result<Template> {
        let name = require_name("template", &new.name)?;
        let template = Template {
            id: self.new_id(RecordKind::Template),
            name,
            description: non_empty(new.description),
            created_at: Utc::now(),
            template_tasks: Vec::new(),
        };
        self.templates.push(template.clone());
        Ok(template)
    }

    pub fn update_template(&mut self, id: &str, patch: &TemplatePatch) -> Result<Template> {
        let index = position(&self.templates, RecordKind::Template, id)?;
        let mut template = self.templates[index].clone();
        patch.apply(&mut template)?;
        self.templates[index] = template.clone();
        Ok(self.hydrate_template(&template))
    }

    /// Removes the template's tasks too. Tasks already created from them
    /// keep their back-reference, so onboarding progress is unchanged.
    pub fn delete_template(&mut self, id: &str) -> Result<()> {
        take(&mut self.templates, RecordKind::Template, id)?;
        let removed: Vec<String> = self
            .template_tasks
            .iter()
            .filter(|task| task.template_id == id)
            .map(|task| task.id.clone())
            .collect();
        for template_task_id in removed {
            self.delete_template_task(&template_task_id)?;
        }
        Ok(())
    }

    pub fn create_template_task(&mut self, new: NewTemplateTask) -> Result<TemplateTask> {
        if !self.contains(RecordKind::Template, &new.template_id) {
            return Err(Error::not_found(
                RecordKind::Template.label(),
                new.template_id,
            ));
        }
        let title = new.title.trim();
        if title.is_empty() {
            return Err(Error::Validation(
                "template task title cannot be empty".to_string(),
            ));
        }
        self.ensure_reference(RecordKind::Domain, new.domain_id.as_deref())?;
        let sort_order = new.sort_order.unwrap_or_else(|| {
            next_sort_order(
                self.template_tasks
                    .iter()
                    .filter(|task| task.template_id == new.template_id)
                    .map(|task| task.sort_order),
            )
        });
        let template_task = TemplateTask {
            id: self.new_id(RecordKind::TemplateTask),
            template_id: new.template_id,
            title: title.to_string(),
            description: non_empty(new.description),
            domain_id: new.domain_id,
            default_urgency: new.default_urgency,
            default_leverage: new.default_leverage,
            default_effort: new.default_effort,
            sort_order,
        };
        self.template_tasks.push(template_task.clone());
        Ok(template_task)
    }

    pub fn delete_template_task(&mut self, id: &str) -> Result<()> {
        take(&mut self.template_tasks, RecordKind::TemplateTask, id)?;
        Ok(())
    }

    // Inbox

    pub fn list_inbox(&self, status: Option<InboxStatus>) -> Vec<InboxItem> {
        let mut items: Vec<InboxItem> = self
            .inbox
            .iter()
            .filter(|item| status.map_or(true, |status| item.status == status))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        items
    }

    pub fn create_inbox_item(&mut self, new: NewInboxItem) -> Result<InboxItem> {
        let subject = non_empty(new.subject);
        let content = non_empty(new.content);
        if subject.is_none() && content.is_none() {
            return Err(Error::Validation(
                "inbox item needs a subject or content".to_string(),
            ));
        }
        let now = Utc::now();
        let item = InboxItem {
            id: self.new_id(RecordKind::InboxItem),
            source: new.source,
            sender: non_empty(new.sender),
            subject,
            content,
            received_at: new.received_at.unwrap_or(now),
            status: InboxStatus::Unread,
            linked_task_id: None,
            created_at: now,
        };
        self.inbox.push(item.clone());
        Ok(item)
    }

    pub fn update_inbox_item(&mut self, id: &str, patch: &InboxPatch) -> Result<InboxItem> {
        let index = position(&self.inbox, RecordKind::InboxItem, id)?;
        let mut item = self.inbox[index].clone();
        patch.apply(&mut item);
        self.ensure_reference(RecordKind::Task, item.linked_task_id.as_deref())?;
        self.inbox[index] = item.clone();
        Ok(item)
    }

    pub fn delete_inbox_item(&mut self, id: &str) -> Result<()> {
        take(&mut self.inbox, RecordKind::InboxItem, id)?;
        Ok(())
    }

    // Views

    pub fn list_views(&self) -> Vec<View> {
        let mut views = self.views.clone();
        views.sort_by_key(|view| view.sort_order);
        views
    }

    pub fn get_view(&self, id: &str) -> Option<View> {
        find(&self.views, id).cloned()
    }

    pub fn create_view(&mut self, new: NewView) -> Result<View> {
        let name = validate_view_name(&new.name)?;
        let view = View {
            id: self.new_id(RecordKind::View),
            name,
            description: non_empty(new.description),
            columns: new.columns,
            filters: new.filters,
            sort: new.sort,
            group_by: new.group_by,
            is_default: new.is_default,
            sort_order: next_sort_order(self.views.iter().map(|view| view.sort_order)),
            created_at: Utc::now(),
        };
        if view.is_default {
            self.clear_default_view();
        }
        self.views.push(view.clone());
        Ok(view)
    }

    pub fn update_view(&mut self, id: &str, patch: &ViewPatch) -> Result<View> {
        let index = position(&self.views, RecordKind::View, id)?;
        let mut view = self.views[index].clone();
        patch.apply(&mut view)?;
        if view.is_default && !self.views[index].is_default {
            self.clear_default_view();
        }
        self.views[index] = view.clone();
        Ok(view)
    }

    fn clear_default_view(&mut self) {
        for view in &mut self.views {
            view.is_default = false;
        }
    }

    pub fn delete_view(&mut self, id: &str) -> Result<()> {
        take(&mut self.views, RecordKind::View, id)?;
        Ok(())
    }

    // Custom fields

    pub fn list_custom_fields(&self) -> Vec<CustomFieldDef> {
        let mut fields = self.custom_fields.clone();
        fields.sort_by_key(|field| field.sort_order);
        fields
    }

    pub fn create_custom_field(&mut self, new: NewCustomField) -> Result<CustomFieldDef> {
        let name = require_name("custom field", &new.name)?;
        let field_key = match new.field_key {
            Some(key) => key.trim().to_string(),
            None => field_key_from_name(&name),
        };
        if field_key.is_empty() {
            return Err(Error::Validation(
                "custom field key cannot be empty".to_string(),
            ));
        }
        if is_reserved_key(&field_key) {
            return Err(Error::Validation(format!(
                "custom field key '{field_key}' is a built-in task field"
            )));
        }
        if self
            .custom_fields
            .iter()
            .any(|field| field.field_key == field_key)
        {
            return Err(Error::Validation(format!(
                "custom field key '{field_key}' already exists"
            )));
        }
        let field = CustomFieldDef {
            id: self.new_id(RecordKind::CustomField),
            name,
            field_key,
            field_type: new.field_type,
            options: new.options,
            color: non_empty(new.color),
            sort_order: next_sort_order(self.custom_fields.iter().map(|field| field.sort_order)),
            created_at: Utc::now(),
        };
        self.custom_fields.push(field.clone());
        Ok(field)
    }

    /// Also drops the field's values from every task.
    pub fn delete_custom_field(&mut self, id: &str) -> Result<()> {
        let field = take(&mut self.custom_fields, RecordKind::CustomField, id)?;
        for task in &mut self.tasks {
            task.custom_fields.remove(&field.field_key);
        }
        Ok(())
    }

    pub fn dashboard_stats(&self) -> DashboardStats {
        DashboardStats {
            total_tasks: self.tasks.len(),
            active_tasks: self
                .tasks
                .iter()
                .filter(|task| task.status.is_active())
                .count(),
            done_tasks: self
                .tasks
                .iter()
                .filter(|task| task.status == TaskStatus::Done)
                .count(),
            total_clients: self.clients.len(),
            unread_inbox: self
                .inbox
                .iter()
                .filter(|item| item.status == InboxStatus::Unread)
                .count(),
        }
    }
}

/// Read and write access to a whole [`Dataset`]. Anything implementing it
/// is a [`Backend`].
///
/// A failed `write` closure must leave the stored dataset unchanged.
pub trait DatasetAccess: Send + Sync {
    fn read<T>(&self, f: impl FnOnce(&Dataset) -> Result<T>) -> Result<T>;
    fn write<T>(&self, f: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T>;
}

/// In-process backend; used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<Dataset>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(data: Dataset) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    pub fn snapshot(&self) -> Result<Dataset> {
        self.read(|data| Ok(data.clone()))
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::OperationFailed("dataset mutex poisoned".to_string())
}

impl DatasetAccess for MemoryBackend {
    fn read<T>(&self, f: impl FnOnce(&Dataset) -> Result<T>) -> Result<T> {
        let data = self.data.lock().map_err(poisoned)?;
        f(&data)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T> {
        let mut data = self.data.lock().map_err(poisoned)?;
        let mut draft = data.clone();
        let value = f(&mut draft)?;
        *data = draft;
        Ok(value)
    }
}

/// JSON file backend. Each write reloads the file under the lock so
/// concurrent `pos` processes never lose each other's changes.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms,
        }
    }

    pub fn from_config(root: &Path, config: &Config) -> Self {
        Self::new(config.data_path(root), config.storage.lock_timeout_ms)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create an empty dataset file. Returns false when one already exists.
    pub fn init(&self) -> Result<bool> {
        let _lock = FileLock::acquire(lock_path_for(&self.path), self.lock_timeout_ms)?;
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&Dataset::new())?;
        info!(path = %self.path.display(), "initialized dataset");
        Ok(true)
    }

    fn load(&self) -> Result<Dataset> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "dataset missing, starting empty");
            return Ok(Dataset::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let data: Dataset = serde_json::from_str(&content)?;
        if data.schema_version != DATA_SCHEMA_VERSION {
            warn!(
                found = %data.schema_version,
                expected = DATA_SCHEMA_VERSION,
                "dataset schema version mismatch"
            );
        }
        Ok(data)
    }

    fn save(&self, data: &Dataset) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(data)?;
        lock::write_atomic(&self.path, &bytes)
            .map_err(|e| Error::Backend(format!("{}: {e}", self.path.display())))
    }
}

impl DatasetAccess for FileBackend {
    fn read<T>(&self, f: impl FnOnce(&Dataset) -> Result<T>) -> Result<T> {
        let data = self.load()?;
        f(&data)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T> {
        let _lock = FileLock::acquire(lock_path_for(&self.path), self.lock_timeout_ms)?;
        let mut data = self.load()?;
        let value = f(&mut data)?;
        self.save(&data)?;
        Ok(value)
    }
}

impl<S: DatasetAccess> Backend for S {
    fn list_domains(&self) -> Result<Vec<Domain>> {
        self.read(|data| Ok(data.list_domains()))
    }

    fn create_domain(&self, new: NewDomain) -> Result<Domain> {
        let domain = self.write(|data| data.create_domain(new))?;
        debug!(id = %domain.id, name = %domain.name, "created domain");
        Ok(domain)
    }

    fn delete_domain(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_domain(id))?;
        info!(id, "deleted domain");
        Ok(())
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        self.read(|data| Ok(data.list_clients()))
    }

    fn get_client(&self, id: &str) -> Result<Option<Client>> {
        self.read(|data| Ok(data.get_client(id)))
    }

    fn create_client(&self, new: NewClient) -> Result<Client> {
        let client = self.write(|data| data.create_client(new))?;
        debug!(id = %client.id, name = %client.name, "created client");
        Ok(client)
    }

    fn update_client(&self, id: &str, patch: ClientPatch) -> Result<Client> {
        let client = self.write(|data| data.update_client(id, &patch))?;
        debug!(id, status = %client.status, "updated client");
        Ok(client)
    }

    fn delete_client(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_client(id))?;
        info!(id, "deleted client with its projects and tasks");
        Ok(())
    }

    fn list_projects(&self, client_id: Option<&str>) -> Result<Vec<Project>> {
        self.read(|data| Ok(data.list_projects(client_id)))
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.read(|data| Ok(data.get_project(id)))
    }

    fn create_project(&self, new: NewProject) -> Result<Project> {
        let project = self.write(|data| data.create_project(new))?;
        debug!(id = %project.id, name = %project.name, "created project");
        Ok(project)
    }

    fn update_project(&self, id: &str, patch: ProjectPatch) -> Result<Project> {
        let project = self.write(|data| data.update_project(id, &patch))?;
        debug!(id, "updated project");
        Ok(project)
    }

    fn delete_project(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_project(id))?;
        info!(id, "deleted project");
        Ok(())
    }

    fn list_tasks(&self, scope: &ScopeFilter) -> Result<Vec<Task>> {
        self.read(|data| Ok(data.list_tasks(scope)))
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.read(|data| Ok(data.get_task(id)))
    }

    fn create_task(&self, new: NewTask) -> Result<Task> {
        let task = self.write(|data| data.create_task(new))?;
        debug!(id = %task.id, title = %task.title, "created task");
        Ok(task)
    }

    fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let task = self.write(|data| data.update_task(id, &patch))?;
        debug!(id, status = %task.status, "updated task");
        Ok(task)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_task(id))?;
        info!(id, "deleted task");
        Ok(())
    }

    fn list_templates(&self) -> Result<Vec<Template>> {
        self.read(|data| Ok(data.list_templates()))
    }

    fn get_template(&self, id: &str) -> Result<Option<Template>> {
        self.read(|data| Ok(data.get_template(id)))
    }

    fn create_template(&self, new: NewTemplate) -> Result<Template> {
        let template = self.write(|data| data.create_template(new))?;
        debug!(id = %template.id, name = %template.name, "created template");
        Ok(template)
    }

    fn update_template(&self, id: &str, patch: TemplatePatch) -> Result<Template> {
        let template = self.write(|data| data.update_template(id, &patch))?;
        debug!(id, "updated template");
        Ok(template)
    }

    fn delete_template(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_template(id))?;
        info!(id, "deleted template");
        Ok(())
    }

    fn create_template_task(&self, new: NewTemplateTask) -> Result<TemplateTask> {
        let template_task = self.write(|data| data.create_template_task(new))?;
        debug!(
            id = %template_task.id,
            template_id = %template_task.template_id,
            "created template task"
        );
        Ok(template_task)
    }

    fn delete_template_task(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_template_task(id))?;
        info!(id, "deleted template task");
        Ok(())
    }

    fn list_inbox(&self, status: Option<InboxStatus>) -> Result<Vec<InboxItem>> {
        self.read(|data| Ok(data.list_inbox(status)))
    }

    fn create_inbox_item(&self, new: NewInboxItem) -> Result<InboxItem> {
        let item = self.write(|data| data.create_inbox_item(new))?;
        debug!(id = %item.id, source = %item.source, "created inbox item");
        Ok(item)
    }

    fn update_inbox_item(&self, id: &str, patch: InboxPatch) -> Result<InboxItem> {
        let item = self.write(|data| data.update_inbox_item(id, &patch))?;
        debug!(id, status = %item.status, "updated inbox item");
        Ok(item)
    }

    fn delete_inbox_item(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_inbox_item(id))?;
        info!(id, "deleted inbox item");
        Ok(())
    }

    fn list_views(&self) -> Result<Vec<View>> {
        self.read(|data| Ok(data.list_views()))
    }

    fn get_view(&self, id: &str) -> Result<Option<View>> {
        self.read(|data| Ok(data.get_view(id)))
    }

    fn create_view(&self, new: NewView) -> Result<View> {
        let view = self.write(|data| data.create_view(new))?;
        debug!(id = %view.id, name = %view.name, "created view");
        Ok(view)
    }

    fn update_view(&self, id: &str, patch: ViewPatch) -> Result<View> {
        let view = self.write(|data| data.update_view(id, &patch))?;
        debug!(id, "updated view");
        Ok(view)
    }

    fn delete_view(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_view(id))?;
        info!(id, "deleted view");
        Ok(())
    }

    fn list_custom_fields(&self) -> Result<Vec<CustomFieldDef>> {
        self.read(|data| Ok(data.list_custom_fields()))
    }

    fn create_custom_field(&self, new: NewCustomField) -> Result<CustomFieldDef> {
        let field = self.write(|data| data.create_custom_field(new))?;
        debug!(id = %field.id, key = %field.field_key, "created custom field");
        Ok(field)
    }

    fn delete_custom_field(&self, id: &str) -> Result<()> {
        self.write(|data| data.delete_custom_field(id))?;
        info!(id, "deleted custom field");
        Ok(())
    }

    fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.read(|data| Ok(data.dashboard_stats()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientStatus, Rating};

    fn task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            ..NewTask::default()
        }
    }

    #[test]
    fn ids_use_kind_prefix() {
        let id = generate_id(RecordKind::Task, |_| false);
        assert!(id.starts_with("tsk-"));
        assert_eq!(id.len(), "tsk-".len() + ID_SUFFIX_LEN);
        assert_eq!(id, id.to_ascii_lowercase());
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let ids = ["tsk-abc12345", "tsk-abd99999", "tsk-zzz00000"];
        assert_eq!(
            resolve_id(RecordKind::Task, ids, "zzz").expect("resolve"),
            "tsk-zzz00000"
        );
        assert_eq!(
            resolve_id(RecordKind::Task, ids, "TSK-ABC12345").expect("resolve"),
            "tsk-abc12345"
        );
        match resolve_id(RecordKind::Task, ids, "ab").expect_err("ambiguous") {
            Error::AmbiguousId(message) => assert!(message.contains("tsk-abc12345")),
            other => panic!("unexpected error: {other:?}"),
        }
        match resolve_id(RecordKind::Task, ids, "nope").expect_err("missing") {
            Error::NotFound { kind, .. } => assert_eq!(kind, "task"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tasks_come_back_hydrated_and_by_priority() {
        let backend = MemoryBackend::new();
        let domain = backend
            .create_domain(NewDomain {
                name: "Work".to_string(),
                ..NewDomain::default()
            })
            .expect("domain");
        let low = backend.create_task(task("low")).expect("task");
        let high = backend
            .create_task(NewTask {
                domain_id: Some(domain.id.clone()),
                leverage: Rating::new(5).expect("rating"),
                ..task("high")
            })
            .expect("task");

        let tasks = backend.list_tasks(&ScopeFilter::default()).expect("list");
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![high.id.as_str(), low.id.as_str()]);
        assert_eq!(tasks[0].domain.as_ref().map(|d| d.name.as_str()), Some("Work"));
    }

    #[test]
    fn get_missing_record_is_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get_task("tsk-missing").expect("get").is_none());
        assert!(backend.get_client("cli-missing").expect("get").is_none());
        assert!(backend.get_project("prj-missing").expect("get").is_none());
        assert!(backend.get_template("tpl-missing").expect("get").is_none());
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_task("tsk-missing", TaskPatch::status(TaskStatus::Done))
            .expect_err("missing");
        assert!(matches!(err, Error::NotFound { kind: "task", .. }));
    }

    #[test]
    fn empty_names_block_writes() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.create_task(task("  ")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            backend.create_client(NewClient::default()),
            Err(Error::Validation(_))
        ));
        let snapshot = backend.snapshot().expect("snapshot");
        assert!(snapshot.tasks.is_empty());
        assert!(snapshot.clients.is_empty());
    }

    #[test]
    fn unknown_references_are_rejected() {
        let backend = MemoryBackend::new();
        let err = backend
            .create_task(NewTask {
                client_id: Some("cli-nope".to_string()),
                ..task("orphan")
            })
            .expect_err("unknown client");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn deleting_client_cascades() {
        let backend = MemoryBackend::new();
        let client = backend
            .create_client(NewClient {
                name: "Acme".to_string(),
                ..NewClient::default()
            })
            .expect("client");
        let project = backend
            .create_project(NewProject {
                name: "Site".to_string(),
                client_id: Some(client.id.clone()),
                ..NewProject::default()
            })
            .expect("project");
        backend
            .create_task(NewTask {
                project_id: Some(project.id.clone()),
                ..task("in project")
            })
            .expect("task");
        backend
            .create_task(NewTask {
                client_id: Some(client.id.clone()),
                ..task("for client")
            })
            .expect("task");
        let survivor = backend.create_task(task("unrelated")).expect("task");

        backend.delete_client(&client.id).expect("delete");
        let snapshot = backend.snapshot().expect("snapshot");
        assert!(snapshot.projects.is_empty());
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].id, survivor.id);
    }

    #[test]
    fn deleting_domain_clears_references() {
        let backend = MemoryBackend::new();
        let parent = backend
            .create_domain(NewDomain {
                name: "Work".to_string(),
                ..NewDomain::default()
            })
            .expect("domain");
        let child = backend
            .create_domain(NewDomain {
                name: "Sales".to_string(),
                parent_id: Some(parent.id.clone()),
                ..NewDomain::default()
            })
            .expect("domain");
        let created = backend
            .create_task(NewTask {
                domain_id: Some(parent.id.clone()),
                ..task("tagged")
            })
            .expect("task");

        backend.delete_domain(&parent.id).expect("delete");
        let task = backend.get_task(&created.id).expect("get").expect("task");
        assert!(task.domain_id.is_none());
        assert!(task.domain.is_none());
        let domains = backend.list_domains().expect("list");
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].id, child.id);
        assert!(domains[0].parent_id.is_none());
    }

    #[test]
    fn only_one_default_view() {
        let backend = MemoryBackend::new();
        let first = backend
            .create_view(NewView {
                name: "Mine".to_string(),
                is_default: true,
                ..NewView::default()
            })
            .expect("view");
        let second = backend
            .create_view(NewView {
                name: "Theirs".to_string(),
                is_default: true,
                ..NewView::default()
            })
            .expect("view");
        let views = backend.list_views().expect("list");
        assert!(!views.iter().any(|v| v.id == first.id && v.is_default));
        assert!(views.iter().any(|v| v.id == second.id && v.is_default));
    }

    #[test]
    fn custom_field_keys_are_unique_and_not_builtin() {
        let backend = MemoryBackend::new();
        let field = backend
            .create_custom_field(NewCustomField {
                name: "Contract Value".to_string(),
                ..NewCustomField::default()
            })
            .expect("field");
        assert_eq!(field.field_key, "contract_value");
        assert!(backend
            .create_custom_field(NewCustomField {
                name: "Contract value".to_string(),
                ..NewCustomField::default()
            })
            .is_err());
        assert!(backend
            .create_custom_field(NewCustomField {
                name: "Status".to_string(),
                ..NewCustomField::default()
            })
            .is_err());
    }

    #[test]
    fn stats_count_by_status() {
        let backend = MemoryBackend::new();
        backend.create_task(task("a")).expect("task");
        backend
            .create_task(NewTask {
                status: TaskStatus::Done,
                ..task("b")
            })
            .expect("task");
        backend
            .create_task(NewTask {
                status: TaskStatus::Archived,
                ..task("c")
            })
            .expect("task");
        backend
            .create_client(NewClient {
                name: "Acme".to_string(),
                status: ClientStatus::Active,
                ..NewClient::default()
            })
            .expect("client");
        backend
            .create_inbox_item(NewInboxItem {
                subject: Some("hello".to_string()),
                ..NewInboxItem::default()
            })
            .expect("inbox");

        let stats = backend.dashboard_stats().expect("stats");
        assert_eq!(
            stats,
            DashboardStats {
                total_tasks: 3,
                active_tasks: 1,
                done_tasks: 1,
                total_clients: 1,
                unread_inbox: 1,
            }
        );
    }

    #[test]
    fn file_backend_persists_between_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".pos").join("data.json");
        let backend = FileBackend::new(&path, 1000);
        assert!(backend.init().expect("init"));
        assert!(!backend.init().expect("init again"));

        let created = backend.create_task(task("persisted")).expect("task");
        let reopened = FileBackend::new(&path, 1000);
        let fetched = reopened.get_task(&created.id).expect("get").expect("task");
        assert_eq!(fetched.title, "persisted");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(!raw.contains("priority_score"));
    }

    #[test]
    fn failed_write_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        let backend = FileBackend::new(&path, 1000);
        backend.create_task(task("keep")).expect("task");
        let before = std::fs::read_to_string(&path).expect("read");

        let err = backend
            .update_task("tsk-missing", TaskPatch::status(TaskStatus::Done))
            .expect_err("missing");
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), before);
    }
}
