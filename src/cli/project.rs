//! pos project command implementations.

use serde::Serialize;

use crate::backend::{Backend, NewProject};
use crate::error::{Error, Result};
use crate::filter::ScopeFilter;
use crate::model::{Project, TaskView};
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordKind;

use super::{confirm, non_empty, Context, GlobalArgs};

pub struct AddOptions {
    pub name: String,
    pub client: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<Project>,
}

#[derive(Serialize)]
struct ProjectShowOutput<'a> {
    project: &'a Project,
    tasks: Vec<TaskView<'a>>,
}

#[derive(Serialize)]
struct ProjectDeleteOutput {
    deleted: String,
}

fn describe_project(human: &mut HumanOutput, project: &Project) {
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    human.push_summary("Status", project.status.to_string());
    if let Some(client) = &project.client {
        human.push_summary("Client", client.name.clone());
    }
    if let Some(domain) = &project.domain {
        human.push_summary("Domain", domain.name.clone());
    }
    if let Some(description) = &project.description {
        human.push_summary("Description", description.clone());
    }
}

pub fn run_list(client: Option<String>, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let client_id = ctx.resolve_opt(RecordKind::Client, client.as_deref())?;
    let projects = ctx.backend.list_projects(client_id.as_deref())?;

    let mut human = HumanOutput::new("Projects");
    if projects.is_empty() {
        human.push_body("No projects.");
    }
    for project in &projects {
        let client = project
            .client
            .as_ref()
            .map(|client| format!("  ({})", client.name))
            .unwrap_or_default();
        human.push_body(format!("{}  {}{client}", project.id, project.name));
    }
    human.push_summary("Total", projects.len().to_string());

    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };
    emit_success(ctx.output, "project list", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let project = ctx.backend.create_project(NewProject {
        name: options.name,
        client_id: ctx.resolve_opt(RecordKind::Client, options.client.as_deref())?,
        domain_id: ctx.resolve_opt(RecordKind::Domain, options.domain.as_deref())?,
        description: non_empty(options.description),
        ..NewProject::default()
    })?;

    let mut human = HumanOutput::new("Project created");
    describe_project(&mut human, &project);
    emit_success(ctx.output, "project add", &project, Some(&human))
}

pub fn run_show(id: String, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Project, &id)?;
    let project = ctx
        .backend
        .get_project(&id)?
        .ok_or_else(|| Error::not_found("project", &id))?;
    let tasks = ctx.backend.list_tasks(&ScopeFilter::project(&id))?;

    let mut human = HumanOutput::new(format!("Project {}", project.name));
    describe_project(&mut human, &project);
    human.push_summary("Tasks", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(format!("{}  [{}]  {}", task.id, task.status, task.title));
    }

    let output = ProjectShowOutput {
        project: &project,
        tasks: tasks.iter().map(TaskView::from).collect(),
    };
    emit_success(ctx.output, "project show", &output, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Project, &id)?;
    confirm(yes, format!("delete project {id}"))?;
    ctx.backend.delete_project(&id)?;

    let mut human = HumanOutput::new("Project deleted");
    human.push_summary("ID", id.clone());
    human.push_detail("its tasks were kept and detached from the project");
    emit_success(
        ctx.output,
        "project delete",
        &ProjectDeleteOutput { deleted: id },
        Some(&human),
    )
}
