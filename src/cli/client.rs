//! pos client command implementations.

use serde::Serialize;

use crate::backend::{Backend, ClientPatch, NewClient};
use crate::error::{Error, Result};
use crate::filter::ScopeFilter;
use crate::model::{Client, ClientStatus, Project, TaskView};
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordKind;
use crate::template::{progress, OnboardingProgress};

use super::{confirm, non_empty, Context, GlobalArgs};

pub struct AddOptions {
    pub name: String,
    pub status: String,
    pub notes: Option<String>,
    pub global: GlobalArgs,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct ClientListOutput {
    total: usize,
    clients: Vec<Client>,
}

#[derive(Serialize)]
struct OnboardingOutput {
    #[serde(flatten)]
    progress: OnboardingProgress,
    percent: u32,
}

#[derive(Serialize)]
struct ClientShowOutput<'a> {
    client: &'a Client,
    projects: &'a [Project],
    tasks: Vec<TaskView<'a>>,
    onboarding: OnboardingOutput,
}

#[derive(Serialize)]
struct ClientDeleteOutput {
    deleted: String,
}

fn describe_client(human: &mut HumanOutput, client: &Client) {
    human.push_summary("ID", client.id.clone());
    human.push_summary("Name", client.name.clone());
    human.push_summary("Status", client.status.to_string());
    if let Some(onboarded_at) = client.onboarded_at {
        human.push_summary("Onboarding started", onboarded_at.format("%Y-%m-%d").to_string());
    }
    if let Some(notes) = &client.notes {
        human.push_summary("Notes", notes.clone());
    }
}

pub fn run_list(global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let clients = ctx.backend.list_clients()?;

    let mut human = HumanOutput::new("Clients");
    if clients.is_empty() {
        human.push_body("No clients yet.");
    }
    for client in &clients {
        human.push_body(format!("{}  {}  [{}]", client.id, client.name, client.status));
    }
    human.push_summary("Total", clients.len().to_string());

    let output = ClientListOutput {
        total: clients.len(),
        clients,
    };
    emit_success(ctx.output, "client list", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let client = ctx.backend.create_client(NewClient {
        name: options.name,
        status: options.status.parse()?,
        notes: non_empty(options.notes),
        avatar_url: None,
    })?;

    let mut human = HumanOutput::new("Client created");
    describe_client(&mut human, &client);
    human.push_next_step(format!("pos template apply <template> {}", client.id));
    emit_success(ctx.output, "client add", &client, Some(&human))
}

pub fn run_show(id: String, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Client, &id)?;
    let client = ctx
        .backend
        .get_client(&id)?
        .ok_or_else(|| Error::not_found("client", &id))?;
    let projects = ctx.backend.list_projects(Some(id.as_str()))?;
    let tasks = ctx.backend.list_tasks(&ScopeFilter::client(&id))?;
    let onboarding = progress(&tasks);

    let mut human = HumanOutput::new(format!("Client {}", client.name));
    describe_client(&mut human, &client);
    human.push_summary("Projects", projects.len().to_string());
    human.push_summary("Tasks", tasks.len().to_string());
    if onboarding.total > 0 || client.status == ClientStatus::Onboarding {
        human.push_summary(
            "Onboarding",
            format!(
                "{}/{} ({}%)",
                onboarding.completed,
                onboarding.total,
                onboarding.percent()
            ),
        );
    }
    for project in &projects {
        human.push_detail(format!("project {}  {}", project.id, project.name));
    }

    let output = ClientShowOutput {
        client: &client,
        projects: &projects,
        tasks: tasks.iter().map(TaskView::from).collect(),
        onboarding: OnboardingOutput {
            progress: onboarding,
            percent: onboarding.percent(),
        },
    };
    emit_success(ctx.output, "client show", &output, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Client, &options.id)?;
    let patch = ClientPatch {
        name: options.name,
        status: options.status.as_deref().map(str::parse::<ClientStatus>).transpose()?,
        notes: options.notes.map(|notes| non_empty(Some(notes))),
        ..ClientPatch::default()
    };
    if patch == ClientPatch::default() {
        return Err(Error::InvalidArgument(
            "nothing to change (pass --name, --status or --notes)".to_string(),
        ));
    }
    let client = ctx.backend.update_client(&id, patch)?;

    let mut human = HumanOutput::new("Client updated");
    describe_client(&mut human, &client);
    emit_success(ctx.output, "client edit", &client, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Client, &id)?;
    confirm(yes, format!("delete client {id} with its projects and tasks"))?;
    ctx.backend.delete_client(&id)?;

    let mut human = HumanOutput::new("Client deleted");
    human.push_summary("ID", id.clone());
    emit_success(
        ctx.output,
        "client delete",
        &ClientDeleteOutput { deleted: id },
        Some(&human),
    )
}
