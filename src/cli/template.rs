//! pos template command implementations.

use serde::Serialize;

use crate::backend::{Backend, NewTemplate, NewTemplateTask};
use crate::error::{Error, Result};
use crate::model::{Rating, Template, TemplateTask, TaskView};
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordKind;
use crate::template::{apply_template, client_progress};

use super::{confirm, non_empty, Context, GlobalArgs};

pub struct AddTaskOptions {
    pub template: String,
    pub title: String,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub leverage: i64,
    pub urgency: i64,
    pub effort: i64,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct TemplateListOutput {
    total: usize,
    templates: Vec<Template>,
}

#[derive(Serialize)]
struct TemplateApplyOutput<'a> {
    template_id: String,
    client_id: String,
    created: Vec<TaskView<'a>>,
    percent: u32,
}

#[derive(Serialize)]
struct TemplateDeleteOutput {
    deleted: String,
}

fn describe_template(human: &mut HumanOutput, template: &Template) {
    human.push_summary("ID", template.id.clone());
    human.push_summary("Name", template.name.clone());
    if let Some(description) = &template.description {
        human.push_summary("Description", description.clone());
    }
    human.push_summary("Tasks", template.template_tasks.len().to_string());
    for task in &template.template_tasks {
        human.push_body(format!(
            "{}. {}  (L{} U{} E{})  {}",
            task.sort_order + 1,
            task.title,
            task.default_leverage,
            task.default_urgency,
            task.default_effort,
            task.id
        ));
    }
}

pub fn run_list(global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let templates = ctx.backend.list_templates()?;

    let mut human = HumanOutput::new("Templates");
    if templates.is_empty() {
        human.push_body("No templates.");
    }
    for template in &templates {
        human.push_body(format!(
            "{}  {}  ({} task(s))",
            template.id,
            template.name,
            template.template_tasks.len()
        ));
    }
    human.push_summary("Total", templates.len().to_string());

    let output = TemplateListOutput {
        total: templates.len(),
        templates,
    };
    emit_success(ctx.output, "template list", &output, Some(&human))
}

pub fn run_add(name: String, description: Option<String>, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let template = ctx.backend.create_template(NewTemplate {
        name,
        description: non_empty(description),
    })?;

    let mut human = HumanOutput::new("Template created");
    describe_template(&mut human, &template);
    human.push_next_step(format!("pos template add-task {} \"<title>\"", template.id));
    emit_success(ctx.output, "template add", &template, Some(&human))
}

pub fn run_show(id: String, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Template, &id)?;
    let template = ctx
        .backend
        .get_template(&id)?
        .ok_or_else(|| Error::not_found("template", &id))?;

    let mut human = HumanOutput::new(format!("Template {}", template.name));
    describe_template(&mut human, &template);
    emit_success(ctx.output, "template show", &template, Some(&human))
}

pub fn run_add_task(options: AddTaskOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let template_id = ctx.resolve(RecordKind::Template, &options.template)?;
    let task: TemplateTask = ctx.backend.create_template_task(NewTemplateTask {
        template_id,
        title: options.title,
        description: non_empty(options.description),
        domain_id: ctx.resolve_opt(RecordKind::Domain, options.domain.as_deref())?,
        default_leverage: Rating::new(options.leverage)?,
        default_urgency: Rating::new(options.urgency)?,
        default_effort: Rating::new(options.effort)?,
        sort_order: None,
    })?;

    let mut human = HumanOutput::new("Template task added");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Position", (task.sort_order + 1).to_string());
    emit_success(ctx.output, "template add-task", &task, Some(&human))
}

pub fn run_apply(template: String, client: String, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let template_id = ctx.resolve(RecordKind::Template, &template)?;
    let client_id = ctx.resolve(RecordKind::Client, &client)?;
    let created = apply_template(&ctx.backend, &template_id, &client_id)?;
    let percent = client_progress(&ctx.backend, &client_id)?.percent();

    let mut human = HumanOutput::new("Template applied");
    human.push_summary("Template", template_id.clone());
    human.push_summary("Client", client_id.clone());
    human.push_summary("Tasks created", created.len().to_string());
    human.push_summary("Onboarding", format!("{percent}%"));
    for task in &created {
        human.push_detail(format!("{}  {}", task.id, task.title));
    }
    if created.is_empty() {
        human.push_warning("template has no tasks; nothing was created");
    }

    let output = TemplateApplyOutput {
        template_id,
        client_id,
        created: created.iter().map(TaskView::from).collect(),
        percent,
    };
    emit_success(ctx.output, "template apply", &output, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Template, &id)?;
    confirm(yes, format!("delete template {id}"))?;
    ctx.backend.delete_template(&id)?;

    let mut human = HumanOutput::new("Template deleted");
    human.push_summary("ID", id.clone());
    emit_success(
        ctx.output,
        "template delete",
        &TemplateDeleteOutput { deleted: id },
        Some(&human),
    )
}
