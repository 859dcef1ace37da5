//! pos task command implementations.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::actions;
use crate::backend::{Backend, NewTask};
use crate::error::{Error, Result};
use crate::filter::{FilterClause, ScopeFilter, Selection, UiFilters};
use crate::model::{Rating, Task, TaskStatus, TaskView};
use crate::output::{emit_success, format_table, HumanOutput};
use crate::priority::{format_score, matrix_points, MatrixPoint, Quadrant};
use crate::render::{RenderContext, RendererRegistry};
use crate::sort::SortSpec;
use crate::store::RecordKind;
use crate::view::{query_for_view, resolve_columns, ViewSelection};

use super::view::resolve_view;
use super::{confirm, non_empty, Context, GlobalArgs};

pub struct ListOptions {
    pub view: Option<String>,
    pub no_view: bool,
    pub status: String,
    pub domain: String,
    pub client: Option<String>,
    pub project: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub filters: Vec<String>,
    pub global: GlobalArgs,
}

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub client: Option<String>,
    pub project: Option<String>,
    pub domain: Option<String>,
    pub leverage: i64,
    pub urgency: i64,
    pub effort: i64,
    pub status: String,
    pub due: Option<String>,
    pub global: GlobalArgs,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalArgs,
}

pub struct EditOptions {
    pub id: String,
    pub field: String,
    pub value: String,
    pub global: GlobalArgs,
}

pub struct UpdateOptions {
    pub id: String,
    pub patch: String,
    pub global: GlobalArgs,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub global: GlobalArgs,
}

pub struct DeleteOptions {
    pub id: String,
    pub yes: bool,
    pub global: GlobalArgs,
}

pub struct BulkStatusOptions {
    pub status: String,
    pub ids: Vec<String>,
    pub global: GlobalArgs,
}

pub struct BulkDeleteOptions {
    pub ids: Vec<String>,
    pub yes: bool,
    pub global: GlobalArgs,
}

pub struct MatrixOptions {
    pub domain: Option<String>,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a SortSpec>,
    total: usize,
    tasks: Vec<TaskView<'a>>,
}

#[derive(Serialize)]
struct TaskDeleteOutput {
    deleted: Vec<String>,
}

#[derive(Serialize)]
struct MatrixOutput {
    total: usize,
    points: Vec<MatrixPoint>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_status_selection(input: &str) -> Result<Selection<TaskStatus>> {
    match input.trim() {
        "" | "all" => Ok(Selection::All),
        other => Ok(Selection::Only(other.parse()?)),
    }
}

fn parse_due(input: Option<&str>) -> Result<Option<NaiveDate>> {
    match input.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                Error::InvalidArgument(format!("invalid due date '{value}' (expected YYYY-MM-DD)"))
            }),
    }
}

pub(super) fn summarize_task(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary(
        "Ratings",
        format!(
            "leverage {} / urgency {} / effort {}",
            task.leverage, task.urgency, task.effort
        ),
    );
    human.push_summary("Score", format_score(task.priority_score()));
    if let Some(domain) = &task.domain {
        human.push_summary("Domain", domain.name.clone());
    }
    if let Some(client) = &task.client {
        human.push_summary("Client", client.name.clone());
    }
    if let Some(project) = &task.project {
        human.push_summary("Project", project.name.clone());
    }
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.to_string());
    }
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let views = ctx.backend.list_views()?;
    let mut selection = if options.no_view {
        ViewSelection::default()
    } else {
        ViewSelection::initial(&views)
    };
    if let Some(input) = options.view.as_deref() {
        let id = resolve_view(&views, input)?;
        selection.select(&views, &id)?;
    }
    let active = selection.active(&views);

    let scope = ScopeFilter {
        client_id: ctx.resolve_opt(RecordKind::Client, options.client.as_deref())?,
        project_id: ctx.resolve_opt(RecordKind::Project, options.project.as_deref())?,
        ..ScopeFilter::default()
    };
    let domain = match options.domain.trim() {
        "" | "all" => Selection::All,
        input => Selection::Only(ctx.resolve(RecordKind::Domain, input)?),
    };
    let ui = UiFilters {
        status: parse_status_selection(&options.status)?,
        domain,
    };
    let extra = options
        .filters
        .iter()
        .map(|input| FilterClause::parse(input))
        .collect::<Result<Vec<_>>>()?;

    let mut query = query_for_view(active, &ctx.config.default_sort()?)
        .with_scope(scope.clone())
        .with_view_filters(extra)
        .with_ui(ui);
    if let Some(search) = options.search {
        query = query.with_search(search);
    }
    if let Some(sort) = options.sort.as_deref() {
        query = query.with_sort(Some(SortSpec::parse(sort)?));
    }

    let tasks = ctx.backend.list_tasks(&scope)?;
    let visible = query.apply(&tasks);

    let custom_fields = ctx.backend.list_custom_fields()?;
    let columns = resolve_columns(active);
    let registry = RendererRegistry::standard();
    let render_ctx = RenderContext::new(today(), &custom_fields);

    let headers: Vec<String> = std::iter::once("ID".to_string())
        .chain(columns.iter().map(|column| column.label.clone()))
        .collect();
    let rows: Vec<Vec<String>> = visible
        .iter()
        .map(|task| {
            std::iter::once(task.id.clone())
                .chain(registry.render_row(task, &columns, &render_ctx))
                .collect()
        })
        .collect();

    let header = match active {
        Some(view) => format!("Tasks ({})", view.name),
        None => "Tasks".to_string(),
    };
    let mut human = HumanOutput::new(header);
    if rows.is_empty() {
        human.push_body("No tasks match.");
    } else {
        for line in format_table(&headers, &rows) {
            human.push_body(line);
        }
    }
    human.push_summary("Shown", visible.len().to_string());
    human.push_summary("Total", tasks.len().to_string());
    if let Some(sort) = &query.sort {
        human.push_summary("Sort", format!("{} {}", sort.field, sort.direction.as_str()));
    }

    let output = TaskListOutput {
        view: active.map(|view| view.id.as_str()),
        sort: query.sort.as_ref(),
        total: visible.len(),
        tasks: visible.iter().map(|task| TaskView::from(*task)).collect(),
    };
    emit_success(ctx.output, "task list", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let new = NewTask {
        title: options.title,
        description: non_empty(options.description),
        client_id: ctx.resolve_opt(RecordKind::Client, options.client.as_deref())?,
        project_id: ctx.resolve_opt(RecordKind::Project, options.project.as_deref())?,
        domain_id: ctx.resolve_opt(RecordKind::Domain, options.domain.as_deref())?,
        leverage: Rating::new(options.leverage)?,
        urgency: Rating::new(options.urgency)?,
        effort: Rating::new(options.effort)?,
        status: options.status.parse()?,
        due_date: parse_due(options.due.as_deref())?,
        ..NewTask::default()
    };
    let task = ctx.backend.create_task(new)?;

    let mut human = HumanOutput::new("Task created");
    summarize_task(&mut human, &task);
    emit_success(ctx.output, "task add", &TaskView::from(&task), Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Task, &options.id)?;
    let task = ctx
        .backend
        .get_task(&id)?
        .ok_or_else(|| Error::not_found("task", &id))?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    summarize_task(&mut human, &task);
    if let Some(description) = &task.description {
        human.push_detail(description.clone());
    }
    for (key, value) in &task.custom_fields {
        human.push_detail(format!("{key}: {value}"));
    }
    emit_success(ctx.output, "task show", &TaskView::from(&task), Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Task, &options.id)?;
    let task = actions::inline_edit(&ctx.backend, &id, options.field.trim(), &options.value)?;

    let mut human = HumanOutput::new("Task updated");
    summarize_task(&mut human, &task);
    emit_success(ctx.output, "task edit", &TaskView::from(&task), Some(&human))
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Task, &options.id)?;
    let raw = if options.patch == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        options.patch
    };
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidArgument(format!("task patch is not valid JSON: {e}")))?;
    let task = actions::update_task_json(&ctx.backend, &id, value)?;

    let mut human = HumanOutput::new("Task updated");
    summarize_task(&mut human, &task);
    emit_success(ctx.output, "task update", &TaskView::from(&task), Some(&human))
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Task, &options.id)?;
    let status: TaskStatus = options.status.parse()?;
    let task = actions::set_status(&ctx.backend, &id, status)?;

    let mut human = HumanOutput::new("Task status changed");
    summarize_task(&mut human, &task);
    emit_success(ctx.output, "task status", &TaskView::from(&task), Some(&human))
}

pub fn run_toggle(options: ShowOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Task, &options.id)?;
    let task = actions::toggle_status(&ctx.backend, &id)?;

    let mut human = HumanOutput::new(format!("Task marked {}", task.status));
    summarize_task(&mut human, &task);
    emit_success(ctx.output, "task toggle", &TaskView::from(&task), Some(&human))
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let id = ctx.resolve(RecordKind::Task, &options.id)?;
    confirm(options.yes, format!("delete task {id}"))?;
    ctx.backend.delete_task(&id)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.clone());
    emit_success(
        ctx.output,
        "task delete",
        &TaskDeleteOutput { deleted: vec![id] },
        Some(&human),
    )
}

fn resolve_all(ctx: &Context, inputs: &[String]) -> Result<Vec<String>> {
    inputs
        .iter()
        .map(|input| ctx.resolve(RecordKind::Task, input))
        .collect()
}

pub fn run_bulk_status(options: BulkStatusOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let status: TaskStatus = options.status.parse()?;
    let ids = resolve_all(&ctx, &options.ids)?;
    let tasks = actions::bulk_set_status(&ctx.backend, &ids, status).into_result()?;

    let mut human = HumanOutput::new(format!("{} task(s) set to {status}", tasks.len()));
    for task in &tasks {
        human.push_detail(format!("{} {}", task.id, task.title));
    }
    let views: Vec<TaskView<'_>> = tasks.iter().map(TaskView::from).collect();
    emit_success(ctx.output, "task bulk-status", &views, Some(&human))
}

pub fn run_bulk_delete(options: BulkDeleteOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let ids = resolve_all(&ctx, &options.ids)?;
    confirm(options.yes, format!("delete {} task(s)", ids.len()))?;
    let deleted = actions::bulk_delete(&ctx.backend, &ids).into_result()?;

    let mut human = HumanOutput::new(format!("{} task(s) deleted", deleted.len()));
    for id in &deleted {
        human.push_detail(id.clone());
    }
    emit_success(
        ctx.output,
        "task bulk-delete",
        &TaskDeleteOutput { deleted },
        Some(&human),
    )
}

pub fn run_matrix(options: MatrixOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let domain_id = ctx.resolve_opt(RecordKind::Domain, options.domain.as_deref())?;
    let tasks = ctx.backend.list_tasks(&ScopeFilter::default())?;
    let points = matrix_points(
        &tasks,
        domain_id.as_deref(),
        ctx.config.quadrant_thresholds()?,
    );

    let mut human = HumanOutput::new("Leverage / effort matrix");
    for quadrant in [
        Quadrant::QuickWin,
        Quadrant::BigProject,
        Quadrant::FillIn,
        Quadrant::Avoid,
    ] {
        let members: Vec<&MatrixPoint> = points
            .iter()
            .filter(|point| point.quadrant == quadrant)
            .collect();
        human.push_body(format!("{} ({})", quadrant.label(), members.len()));
        for point in members {
            human.push_body(format!(
                "  {}  {}  L{} E{}  {}",
                point.id,
                format_score(point.priority_score),
                point.leverage,
                point.effort,
                point.title
            ));
        }
    }
    human.push_summary("Open tasks", points.len().to_string());

    let output = MatrixOutput {
        total: points.len(),
        points,
    };
    emit_success(ctx.output, "task matrix", &output, Some(&human))
}
