//! pos view command implementations.

use std::collections::HashMap;

use serde::Serialize;

use crate::backend::{Backend, NewView};
use crate::error::{Error, Result};
use crate::filter::FilterClause;
use crate::output::{emit_success, HumanOutput};
use crate::sort::SortSpec;
use crate::store::{resolve_id, RecordKind};
use crate::view::{
    built_in_columns, columns_with_overrides, resolve_columns, validate_view_name, View,
    ViewColumn, ViewSelection,
};

use super::{confirm, non_empty, Context, GlobalArgs};

pub struct CreateOptions {
    pub name: String,
    pub description: Option<String>,
    pub filters: Vec<String>,
    pub sort: Option<String>,
    pub show: Vec<String>,
    pub hide: Vec<String>,
    pub custom: Vec<String>,
    pub default: bool,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct ViewListOutput {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<String>,
    views: Vec<View>,
}

#[derive(Serialize)]
struct ViewDeleteOutput {
    deleted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<String>,
}

/// A view by exact name (case-insensitive), else by id or id prefix.
pub(super) fn resolve_view(views: &[View], input: &str) -> Result<String> {
    let trimmed = input.trim();
    if let Some(view) = views
        .iter()
        .find(|view| view.name.eq_ignore_ascii_case(trimmed))
    {
        return Ok(view.id.clone());
    }
    resolve_id(
        RecordKind::View,
        views.iter().map(|view| view.id.as_str()),
        trimmed,
    )
}

fn describe_view(human: &mut HumanOutput, view: &View) {
    human.push_summary("ID", view.id.clone());
    human.push_summary("Name", view.name.clone());
    if let Some(description) = &view.description {
        human.push_summary("Description", description.clone());
    }
    if view.is_default {
        human.push_summary("Default", "yes");
    }
    let columns: Vec<String> = resolve_columns(Some(view))
        .into_iter()
        .map(|column| column.key)
        .collect();
    human.push_summary("Columns", columns.join(", "));
    match &view.sort {
        Some(sort) => human.push_summary("Sort", format!("{} {}", sort.field, sort.direction.as_str())),
        None => human.push_summary("Sort", "default"),
    }
    for clause in &view.filters {
        human.push_detail(format!("{} {} {}", clause.field, clause.operator, clause.value));
    }
}

pub fn run_list(global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let views = ctx.backend.list_views()?;
    let selection = ViewSelection::initial(&views);

    let mut human = HumanOutput::new("Views");
    if views.is_empty() {
        human.push_body("No saved views; task list uses the built-in columns.");
    }
    for view in &views {
        let marker = if selection.active_id() == Some(view.id.as_str()) {
            "*"
        } else {
            " "
        };
        human.push_body(format!(
            "{marker} {}  {}  ({} filter(s))",
            view.id,
            view.name,
            view.filters.len()
        ));
    }
    human.push_summary("Total", views.len().to_string());

    let output = ViewListOutput {
        total: views.len(),
        active: selection.active_id().map(str::to_string),
        views,
    };
    emit_success(ctx.output, "view list", &output, Some(&human))
}

pub fn run_show(id: String, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let views = ctx.backend.list_views()?;
    let id = resolve_view(&views, &id)?;
    let view = ctx
        .backend
        .get_view(&id)?
        .ok_or_else(|| Error::not_found("view", &id))?;

    let mut human = HumanOutput::new(format!("View {}", view.name));
    describe_view(&mut human, &view);
    emit_success(ctx.output, "view show", &view, Some(&human))
}

fn build_columns(ctx: &Context, options: &CreateOptions) -> Result<Vec<ViewColumn>> {
    if options.show.is_empty() && options.hide.is_empty() && options.custom.is_empty() {
        return Ok(Vec::new());
    }
    let known: Vec<String> = built_in_columns().into_iter().map(|c| c.key).collect();
    let mut overrides = HashMap::new();
    for (keys, visible) in [(&options.show, true), (&options.hide, false)] {
        for key in keys {
            let key = key.trim();
            if !known.iter().any(|known| known == key) {
                return Err(Error::InvalidArgument(format!(
                    "unknown column '{key}' (expected one of {})",
                    known.join(", ")
                )));
            }
            overrides.insert(key.to_string(), visible);
        }
    }
    let mut columns = columns_with_overrides(&overrides);

    if !options.custom.is_empty() {
        let defs = ctx.backend.list_custom_fields()?;
        for key in &options.custom {
            let def = defs
                .iter()
                .find(|def| def.field_key == key.trim())
                .ok_or_else(|| Error::not_found("custom field", key.trim()))?;
            columns.push(ViewColumn::custom(def.field_key.clone(), def.name.clone()));
        }
    }
    Ok(columns)
}

pub fn run_create(options: CreateOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let name = validate_view_name(&options.name)?;
    let filters = options
        .filters
        .iter()
        .map(|input| FilterClause::parse(input))
        .collect::<Result<Vec<_>>>()?;
    let sort = options.sort.as_deref().map(SortSpec::parse).transpose()?;
    let columns = build_columns(&ctx, &options)?;

    let view = ctx.backend.create_view(NewView {
        name,
        description: non_empty(options.description.clone()),
        columns,
        filters,
        sort,
        group_by: None,
        is_default: options.default,
    })?;

    let mut human = HumanOutput::new("View created");
    describe_view(&mut human, &view);
    human.push_next_step(format!("pos task list --view {}", view.id));
    emit_success(ctx.output, "view create", &view, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let views = ctx.backend.list_views()?;
    let id = resolve_view(&views, &id)?;
    confirm(yes, format!("delete view {id}"))?;

    let mut selection = ViewSelection::initial(&views);
    ctx.backend.delete_view(&id)?;
    let remaining = ctx.backend.list_views()?;
    selection.after_delete(&id, &remaining);

    let mut human = HumanOutput::new("View deleted");
    human.push_summary("ID", id.clone());
    match selection.active(&remaining) {
        Some(view) => human.push_summary("Now showing", view.name.clone()),
        None => human.push_summary("Now showing", "built-in columns"),
    }

    let output = ViewDeleteOutput {
        deleted: id,
        active: selection.active_id().map(str::to_string),
    };
    emit_success(ctx.output, "view delete", &output, Some(&human))
}
