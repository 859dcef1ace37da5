//! Cell rendering for task tables.
//!
//! Each column kind has a registered [`CellRenderer`]. Built-in columns are
//! keyed by column key; custom columns are keyed by the custom field's type.
//! Adding a column kind means registering a renderer, not editing a match.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{CustomFieldDef, CustomFieldType, Task};
use crate::priority::format_score;
use crate::view::{ColumnType, ViewColumn};

/// Placeholder for an empty cell.
pub const EMPTY_CELL: &str = "—";

/// Ambient inputs for rendering one table.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub today: NaiveDate,
    pub custom_fields: &'a [CustomFieldDef],
}

impl<'a> RenderContext<'a> {
    pub fn new(today: NaiveDate, custom_fields: &'a [CustomFieldDef]) -> Self {
        Self {
            today,
            custom_fields,
        }
    }

    fn field_type(&self, key: &str) -> CustomFieldType {
        self.custom_fields
            .iter()
            .find(|def| def.field_key == key)
            .map(|def| def.field_type)
            .unwrap_or_default()
    }
}

pub trait CellRenderer: Send + Sync {
    fn render(&self, task: &Task, column: &ViewColumn, ctx: &RenderContext<'_>) -> String;
}

impl<F> CellRenderer for F
where
    F: Fn(&Task, &ViewColumn, &RenderContext<'_>) -> String + Send + Sync,
{
    fn render(&self, task: &Task, column: &ViewColumn, ctx: &RenderContext<'_>) -> String {
        self(task, column, ctx)
    }
}

/// Renderer lookup by column kind.
pub struct RendererRegistry {
    built_in: HashMap<String, Box<dyn CellRenderer>>,
    custom: HashMap<CustomFieldType, Box<dyn CellRenderer>>,
}

impl RendererRegistry {
    pub fn empty() -> Self {
        Self {
            built_in: HashMap::new(),
            custom: HashMap::new(),
        }
    }

    /// Registry with renderers for every built-in column and custom field type.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_built_in("title", title_cell);
        registry.register_built_in("status", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            task.status.to_string()
        });
        registry.register_built_in("domain", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            or_empty(task.domain.as_ref().map(|domain| domain.name.as_str()))
        });
        registry.register_built_in("client", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            or_empty(task.client.as_ref().map(|client| client.name.as_str()))
        });
        registry.register_built_in("project", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            or_empty(task.project.as_ref().map(|project| project.name.as_str()))
        });
        registry.register_built_in("leverage", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            task.leverage.to_string()
        });
        registry.register_built_in("urgency", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            task.urgency.to_string()
        });
        registry.register_built_in("effort", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            task.effort.to_string()
        });
        registry.register_built_in(
            "priority_score",
            |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| format_score(task.priority_score()),
        );
        registry.register_built_in("due_date", due_date_cell);
        registry.register_built_in(
            "description",
            |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
                or_empty(task.description.as_deref().filter(|text| !text.is_empty()))
            },
        );
        registry.register_built_in("created_at", |task: &Task, _: &ViewColumn, _: &RenderContext<'_>| {
            task.created_at.format("%Y-%m-%d").to_string()
        });

        for field_type in CustomFieldType::ALL {
            registry.register_custom(*field_type, plain_custom_cell);
        }
        registry.register_custom(CustomFieldType::Checkbox, checkbox_cell);
        registry
    }

    pub fn register_built_in<R>(&mut self, key: impl Into<String>, renderer: R)
    where
        R: CellRenderer + 'static,
    {
        self.built_in.insert(key.into(), Box::new(renderer));
    }

    pub fn register_custom<R>(&mut self, field_type: CustomFieldType, renderer: R)
    where
        R: CellRenderer + 'static,
    {
        self.custom.insert(field_type, Box::new(renderer));
    }

    /// Render one cell. Columns without a renderer render as empty.
    pub fn render(&self, task: &Task, column: &ViewColumn, ctx: &RenderContext<'_>) -> String {
        let renderer = match column.column_type {
            ColumnType::BuiltIn => self.built_in.get(&column.key),
            ColumnType::Custom => self.custom.get(&ctx.field_type(&column.key)),
        };
        match renderer {
            Some(renderer) => renderer.render(task, column, ctx),
            None => EMPTY_CELL.to_string(),
        }
    }

    pub fn render_row(&self, task: &Task, columns: &[ViewColumn], ctx: &RenderContext<'_>) -> Vec<String> {
        columns
            .iter()
            .map(|column| self.render(task, column, ctx))
            .collect()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn or_empty(value: Option<&str>) -> String {
    value.unwrap_or(EMPTY_CELL).to_string()
}

fn title_cell(task: &Task, _: &ViewColumn, _: &RenderContext<'_>) -> String {
    let mark = if task.status == crate::model::TaskStatus::Done {
        "[x]"
    } else {
        "[ ]"
    };
    format!("{mark} {}", task.title)
}

fn due_date_cell(task: &Task, _: &ViewColumn, ctx: &RenderContext<'_>) -> String {
    match task.due_date {
        None => EMPTY_CELL.to_string(),
        Some(date) => {
            let overdue = date < ctx.today && task.status != crate::model::TaskStatus::Done;
            let text = date.format("%Y-%m-%d").to_string();
            if overdue {
                format!("{text} (overdue)")
            } else {
                text
            }
        }
    }
}

fn plain_custom_cell(task: &Task, column: &ViewColumn, _: &RenderContext<'_>) -> String {
    match task.custom_fields.get(&column.key) {
        None | Some(serde_json::Value::Null) => EMPTY_CELL.to_string(),
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn checkbox_cell(task: &Task, column: &ViewColumn, _: &RenderContext<'_>) -> String {
    match task.custom_fields.get(&column.key) {
        None | Some(serde_json::Value::Null) => EMPTY_CELL.to_string(),
        Some(serde_json::Value::Bool(true)) => "yes".to_string(),
        Some(serde_json::Value::Bool(false)) => "no".to_string(),
        Some(other) => other.to_string(),
    }
}
