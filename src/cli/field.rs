//! pos field command implementations.

use serde::Serialize;

use crate::backend::{Backend, NewCustomField};
use crate::error::Result;
use crate::model::CustomFieldDef;
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordKind;

use super::{confirm, non_empty, Context, GlobalArgs};

pub struct AddOptions {
    pub name: String,
    pub key: Option<String>,
    pub field_type: String,
    pub options: Vec<String>,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct FieldListOutput {
    total: usize,
    fields: Vec<CustomFieldDef>,
}

#[derive(Serialize)]
struct FieldDeleteOutput {
    deleted: String,
}

pub fn run_list(global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let fields = ctx.backend.list_custom_fields()?;

    let mut human = HumanOutput::new("Custom fields");
    if fields.is_empty() {
        human.push_body("No custom fields.");
    }
    for field in &fields {
        let options = if field.options.is_empty() {
            String::new()
        } else {
            format!("  [{}]", field.options.join("|"))
        };
        human.push_body(format!(
            "{}  {}  {} ({}){options}",
            field.id, field.field_key, field.name, field.field_type
        ));
    }
    human.push_summary("Total", fields.len().to_string());

    let output = FieldListOutput {
        total: fields.len(),
        fields,
    };
    emit_success(ctx.output, "field list", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let field = ctx.backend.create_custom_field(NewCustomField {
        name: options.name,
        field_key: non_empty(options.key),
        field_type: options.field_type.parse()?,
        options: options
            .options
            .into_iter()
            .map(|option| option.trim().to_string())
            .filter(|option| !option.is_empty())
            .collect(),
        color: None,
    })?;

    let mut human = HumanOutput::new("Custom field created");
    human.push_summary("ID", field.id.clone());
    human.push_summary("Key", field.field_key.clone());
    human.push_summary("Type", field.field_type.to_string());
    human.push_next_step(format!("pos task edit <task> {} <value>", field.field_key));
    emit_success(ctx.output, "field add", &field, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::CustomField, &id)?;
    confirm(yes, format!("delete custom field {id} and its values on every task"))?;
    ctx.backend.delete_custom_field(&id)?;

    let mut human = HumanOutput::new("Custom field deleted");
    human.push_summary("ID", id.clone());
    emit_success(
        ctx.output,
        "field delete",
        &FieldDeleteOutput { deleted: id },
        Some(&human),
    )
}
