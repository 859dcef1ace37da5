//! pos inbox command implementations.

use serde::Serialize;

use crate::actions::mark_inbox;
use crate::backend::{Backend, NewInboxItem};
use crate::error::Result;
use crate::model::{InboxItem, InboxStatus};
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordKind;

use super::{confirm, non_empty, Context, GlobalArgs};

pub struct AddOptions {
    pub subject: Option<String>,
    pub content: Option<String>,
    pub sender: Option<String>,
    pub source: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct InboxListOutput {
    total: usize,
    items: Vec<InboxItem>,
}

#[derive(Serialize)]
struct InboxDeleteOutput {
    deleted: String,
}

fn headline(item: &InboxItem) -> String {
    item.subject
        .clone()
        .or_else(|| item.content.clone())
        .unwrap_or_default()
}

pub fn run_list(status: Option<String>, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let status = status
        .as_deref()
        .map(str::parse::<InboxStatus>)
        .transpose()?;
    let items = ctx.backend.list_inbox(status)?;

    let mut human = HumanOutput::new("Inbox");
    if items.is_empty() {
        human.push_body("Inbox is empty.");
    }
    for item in &items {
        human.push_body(format!(
            "{}  [{}]  {}  {}",
            item.id,
            item.status,
            item.received_at.format("%Y-%m-%d %H:%M"),
            headline(item)
        ));
    }
    human.push_summary("Total", items.len().to_string());

    let output = InboxListOutput {
        total: items.len(),
        items,
    };
    emit_success(ctx.output, "inbox list", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = Context::load(&options.global)?;
    let item = ctx.backend.create_inbox_item(NewInboxItem {
        source: options.source.parse()?,
        sender: non_empty(options.sender),
        subject: non_empty(options.subject),
        content: non_empty(options.content),
        received_at: None,
    })?;

    let mut human = HumanOutput::new("Inbox item added");
    human.push_summary("ID", item.id.clone());
    human.push_summary("Subject", headline(&item));
    emit_success(ctx.output, "inbox add", &item, Some(&human))
}

pub fn run_mark(id: String, status: String, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::InboxItem, &id)?;
    let item = mark_inbox(&ctx.backend, &id, status.parse()?)?;

    let mut human = HumanOutput::new(format!("Inbox item marked {}", item.status));
    human.push_summary("ID", item.id.clone());
    emit_success(ctx.output, "inbox mark", &item, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::InboxItem, &id)?;
    confirm(yes, format!("delete inbox item {id}"))?;
    ctx.backend.delete_inbox_item(&id)?;

    let mut human = HumanOutput::new("Inbox item deleted");
    human.push_summary("ID", id.clone());
    emit_success(
        ctx.output,
        "inbox delete",
        &InboxDeleteOutput { deleted: id },
        Some(&human),
    )
}
