//! pos domain command implementations.

use serde::Serialize;

use crate::backend::{Backend, NewDomain};
use crate::domain::{build_tree, DomainNode};
use crate::error::Result;
use crate::model::Domain;
use crate::output::{emit_success, HumanOutput};
use crate::store::RecordKind;

use super::{confirm, non_empty, Context, GlobalArgs};

#[derive(Serialize)]
struct DomainListOutput {
    total: usize,
    tree: Vec<DomainNode>,
}

#[derive(Serialize)]
struct DomainDeleteOutput {
    deleted: String,
}

pub fn run_list(global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let domains = ctx.backend.list_domains()?;
    let tree = build_tree(&domains);

    let mut human = HumanOutput::new("Domains");
    if tree.is_empty() {
        human.push_body("No domains.");
    }
    for node in &tree {
        human.push_body(format!("{}  {}", node.domain.id, node.domain.name));
        for child in &node.children {
            human.push_body(format!("  └ {}  {}", child.id, child.name));
        }
    }
    human.push_summary("Total", domains.len().to_string());

    let output = DomainListOutput {
        total: domains.len(),
        tree,
    };
    emit_success(ctx.output, "domain list", &output, Some(&human))
}

pub fn run_add(
    name: String,
    parent: Option<String>,
    color: Option<String>,
    global: GlobalArgs,
) -> Result<()> {
    let ctx = Context::load(&global)?;
    let domain: Domain = ctx.backend.create_domain(NewDomain {
        name,
        parent_id: ctx.resolve_opt(RecordKind::Domain, parent.as_deref())?,
        color: non_empty(color),
        sort_order: None,
    })?;

    let mut human = HumanOutput::new("Domain created");
    human.push_summary("ID", domain.id.clone());
    human.push_summary("Name", domain.name.clone());
    if let Some(parent_id) = &domain.parent_id {
        human.push_summary("Parent", parent_id.clone());
    }
    emit_success(ctx.output, "domain add", &domain, Some(&human))
}

pub fn run_delete(id: String, yes: bool, global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let id = ctx.resolve(RecordKind::Domain, &id)?;
    confirm(yes, format!("delete domain {id}"))?;
    ctx.backend.delete_domain(&id)?;

    let mut human = HumanOutput::new("Domain deleted");
    human.push_summary("ID", id.clone());
    human.push_detail("tasks and projects in it are now unassigned");
    emit_success(
        ctx.output,
        "domain delete",
        &DomainDeleteOutput { deleted: id },
        Some(&human),
    )
}
