//! pos stats command implementation.

use serde::Serialize;

use crate::actions::dashboard;
use crate::error::Result;
use crate::model::{Client, DashboardStats, TaskView};
use crate::output::{emit_success, HumanOutput};
use crate::priority::format_score;

use super::{Context, GlobalArgs};

#[derive(Serialize)]
struct StatsOutput<'a> {
    stats: DashboardStats,
    top_tasks: Vec<TaskView<'a>>,
    recent_clients: &'a [Client],
}

pub fn run(global: GlobalArgs) -> Result<()> {
    let ctx = Context::load(&global)?;
    let board = dashboard(&ctx.backend, ctx.config.tasks.top_tasks)?;
    let stats = board.stats;

    let mut human = HumanOutput::new("Dashboard");
    human.push_summary("Tasks", stats.total_tasks.to_string());
    human.push_summary("Active", stats.active_tasks.to_string());
    human.push_summary("Done", stats.done_tasks.to_string());
    human.push_summary("Clients", stats.total_clients.to_string());
    human.push_summary("Unread inbox", stats.unread_inbox.to_string());

    if !board.top_tasks.is_empty() {
        human.push_body("Top priorities:");
        for task in &board.top_tasks {
            human.push_body(format!(
                "  {:>5}  {}  {}",
                format_score(task.priority_score()),
                task.id,
                task.title
            ));
        }
    }
    for client in &board.recent_clients {
        human.push_detail(format!("{}  {}  [{}]", client.id, client.name, client.status));
    }

    let output = StatsOutput {
        stats,
        top_tasks: board.top_tasks.iter().map(TaskView::from).collect(),
        recent_clients: &board.recent_clients,
    };
    emit_success(ctx.output, "stats", &output, Some(&human))
}
