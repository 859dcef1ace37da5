//! Template application and onboarding progress.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actions::{BulkFailure, BulkReport};
use crate::backend::{Backend, ClientPatch, NewTask};
use crate::error::{Error, Result};
use crate::filter::ScopeFilter;
use crate::model::{ClientStatus, Task, TaskStatus, TemplateTask};

/// Task materialised from `template_task` for `client_id`.
pub fn task_from_template(template_task: &TemplateTask, client_id: &str) -> NewTask {
    NewTask {
        title: template_task.title.clone(),
        description: template_task.description.clone(),
        domain_id: template_task.domain_id.clone(),
        client_id: Some(client_id.to_string()),
        leverage: template_task.default_leverage,
        urgency: template_task.default_urgency,
        effort: template_task.default_effort,
        status: TaskStatus::Todo,
        template_task_id: Some(template_task.id.clone()),
        ..NewTask::default()
    }
}

/// Create one task per template task for the client, then move the client
/// to onboarding. Each step is attempted; the report lists what failed.
///
/// A template without tasks writes nothing. When every task creation fails
/// the client is left unchanged.
pub fn apply_template_report<B: Backend + ?Sized>(
    backend: &B,
    template_id: &str,
    client_id: &str,
) -> Result<BulkReport<Task>> {
    let template = backend
        .get_template(template_id)?
        .ok_or_else(|| Error::not_found("template", template_id))?;
    if backend.get_client(client_id)?.is_none() {
        return Err(Error::not_found("client", client_id));
    }

    let mut report = BulkReport::new(format!("apply template {}", template.name));
    if template.template_tasks.is_empty() {
        debug!(template_id, "template has no tasks, nothing to apply");
        return Ok(report);
    }

    for template_task in &template.template_tasks {
        match backend.create_task(task_from_template(template_task, client_id)) {
            Ok(task) => report.succeeded.push(task),
            Err(error) => {
                warn!(template_task_id = %template_task.id, %error, "template task not created");
                report.failed.push(BulkFailure {
                    id: template_task.id.clone(),
                    error,
                });
            }
        }
    }
    if report.succeeded.is_empty() {
        return Ok(report);
    }

    let patch = ClientPatch {
        status: Some(ClientStatus::Onboarding),
        onboarded_at: Some(Some(Utc::now())),
        ..ClientPatch::default()
    };
    if let Err(error) = backend.update_client(client_id, patch) {
        warn!(client_id, %error, "client not moved to onboarding");
        report.failed.push(BulkFailure {
            id: client_id.to_string(),
            error,
        });
    }

    info!(
        template_id,
        client_id,
        created = report.succeeded.len(),
        failed = report.failed.len(),
        "applied template"
    );
    Ok(report)
}

/// Created tasks, or an error. Partial application surfaces as
/// [`Error::PartialFailure`].
pub fn apply_template<B: Backend + ?Sized>(
    backend: &B,
    template_id: &str,
    client_id: &str,
) -> Result<Vec<Task>> {
    apply_template_report(backend, template_id, client_id)?.into_result()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OnboardingProgress {
    pub total: usize,
    pub completed: usize,
}

impl OnboardingProgress {
    /// Rounded percentage; 0 when there is nothing to complete.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

/// Count tasks created from a template, and how many of those are done.
pub fn progress<'a, I>(tasks: I) -> OnboardingProgress
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|task| task.template_task_id.is_some())
        .fold(OnboardingProgress::default(), |mut acc, task| {
            acc.total += 1;
            if task.status == TaskStatus::Done {
                acc.completed += 1;
            }
            acc
        })
}

/// Onboarding progress of one client.
pub fn client_progress<B: Backend + ?Sized>(
    backend: &B,
    client_id: &str,
) -> Result<OnboardingProgress> {
    let tasks = backend.list_tasks(&ScopeFilter::client(client_id))?;
    Ok(progress(&tasks))
}
