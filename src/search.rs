//! Free-text task search.

use crate::model::Task;

/// Case-insensitive substring match against the title, the description and
/// the names of the related domain, client and project. An empty query
/// matches everything.
pub fn matches(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    searchable_fields(task).any(|text| text.to_lowercase().contains(&needle))
}

fn searchable_fields(task: &Task) -> impl Iterator<Item = &str> {
    [
        Some(task.title.as_str()),
        task.description.as_deref(),
        task.domain.as_ref().map(|domain| domain.name.as_str()),
        task.client.as_ref().map(|client| client.name.as_str()),
        task.project.as_ref().map(|project| project.name.as_str()),
    ]
    .into_iter()
    .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Client, Rating};
    use chrono::Utc;

    fn task() -> Task {
        Task {
            id: "tsk-1".to_string(),
            title: "Draft proposal".to_string(),
            description: Some("Include Pricing".to_string()),
            project_id: None,
            client_id: Some("cli-1".to_string()),
            domain_id: None,
            leverage: Rating::default(),
            urgency: Rating::default(),
            effort: Rating::default(),
            status: Default::default(),
            due_date: None,
            template_task_id: None,
            created_at: Utc::now(),
            completed_at: None,
            custom_fields: Default::default(),
            domain: None,
            client: Some(Client {
                id: "cli-1".to_string(),
                name: "Acme Corp".to_string(),
                status: Default::default(),
                onboarded_at: None,
                notes: None,
                avatar_url: None,
                created_at: Utc::now(),
            }),
            project: None,
        }
    }

    #[test]
    fn matches_any_searchable_field() {
        let task = task();
        assert!(matches(&task, ""));
        assert!(matches(&task, "PROPOSAL"));
        assert!(matches(&task, "pricing"));
        assert!(matches(&task, "acme"));
        assert!(!matches(&task, "globex"));
    }
}
