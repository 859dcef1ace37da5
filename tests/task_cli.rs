mod support;

use predicates::str::contains;

use support::{titles, TestWorkspace};

fn seeded() -> Result<(TestWorkspace, [String; 3]), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::init()?;
    let alpha = workspace.add_task("Alpha report", 5, 4, 2)?; // 7.0
    let bravo = workspace.add_task("Bravo call", 3, 3, 3)?; // 3.0
    let charlie = workspace.add_task("Charlie invoice", 2, 4, 1)?; // 8.0
    Ok((workspace, [alpha, bravo, charlie]))
}

#[test]
fn list_sorts_by_priority_by_default() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, _) = seeded()?;

    let data = workspace.json(&["task", "list"])?;
    assert_eq!(data["total"], 3);
    assert_eq!(
        titles(&data),
        ["Charlie invoice", "Alpha report", "Bravo call"]
    );
    assert_eq!(data["tasks"][0]["priority_score"], 8.0);
    assert_eq!(data["tasks"][1]["priority_score"], 7.0);
    assert_eq!(data["sort"]["field"], "priority_score");

    workspace
        .cmd()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(contains("Score"))
        .stdout(contains("8.0"))
        .stdout(contains("Charlie invoice"));
    Ok(())
}

#[test]
fn equal_scores_keep_creation_order() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::init()?;
    workspace.add_task("Reply to Dana", 2, 1, 1)?;
    workspace.add_task("Renew domain", 1, 3, 1)?;
    workspace.add_task("Plan quarter", 5, 5, 1)?;

    let data = workspace.json(&["task", "list"])?;
    assert_eq!(
        titles(&data),
        ["Plan quarter", "Reply to Dana", "Renew domain"]
    );
    assert_eq!(data["tasks"][1]["priority_score"], 5.0);
    assert_eq!(data["tasks"][2]["priority_score"], 5.0);
    Ok(())
}

#[test]
fn list_filters_search_and_sort() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, _) = seeded()?;

    let data = workspace.json(&["task", "list", "--sort", "title:desc"])?;
    assert_eq!(
        titles(&data),
        ["Charlie invoice", "Bravo call", "Alpha report"]
    );

    let data = workspace.json(&["task", "list", "--filter", "leverage:gte:3"])?;
    assert_eq!(titles(&data), ["Alpha report", "Bravo call"]);

    let data = workspace.json(&[
        "task",
        "list",
        "--filter",
        "leverage:gte:3",
        "--filter",
        "title:contains:CALL",
    ])?;
    assert_eq!(titles(&data), ["Bravo call"]);

    let data = workspace.json(&["task", "list", "--search", "INVOICE"])?;
    assert_eq!(titles(&data), ["Charlie invoice"]);

    let data = workspace.json(&["task", "list", "--filter", "mystery:between:1"])?;
    assert_eq!(data["total"], 3);
    Ok(())
}

#[test]
fn status_changes_and_status_filter() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, bravo, _]) = seeded()?;

    let toggled = workspace.json(&["task", "toggle", &alpha])?;
    assert_eq!(toggled["status"], "done");
    assert!(toggled["completed_at"].is_string());

    let data = workspace.json(&["task", "list", "--status", "done"])?;
    assert_eq!(titles(&data), ["Alpha report"]);

    let data = workspace.json(&["task", "list", "--status", "todo"])?;
    assert_eq!(titles(&data), ["Charlie invoice", "Bravo call"]);

    let toggled = workspace.json(&["task", "toggle", &alpha])?;
    assert_eq!(toggled["status"], "todo");
    assert!(toggled.get("completed_at").is_none());

    let changed = workspace.json(&["task", "status", &bravo, "in_progress"])?;
    assert_eq!(changed["status"], "in_progress");

    workspace
        .cmd()
        .args(["task", "status", &bravo, "blocked"])
        .assert()
        .code(2)
        .stderr(contains("unknown task status"));
    Ok(())
}

#[test]
fn ids_resolve_by_unique_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, _, _]) = seeded()?;
    let suffix = alpha.split_once('-').map(|(_, rest)| rest).ok_or("id")?;

    let data = workspace.json(&["task", "show", suffix])?;
    assert_eq!(data["id"], alpha.as_str());

    workspace
        .cmd()
        .args(["task", "show", "tsk-zzzzzzzz"])
        .assert()
        .code(2)
        .stderr(contains("task not found"))
        .stderr(contains("hint: pos task list"));
    Ok(())
}

#[test]
fn delete_requires_confirmation() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, _, _]) = seeded()?;

    workspace
        .cmd()
        .args(["task", "delete", &alpha])
        .assert()
        .code(3)
        .stderr(contains("hint: re-run with --yes"));
    assert_eq!(workspace.read_data()?.tasks.len(), 3);

    workspace
        .cmd()
        .args(["task", "delete", &alpha, "--yes"])
        .assert()
        .success();
    assert_eq!(workspace.read_data()?.tasks.len(), 2);
    Ok(())
}

#[test]
fn json_errors_use_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, _, _]) = seeded()?;

    let output = workspace
        .cmd()
        .args(["--json", "task", "delete", &alpha])
        .output()?;
    assert_eq!(output.status.code(), Some(3));
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["command"], "task delete");
    assert_eq!(envelope["error"]["kind"], "confirmation_required");
    assert_eq!(envelope["error"]["code"], 3);
    Ok(())
}

#[test]
fn inline_edits_validate_ratings_and_titles() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, _, _]) = seeded()?;

    let edited = workspace.json(&["task", "edit", &alpha, "effort", "4"])?;
    assert_eq!(edited["effort"], 4);
    assert_eq!(edited["priority_score"], 3.5);

    workspace
        .cmd()
        .args(["task", "edit", &alpha, "leverage", "9"])
        .assert()
        .code(2);
    workspace
        .cmd()
        .args(["task", "edit", &alpha, "title", "  "])
        .assert()
        .code(2)
        .stderr(contains("title cannot be empty"));

    let edited = workspace.json(&["task", "edit", &alpha, "due_date", "2026-11-02"])?;
    assert_eq!(edited["due_date"], "2026-11-02");
    let cleared = workspace.json(&["task", "edit", &alpha, "due_date", ""])?;
    assert!(cleared.get("due_date").is_none());
    Ok(())
}

#[test]
fn update_accepts_an_edited_task_record() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, _, _]) = seeded()?;

    let mut record = workspace.json(&["task", "show", &alpha])?;
    record["title"] = serde_json::json!("Alpha report v2");
    record["urgency"] = serde_json::json!(2);
    record["priority_score"] = serde_json::json!(99.0);

    let updated = workspace.json(&["task", "update", &alpha, &record.to_string()])?;
    assert_eq!(updated["title"], "Alpha report v2");
    assert_eq!(updated["id"], alpha.as_str());
    assert_eq!(updated["created_at"], record["created_at"]);
    assert_eq!(updated["priority_score"], 6.0);

    workspace
        .cmd()
        .args(["task", "update", &alpha, r#"{"colour": "red"}"#])
        .assert()
        .code(2)
        .stderr(contains("invalid task patch"));
    workspace
        .cmd()
        .args(["task", "update", &alpha, "-"])
        .write_stdin(r#"{"status": "done"}"#)
        .assert()
        .success();
    assert!(workspace.json(&["task", "show", &alpha])?["completed_at"].is_string());
    Ok(())
}

#[test]
fn custom_fields_are_editable_and_filterable() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, bravo, _]) = seeded()?;

    let field = workspace.json(&["field", "add", "Contract Value", "--type", "number"])?;
    assert_eq!(field["field_key"], "contract_value");

    workspace.json(&["task", "edit", &alpha, "contract_value", "1200"])?;
    workspace.json(&["task", "edit", &bravo, "contract_value", "300"])?;

    let shown = workspace.json(&["task", "show", &alpha])?;
    assert_eq!(
        shown["custom_fields"]["contract_value"].as_f64(),
        Some(1200.0)
    );

    let data = workspace.json(&["task", "list", "--filter", "contract_value:gte:1000"])?;
    assert_eq!(titles(&data), ["Alpha report"]);

    workspace
        .cmd()
        .args(["task", "edit", &alpha, "contract_value", "lots"])
        .assert()
        .code(2);
    workspace
        .cmd()
        .args(["task", "edit", &alpha, "nonexistent", "1"])
        .assert()
        .code(2)
        .stderr(contains("cannot be edited"));

    workspace
        .cmd()
        .args(["field", "add", "Title", "--key", "title"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn bulk_actions_apply_to_every_task() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [alpha, bravo, charlie]) = seeded()?;

    let updated = workspace.json(&["task", "bulk-status", "done", &alpha, &bravo])?;
    assert_eq!(updated.as_array().map(Vec::len), Some(2));
    let data = workspace.json(&["task", "list", "--status", "done"])?;
    assert_eq!(data["total"], 2);

    workspace
        .cmd()
        .args(["task", "bulk-delete", &alpha, &charlie])
        .assert()
        .code(3);

    let deleted = workspace.json(&["task", "bulk-delete", &alpha, &charlie, "--yes"])?;
    assert_eq!(deleted["deleted"].as_array().map(Vec::len), Some(2));
    let data = workspace.json(&["task", "list"])?;
    assert_eq!(titles(&data), ["Bravo call"]);
    Ok(())
}

#[test]
fn matrix_buckets_open_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, [_, bravo, _]) = seeded()?;
    workspace.json(&["task", "status", &bravo, "done"])?;

    let data = workspace.json(&["task", "matrix"])?;
    assert_eq!(data["total"], 2);
    let points = data["points"].as_array().ok_or("points")?;
    let alpha = points
        .iter()
        .find(|point| point["title"] == "Alpha report")
        .ok_or("alpha")?;
    assert_eq!(alpha["quadrant"], "quick_win");
    assert_eq!(alpha["domain_name"], "Unassigned");
    let charlie = points
        .iter()
        .find(|point| point["title"] == "Charlie invoice")
        .ok_or("charlie")?;
    assert_eq!(charlie["quadrant"], "fill_in");
    Ok(())
}

#[test]
fn stored_tasks_never_carry_a_score() -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, _) = seeded()?;
    let raw = std::fs::read_to_string(workspace.data_path())?;
    assert!(!raw.contains("priority_score"));
    Ok(())
}
