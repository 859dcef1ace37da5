mod support;

use predicates::prelude::*;
use predicates::str::contains;

use support::{titles, TestWorkspace};

#[test]
fn default_view_drives_listing() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::init()?;
    workspace.add_task("Ship release", 5, 5, 2)?;
    workspace.add_task("Tidy desk", 1, 1, 1)?;

    let view = workspace.json(&[
        "view",
        "create",
        "High leverage",
        "--filter",
        "leverage:gte:4",
        "--hide",
        "description",
        "--hide",
        "client",
        "--default",
    ])?;
    let view_id = view["id"].as_str().ok_or("view id")?.to_string();
    assert_eq!(view["is_default"], true);

    let data = workspace.json(&["task", "list"])?;
    assert_eq!(data["view"], view_id.as_str());
    assert_eq!(titles(&data), ["Ship release"]);

    let data = workspace.json(&["task", "list", "--no-view"])?;
    assert_eq!(data["total"], 2);

    workspace
        .cmd()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(contains("Tasks (High leverage)"))
        .stdout(contains("Client").not());
    Ok(())
}

#[test]
fn views_resolve_by_name_and_custom_columns() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::init()?;
    workspace.add_task("Plan quarter", 4, 3, 3)?;
    workspace.json(&["field", "add", "Stage", "--type", "select", "--option", "lead", "--option", "won"])?;

    workspace.json(&[
        "view",
        "create",
        "Pipeline",
        "--custom",
        "stage",
        "--sort",
        "title:asc",
    ])?;

    let shown = workspace.json(&["view", "show", "pipeline"])?;
    let columns = shown["columns"].as_array().ok_or("columns")?;
    let stage = columns.last().ok_or("stage column")?;
    assert_eq!(stage["key"], "stage");
    assert_eq!(stage["type"], "custom");
    assert_eq!(shown["sort"]["direction"], "asc");

    let data = workspace.json(&["task", "list", "--view", "Pipeline"])?;
    assert_eq!(data["sort"]["field"], "title");

    workspace
        .cmd()
        .args(["view", "create", "Broken", "--show", "nonsense"])
        .assert()
        .code(2)
        .stderr(contains("unknown column"));
    workspace
        .cmd()
        .args(["view", "create", "   "])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn deleting_active_view_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::init()?;
    let first = workspace.json(&["view", "create", "Everything", "--default"])?;
    let second = workspace.json(&["view", "create", "Later"])?;

    let listed = workspace.json(&["view", "list"])?;
    assert_eq!(listed["active"], first["id"]);

    workspace
        .cmd()
        .args(["view", "delete", "Everything"])
        .assert()
        .code(3);

    let deleted = workspace.json(&["view", "delete", "Everything", "--yes"])?;
    assert_eq!(deleted["active"], second["id"]);

    let deleted = workspace.json(&["view", "delete", "Later", "--yes"])?;
    assert!(deleted.get("active").is_none());

    let data = workspace.json(&["task", "list"])?;
    assert!(data.get("view").is_none());
    Ok(())
}

#[test]
fn second_default_view_replaces_first() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = TestWorkspace::init()?;
    workspace.json(&["view", "create", "One", "--default"])?;
    let two = workspace.json(&["view", "create", "Two", "--default"])?;

    let listed = workspace.json(&["view", "list"])?;
    let defaults: Vec<_> = listed["views"]
        .as_array()
        .ok_or("views")?
        .iter()
        .filter(|view| view["is_default"] == true)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["id"], two["id"]);
    Ok(())
}
