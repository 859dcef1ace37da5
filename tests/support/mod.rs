#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use pos::store::{Dataset, FileBackend};
use serde_json::Value;
use tempfile::TempDir;

/// A scratch pos workspace: `pos init` already run in a temp directory.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let workspace = Self { dir };
        workspace.cmd().arg("init").assert().success();
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".pos.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join(".pos").join("data.json")
    }

    pub fn read_data(&self) -> Result<Dataset, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.data_path())?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn backend(&self) -> FileBackend {
        FileBackend::new(self.data_path(), 1000)
    }

    /// `pos` with the workspace as root.
    pub fn cmd(&self) -> Command {
        let mut cmd = pos_cmd();
        cmd.env("POS_ROOT", self.dir.path());
        cmd
    }

    /// Run `pos --json <args>` and return the `data` field of the envelope.
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.cmd().arg("--json").args(args).output()?;
        if !output.status.success() {
            return Err(format!(
                "pos {:?} failed: {}{}",
                args,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
            .into());
        }
        let envelope: Value = serde_json::from_slice(&output.stdout)?;
        Ok(envelope["data"].clone())
    }

    /// Create a task and return its id.
    pub fn add_task(
        &self,
        title: &str,
        leverage: u8,
        urgency: u8,
        effort: u8,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let data = self.json(&[
            "task",
            "add",
            title,
            "--leverage",
            &leverage.to_string(),
            "--urgency",
            &urgency.to_string(),
            "--effort",
            &effort.to_string(),
        ])?;
        Ok(data["id"].as_str().ok_or("missing id")?.to_string())
    }
}

pub fn pos_cmd() -> Command {
    let mut cmd = Command::cargo_bin("pos").expect("binary");
    cmd.env_remove("RUST_LOG").env_remove("POS_LOG");
    cmd
}

pub fn titles(data: &Value) -> Vec<String> {
    data["tasks"]
        .as_array()
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|task| task["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
