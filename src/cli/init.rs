//! pos init command implementation.

use serde::Serialize;
use tracing::info;

use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::store::FileBackend;

use super::GlobalArgs;

pub struct InitOptions {
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct InitOutput {
    root: String,
    config_created: bool,
    data_file: String,
    data_created: bool,
}

/// Write a default `.pos.toml` (unless one exists) and create the dataset.
pub fn run(options: InitOptions) -> Result<()> {
    let root = options.global.root()?;
    std::fs::create_dir_all(&root)?;

    let config_path = root.join(CONFIG_FILE);
    let config_created = !config_path.exists();
    let config = if config_created {
        let config = Config::default();
        config.save(&config_path)?;
        info!(path = %config_path.display(), "wrote default config");
        config
    } else {
        Config::load(&config_path)?
    };

    let backend = FileBackend::from_config(&root, &config);
    let data_created = backend.init()?;

    let header = if config_created || data_created {
        "pos initialized"
    } else {
        "pos already initialized"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Root", root.display().to_string());
    human.push_summary(
        "Config",
        format!(
            "{}{}",
            config_path.display(),
            if config_created { " (created)" } else { "" }
        ),
    );
    human.push_summary(
        "Data",
        format!(
            "{}{}",
            backend.path().display(),
            if data_created { " (created)" } else { "" }
        ),
    );
    human.push_next_step("pos task add \"<title>\" --leverage 4 --urgency 3 --effort 2");

    let output = InitOutput {
        root: root.display().to_string(),
        config_created,
        data_file: backend.path().display().to_string(),
        data_created,
    };
    emit_success(options.global.output(), "init", &output, Some(&human))
}
