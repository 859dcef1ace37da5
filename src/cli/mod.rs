//! Command-line interface for pos
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::store::{resolve_id, DatasetAccess, FileBackend, RecordKind};

mod client;
mod domain;
mod field;
mod inbox;
mod init;
mod project;
mod stats;
mod task;
mod template;
mod view;

/// pos - Personal OS
///
/// Tasks ranked by leverage, urgency and effort, with clients, projects,
/// onboarding templates, saved views and an inbox.
#[derive(Parser, Debug)]
#[command(name = "pos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace root holding .pos.toml (defaults to current directory)
    #[arg(long, global = true, env = "POS_ROOT")]
    pub root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .pos.toml and an empty dataset
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Saved table views
    #[command(subcommand)]
    View(ViewCommands),

    /// Client management
    #[command(subcommand)]
    Client(ClientCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Onboarding templates
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Domain taxonomy
    #[command(subcommand)]
    Domain(DomainCommands),

    /// Inbox items
    #[command(subcommand)]
    Inbox(InboxCommands),

    /// Custom task fields
    #[command(subcommand)]
    Field(FieldCommands),

    /// Dashboard: counts, top priorities and recent clients
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks through the active view, filters and search
    List {
        /// Saved view (id, id prefix or name); defaults to the default view
        #[arg(long)]
        view: Option<String>,

        /// Ignore saved views and use the built-in columns
        #[arg(long, conflicts_with = "view")]
        no_view: bool,

        /// Status filter: todo, in_progress, done, archived or all
        #[arg(long, default_value = "all")]
        status: String,

        /// Domain filter: domain id or all
        #[arg(long, default_value = "all")]
        domain: String,

        /// Only tasks of this client
        #[arg(long)]
        client: Option<String>,

        /// Only tasks of this project
        #[arg(long)]
        project: Option<String>,

        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,

        /// Sort as field[:asc|desc], overriding the view
        #[arg(long)]
        sort: Option<String>,

        /// Extra clause as field:operator:value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        client: Option<String>,

        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        domain: Option<String>,

        /// Impact, 1-5
        #[arg(short, long, default_value_t = 3)]
        leverage: i64,

        /// Time pressure, 1-5
        #[arg(short, long, default_value_t = 3)]
        urgency: i64,

        /// Cost to complete, 1-5
        #[arg(short, long, default_value_t = 3)]
        effort: i64,

        #[arg(long, default_value = "todo")]
        status: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Show one task
    Show { id: String },

    /// Edit one field of a task (built-in or custom); empty value clears it
    Edit {
        id: String,
        field: String,
        value: String,
    },

    /// Update a task from a JSON object, e.g. an edited `task show --json` record
    Update {
        id: String,
        /// JSON object; `-` reads it from stdin
        patch: String,
    },

    /// Change a task's status
    Status { id: String, status: String },

    /// Toggle a task between done and todo
    Toggle { id: String },

    /// Delete a task
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },

    /// Change the status of several tasks
    BulkStatus {
        status: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete several tasks
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        yes: bool,
    },

    /// Leverage/effort matrix of open tasks
    Matrix {
        #[arg(long)]
        domain: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// List saved views
    List,

    /// Show a view's columns, filters and sort
    Show { id: String },

    /// Save a view
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Clause as field:operator:value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Sort as field[:asc|desc]
        #[arg(long)]
        sort: Option<String>,

        /// Built-in column to show (repeatable)
        #[arg(long)]
        show: Vec<String>,

        /// Built-in column to hide (repeatable)
        #[arg(long)]
        hide: Vec<String>,

        /// Custom field column to add (repeatable)
        #[arg(long)]
        custom: Vec<String>,

        /// Make this the default view
        #[arg(long)]
        default: bool,
    },

    /// Delete a view
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    List,

    Add {
        name: String,
        #[arg(long, default_value = "active")]
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show a client with its projects and onboarding progress
    Show { id: String },

    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// New notes; empty clears them
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a client with its projects and tasks
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    List {
        #[arg(long)]
        client: Option<String>,
    },

    Add {
        name: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },

    Show { id: String },

    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    List,

    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    Show { id: String },

    /// Add a task prototype to a template
    AddTask {
        template: String,
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(short, long, default_value_t = 3)]
        leverage: i64,
        #[arg(short, long, default_value_t = 3)]
        urgency: i64,
        #[arg(short, long, default_value_t = 3)]
        effort: i64,
    },

    /// Create the template's tasks for a client and start onboarding
    Apply { template: String, client: String },

    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainCommands {
    List,

    Add {
        name: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },

    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum InboxCommands {
    List {
        /// unread, read, actioned or archived
        #[arg(long)]
        status: Option<String>,
    },

    Add {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        sender: Option<String>,
        /// slack, email or manual
        #[arg(long, default_value = "manual")]
        source: String,
    },

    /// Set an item's status
    Mark { id: String, status: String },

    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FieldCommands {
    List,

    Add {
        name: String,
        /// Key stored on tasks; derived from the name when omitted
        #[arg(long)]
        key: Option<String>,
        /// text, number, select, date, checkbox or url
        #[arg(long = "type", default_value = "text")]
        field_type: String,
        /// Choice for select fields (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,
    },

    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    pub fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Loaded config plus the dataset backend for one command.
pub(crate) struct Context {
    pub config: Config,
    pub backend: FileBackend,
    pub output: OutputOptions,
}

impl Context {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let root = global.root()?;
        let config = Config::load_from_root(&root)?;
        let backend = FileBackend::from_config(&root, &config);
        Ok(Self {
            config,
            backend,
            output: global.output(),
        })
    }

    /// Full id for user input (exact id or unique prefix).
    pub fn resolve(&self, kind: RecordKind, input: &str) -> Result<String> {
        self.backend.read(|data| {
            let ids = data.ids(kind);
            resolve_id(kind, ids.iter().map(String::as_str), input)
        })
    }

    pub fn resolve_opt(&self, kind: RecordKind, input: Option<&str>) -> Result<Option<String>> {
        input.map(|input| self.resolve(kind, input)).transpose()
    }
}

/// Destructive commands need `--yes`.
pub(crate) fn confirm(yes: bool, action: impl Into<String>) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(Error::ConfirmationRequired(action.into()))
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Cli {
    fn global(&self) -> GlobalArgs {
        GlobalArgs {
            root: self.root.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Init => init::run(init::InitOptions { global }),
            Commands::Task(cmd) => match cmd {
                TaskCommands::List {
                    view,
                    no_view,
                    status,
                    domain,
                    client,
                    project,
                    search,
                    sort,
                    filters,
                } => task::run_list(task::ListOptions {
                    view,
                    no_view,
                    status,
                    domain,
                    client,
                    project,
                    search,
                    sort,
                    filters,
                    global,
                }),
                TaskCommands::Add {
                    title,
                    description,
                    client,
                    project,
                    domain,
                    leverage,
                    urgency,
                    effort,
                    status,
                    due,
                } => task::run_add(task::AddOptions {
                    title,
                    description,
                    client,
                    project,
                    domain,
                    leverage,
                    urgency,
                    effort,
                    status,
                    due,
                    global,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
                TaskCommands::Edit { id, field, value } => task::run_edit(task::EditOptions {
                    id,
                    field,
                    value,
                    global,
                }),
                TaskCommands::Update { id, patch } => {
                    task::run_update(task::UpdateOptions { id, patch, global })
                }
                TaskCommands::Status { id, status } => {
                    task::run_status(task::StatusOptions { id, status, global })
                }
                TaskCommands::Toggle { id } => task::run_toggle(task::ShowOptions { id, global }),
                TaskCommands::Delete { id, yes } => {
                    task::run_delete(task::DeleteOptions { id, yes, global })
                }
                TaskCommands::BulkStatus { status, ids } => {
                    task::run_bulk_status(task::BulkStatusOptions {
                        status,
                        ids,
                        global,
                    })
                }
                TaskCommands::BulkDelete { ids, yes } => {
                    task::run_bulk_delete(task::BulkDeleteOptions { ids, yes, global })
                }
                TaskCommands::Matrix { domain } => {
                    task::run_matrix(task::MatrixOptions { domain, global })
                }
            },
            Commands::View(cmd) => match cmd {
                ViewCommands::List => view::run_list(global),
                ViewCommands::Show { id } => view::run_show(id, global),
                ViewCommands::Create {
                    name,
                    description,
                    filters,
                    sort,
                    show,
                    hide,
                    custom,
                    default,
                } => view::run_create(view::CreateOptions {
                    name,
                    description,
                    filters,
                    sort,
                    show,
                    hide,
                    custom,
                    default,
                    global,
                }),
                ViewCommands::Delete { id, yes } => view::run_delete(id, yes, global),
            },
            Commands::Client(cmd) => match cmd {
                ClientCommands::List => client::run_list(global),
                ClientCommands::Add {
                    name,
                    status,
                    notes,
                } => client::run_add(client::AddOptions {
                    name,
                    status,
                    notes,
                    global,
                }),
                ClientCommands::Show { id } => client::run_show(id, global),
                ClientCommands::Edit {
                    id,
                    name,
                    status,
                    notes,
                } => client::run_edit(client::EditOptions {
                    id,
                    name,
                    status,
                    notes,
                    global,
                }),
                ClientCommands::Delete { id, yes } => client::run_delete(id, yes, global),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::List { client } => project::run_list(client, global),
                ProjectCommands::Add {
                    name,
                    client,
                    domain,
                    description,
                } => project::run_add(project::AddOptions {
                    name,
                    client,
                    domain,
                    description,
                    global,
                }),
                ProjectCommands::Show { id } => project::run_show(id, global),
                ProjectCommands::Delete { id, yes } => project::run_delete(id, yes, global),
            },
            Commands::Template(cmd) => match cmd {
                TemplateCommands::List => template::run_list(global),
                TemplateCommands::Add { name, description } => {
                    template::run_add(name, description, global)
                }
                TemplateCommands::Show { id } => template::run_show(id, global),
                TemplateCommands::AddTask {
                    template,
                    title,
                    description,
                    domain,
                    leverage,
                    urgency,
                    effort,
                } => template::run_add_task(template::AddTaskOptions {
                    template,
                    title,
                    description,
                    domain,
                    leverage,
                    urgency,
                    effort,
                    global,
                }),
                TemplateCommands::Apply { template, client } => {
                    template::run_apply(template, client, global)
                }
                TemplateCommands::Delete { id, yes } => template::run_delete(id, yes, global),
            },
            Commands::Domain(cmd) => match cmd {
                DomainCommands::List => domain::run_list(global),
                DomainCommands::Add {
                    name,
                    parent,
                    color,
                } => domain::run_add(name, parent, color, global),
                DomainCommands::Delete { id, yes } => domain::run_delete(id, yes, global),
            },
            Commands::Inbox(cmd) => match cmd {
                InboxCommands::List { status } => inbox::run_list(status, global),
                InboxCommands::Add {
                    subject,
                    content,
                    sender,
                    source,
                } => inbox::run_add(inbox::AddOptions {
                    subject,
                    content,
                    sender,
                    source,
                    global,
                }),
                InboxCommands::Mark { id, status } => inbox::run_mark(id, status, global),
                InboxCommands::Delete { id, yes } => inbox::run_delete(id, yes, global),
            },
            Commands::Field(cmd) => match cmd {
                FieldCommands::List => field::run_list(global),
                FieldCommands::Add {
                    name,
                    key,
                    field_type,
                    options,
                } => field::run_add(field::AddOptions {
                    name,
                    key,
                    field_type,
                    options,
                    global,
                }),
                FieldCommands::Delete { id, yes } => field::run_delete(id, yes, global),
            },
            Commands::Stats => stats::run(global),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_task_list_flags() {
        let cli = Cli::try_parse_from([
            "pos",
            "--json",
            "task",
            "list",
            "--status",
            "todo",
            "--filter",
            "leverage:gte:4",
            "--filter",
            "title:contains:report",
        ])
        .expect("parse");
        assert!(cli.json);
        match cli.command {
            Commands::Task(TaskCommands::List {
                status, filters, ..
            }) => {
                assert_eq!(status, "todo");
                assert_eq!(filters.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn confirm_requires_yes() {
        assert!(confirm(true, "delete task").is_ok());
        assert!(matches!(
            confirm(false, "delete task"),
            Err(Error::ConfirmationRequired(_))
        ));
    }
}
