mod config;
mod group_cmds;
mod output;
mod preset_cmds;
mod prompt_cmds;
mod render_cmd;
mod target;
#[cfg(test)]
mod test_util;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser, Subcommand};

use promptset_core::{SessionCoordinator, StoreConfig};

use output::{OperationFailed, Printer};
use target::Target;

#[derive(Parser)]
#[command(
    name = "promptset",
    version,
    about = "Manage preset prompts and prepend the active ones to LLM requests"
)]
struct Cli {
    /// Data directory (overrides PROMPTSET_DATA_DIR and the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print outcomes and views as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a promptset config file pointing at the data directory
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// List presets
    Presets,
    /// Switch to the preset at INDEX (see `presets`)
    Use {
        index: usize,
    },
    /// Create an empty preset and switch to it
    CreatePreset {
        name: String,
    },
    /// Re-extract raw preset files and reload every preset
    Refresh,
    /// List prompts in the current preset
    List,
    /// Activate prompts: INDEX, I,J,K or @GROUP
    Activate {
        target: Target,
    },
    /// Deactivate prompts: ACTIVE_INDEX, I,J,K, @GROUP or all
    Deactivate {
        target: Target,
    },
    /// Show prompt content, the prefix, a group or the active list
    View {
        #[command(subcommand)]
        command: ViewCommands,
    },
    /// Add a user prompt to the current preset
    Add {
        name: String,
        /// Prompt text; read from stdin when omitted or `-`
        content: Option<String>,
    },
    /// Replace a user prompt's name and content
    Edit {
        index: usize,
        name: String,
        /// Prompt text; read from stdin when omitted or `-`
        content: Option<String>,
    },
    /// Delete a user prompt
    Delete {
        index: usize,
    },
    /// Prompt group management
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Print the system/user text an LLM request would be sent with
    Render {
        /// Original system prompt
        #[arg(long, default_value = "")]
        system: String,
        /// Original user prompt
        #[arg(long, default_value = "")]
        user: String,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ViewCommands {
    /// Show the prompt at INDEX
    Prompt { index: usize },
    /// Show the current preset's prefix
    Prefix,
    /// Show the members of a group
    Group { name: String },
    /// Show active prompts with their active-list indices
    Active,
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// List groups in the current preset
    List,
    /// Create a group from a comma-separated index list
    Create { name: String, indices: String },
    /// Replace a group's indices
    Update { name: String, indices: String },
    /// Delete a group
    Delete { name: String },
}

/// Execute `promptset init`: write the config file.
fn cmd_init(data_dir: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let data_dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => StoreConfig::default_data_dir(),
    };
    let store = StoreConfig::new(&data_dir);
    std::fs::create_dir_all(store.presets_dir()).with_context(|| {
        format!("failed to create presets directory {}", store.presets_dir().display())
    })?;

    let cfg = config::ConfigFile {
        storage: config::StorageSection {
            data_dir: data_dir.clone(),
        },
    };
    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  storage.data_dir = {}", data_dir.display());
    println!();
    println!(
        "Next: copy preset files into {} and run `promptset refresh`.",
        store.presets_dir().display()
    );
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let printer = Printer::new(cli.json);

    let command = match cli.command {
        Commands::Init { force } => return cmd_init(cli.data_dir.as_deref(), force),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "promptset", &mut std::io::stdout());
            return Ok(());
        }
        other => other,
    };

    let store_config = config::resolve(cli.data_dir.as_deref());
    let mut session = SessionCoordinator::open(&store_config).with_context(|| {
        format!("failed to open data directory {}", store_config.data_dir().display())
    })?;

    let result = match command {
        Commands::Presets => preset_cmds::cmd_presets(&session, printer),
        Commands::Use { index } => preset_cmds::cmd_use(&mut session, printer, index),
        Commands::CreatePreset { name } => preset_cmds::cmd_create(&mut session, printer, &name),
        Commands::Refresh => preset_cmds::cmd_refresh(&mut session, printer),
        Commands::List => prompt_cmds::cmd_list(&session, printer),
        Commands::Activate { target } => prompt_cmds::cmd_activate(&mut session, printer, target),
        Commands::Deactivate { target } => {
            prompt_cmds::cmd_deactivate(&mut session, printer, target)
        }
        Commands::View { command } => prompt_cmds::run_view_command(command, &session, printer),
        Commands::Add { name, content } => {
            prompt_cmds::cmd_add(&mut session, printer, &name, content)
        }
        Commands::Edit {
            index,
            name,
            content,
        } => prompt_cmds::cmd_edit(&mut session, printer, index, &name, content),
        Commands::Delete { index } => prompt_cmds::cmd_delete(&mut session, printer, index),
        Commands::Group { command } => group_cmds::run_group_command(command, &mut session, printer),
        Commands::Render { system, user } => {
            render_cmd::cmd_render(&session, printer, &system, &user)
        }
        Commands::Init { .. } | Commands::Completions { .. } => Ok(()),
    };

    session.terminate();
    result
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let code = match e.downcast_ref::<OperationFailed>() {
            Some(failed) => {
                if !failed.reported {
                    eprintln!("error: {e:#}");
                }
                failed.exit_code()
            }
            None => {
                eprintln!("error: {e:#}");
                1
            }
        };
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_activate_targets() {
        let cli = Cli::parse_from(["promptset", "activate", "@focus"]);
        assert!(matches!(cli.command, Commands::Activate { target: Target::Group(ref g) } if g == "focus"));

        let cli = Cli::parse_from(["promptset", "--json", "deactivate", "all"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Deactivate { target: Target::All }));
    }

    #[test]
    fn rejects_malformed_target() {
        assert!(Cli::try_parse_from(["promptset", "activate", "1,x"]).is_err());
    }

    #[test]
    fn global_data_dir_after_subcommand() {
        let cli = Cli::parse_from(["promptset", "list", "--data-dir", "/tmp/ps"]);
        assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/tmp/ps")));
    }

    #[test]
    fn group_create_takes_raw_index_list() {
        let cli = Cli::parse_from(["promptset", "group", "create", "pair", "0,2"]);
        match cli.command {
            Commands::Group {
                command: GroupCommands::Create { name, indices },
            } => {
                assert_eq!(name, "pair");
                assert_eq!(indices, "0,2");
            }
            _ => panic!("expected group create"),
        }
    }
}
