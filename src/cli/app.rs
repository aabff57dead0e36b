//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{decision, project, query};
use crate::domain::{DecisionType, ProjectId};
use crate::storage::{Config, Workspace};

#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about = "Decision layering and timelines for investigation projects")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project to work on (defaults to the workspace's default project)
    #[arg(long, global = true, env = "STRATA_PROJECT")]
    pub project: Option<ProjectId>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new strata workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage projects
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Manage decisions
    #[command(subcommand)]
    Decision(decision::DecisionCommands),

    /// Show the layer thread of one decision type
    Timeline {
        /// Decision type (focus, scope, configuration)
        #[arg(value_name = "TYPE")]
        decision_type: Option<DecisionType>,
    },

    /// Show the latest layer of one type, or of every type
    Latest {
        /// Decision type (focus, scope, configuration)
        #[arg(value_name = "TYPE")]
        decision_type: Option<DecisionType>,
    },

    /// Show decision counts
    Stats {
        /// Only count decisions of this type
        #[arg(long = "type", value_name = "TYPE")]
        decision_type: Option<DecisionType>,
    },

    /// Show layer limits and what is left of them
    Limits,

    /// Check stored decisions for broken links, cycles and timestamp ties
    Check,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format,
    };
    let output = Output::new(format, cli.verbose);
    init_tracing(output.is_verbose());

    output.verbose("Strata CLI starting");
    let project = cli.project.as_ref();

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing workspace at: {}", path));
            let workspace = Workspace::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .strata directory at: {}", workspace.strata_dir().display()),
            );
            output.success(&format!(
                "Initialized strata workspace at {}",
                workspace.root().display()
            ));
        }

        Commands::Project(cmd) => project::run(cmd, &output)?,
        Commands::Decision(cmd) => decision::run(cmd, &output, project)?,

        Commands::Timeline { decision_type } => {
            output.verbose_ctx("timeline", &format!("Type filter: {:?}", decision_type));
            query::timeline(&output, project, decision_type)?
        }
        Commands::Latest { decision_type } => {
            output.verbose_ctx("latest", &format!("Type filter: {:?}", decision_type));
            query::latest(&output, project, decision_type)?
        }
        Commands::Stats { decision_type } => query::stats(&output, project, decision_type)?,
        Commands::Limits => query::limits(&output, project)?,
        Commands::Check => query::check(&output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Logs go to stderr. `STRATA_LOG` takes an env-filter directive and wins
/// over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "strata_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("STRATA_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
