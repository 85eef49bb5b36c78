//! Mentora CLI
//!
//! Browse and buy courses, read assignments, move media through IPFS and talk
//! to the review agent from the terminal.

mod commands;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::storage::{FormatArg, KindArg};
use mentora_client::{ClientConfig, Difficulty, MentoraContext, NetworkPreset};

#[derive(Parser, Debug)]
#[command(name = "mentora")]
#[command(about = "Mentora course marketplace client", version)]
struct Cli {
    /// Config file (defaults to <config dir>/mentora/config.toml)
    #[arg(short, long, global = true, env = "MENTORA_CONFIG")]
    config: Option<PathBuf>,

    /// Network preset key or chain id
    #[arg(long, global = true)]
    network: Option<String>,

    /// JSON-RPC endpoint override
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show one course
    Course {
        id: u64,
        #[arg(long)]
        json: bool,
    },

    /// List all courses
    Courses {
        #[arg(long)]
        json: bool,
    },

    /// Buy a course with the configured account
    Purchase {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Wait for the transaction to be mined
        #[arg(long)]
        wait: bool,
    },

    /// Upload a course's media and create it on-chain
    Publish {
        /// Course description (TOML); media paths are relative to it
        course_file: PathBuf,
        #[arg(short, long)]
        yes: bool,
        #[arg(long)]
        wait: bool,
    },

    /// List all assignments
    Assignments {
        #[arg(long)]
        json: bool,
    },

    /// Show one assignment with its checkpoints
    Assignment {
        id: u64,
        #[arg(long)]
        json: bool,
    },

    /// Upload a file to IPFS
    Upload {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = KindArg::File)]
        kind: KindArg,
    },

    /// Upload a JSON document to IPFS
    UploadJson { path: PathBuf },

    /// Fetch content by hash
    Retrieve {
        hash: String,
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print gateway URLs for a hash
    Url { hash: String },

    /// Submit work to the review agent and stream its replies
    Chat {
        /// Message or text containing a GitHub repository URL
        message: String,
        /// Submit the repository against this assignment
        #[arg(short, long)]
        assignment: Option<u64>,
        /// Keep listening after the first response
        #[arg(short, long)]
        follow: bool,
    },

    /// Draft an assignment for a topic, optionally grading a solution
    Generate {
        topic: String,
        #[arg(short, long, default_value = "beginner")]
        difficulty: Difficulty,
        /// Solution file to grade against the drafted assignment
        #[arg(short, long)]
        solution: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Split a project description into steps
    Breakdown {
        project: String,
        #[arg(long)]
        json: bool,
    },

    /// List network presets
    Networks,

    /// Config file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite without asking
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("mentora_client={level}").parse()?)
                .add_directive("warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::resolve(cli.config.as_deref())?;
    if let Some(key) = &cli.network {
        let preset = NetworkPreset::by_key(key)
            .ok_or_else(|| anyhow::anyhow!("Unknown network '{key}'"))?;
        config.network = preset.into();
    }
    if let Some(url) = &cli.rpc_url {
        config.network.rpc_url = url.clone();
    }
    debug!(network = %config.network.name, rpc = %config.network.rpc_url, "Config resolved");
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(cli).await {
        style::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config {
        action: ConfigAction::Init { force },
    } = &cli.command
    {
        return commands::config::init(cli.config.as_deref(), cli.network.as_deref(), *force);
    }

    let config = load_config(&cli)?;
    match &cli.command {
        Commands::Config {
            action: ConfigAction::Show,
        } => return commands::config::show(&config),
        Commands::Networks => {
            commands::config::networks(&config);
            return Ok(());
        }
        _ => {}
    }

    let ctx = MentoraContext::new(config)?;
    match cli.command {
        Commands::Course { id, json } => commands::courses::show(&ctx, id, json).await,
        Commands::Courses { json } => commands::courses::list(&ctx, json).await,
        Commands::Purchase { id, yes, wait } => {
            commands::courses::purchase(&ctx, id, yes, wait).await
        }
        Commands::Publish {
            course_file,
            yes,
            wait,
        } => commands::courses::publish(&ctx, &course_file, yes, wait).await,
        Commands::Assignments { json } => commands::assignments::list(&ctx, json).await,
        Commands::Assignment { id, json } => commands::assignments::show(&ctx, id, json).await,
        Commands::Upload { path, kind } => commands::storage::upload(&ctx, &path, kind).await,
        Commands::UploadJson { path } => commands::storage::upload_json(&ctx, &path).await,
        Commands::Retrieve {
            hash,
            format,
            output,
        } => commands::storage::retrieve(&ctx, &hash, format, output).await,
        Commands::Url { hash } => commands::storage::url(&ctx, &hash),
        Commands::Chat {
            message,
            assignment,
            follow,
        } => commands::chat::run(&ctx, &message, assignment, follow).await,
        Commands::Generate {
            topic,
            difficulty,
            solution,
            json,
        } => {
            commands::review::generate(&ctx, &topic, difficulty, solution.as_deref(), json).await
        }
        Commands::Breakdown { project, json } => {
            commands::review::breakdown(&ctx, &project, json).await
        }
        Commands::Networks | Commands::Config { .. } => Ok(()),
    }
}
