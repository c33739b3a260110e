//! Top-level parser and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hyrule_node_core::{
    args::{LogArgs, StartArgs},
    constants::DEFAULT_CONFIG_FILE,
};

use crate::commands;

/// Hyrule - peer-to-peer repository storage node
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Logging configuration.
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Run a storage node.
    Start(StartCommand),

    /// Write a configuration file with every default filled in.
    Init(InitCommand),

    /// Print the status of a running node.
    Status(QueryArgs),

    /// List the repositories a running node stores.
    Repos(QueryArgs),
}

#[derive(Debug, Args)]
pub(crate) struct StartCommand {
    /// Configuration file. Missing files fall back to defaults.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub(crate) config: PathBuf,

    #[command(flatten)]
    pub(crate) args: StartArgs,
}

#[derive(Debug, Args)]
pub(crate) struct InitCommand {
    /// Where to write the configuration.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub(crate) output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub(crate) force: bool,
}

#[derive(Debug, Args)]
pub(crate) struct QueryArgs {
    /// Base URL of the node's HTTP API.
    #[arg(long, value_name = "URL", env = "HYRULE_NODE", default_value = "http://127.0.0.1:8080")]
    pub(crate) node: String,
}

/// Parse the command line and run the selected command.
pub(crate) async fn run() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Start(command) => commands::start::run(&cli.logs, command).await,
        Commands::Init(command) => commands::init::run(command),
        Commands::Status(args) => commands::query::status(&args).await,
        Commands::Repos(args) => commands::query::repos(&args).await,
    }
}
