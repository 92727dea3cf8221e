//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Deploy the SARO education management system onto this host
#[derive(Parser)]
#[command(
    name = "saro-deploy",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Deployment config file (YAML); falls back to $SARO_DEPLOY_CONFIG,
    /// ./saro-deploy.yaml, then the user config directory
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Halt, update, provision and restart the application
    Deploy(commands::deploy::DeployArgs),

    /// Show what a deploy would do without changing anything
    Plan,

    /// Print the supervision unit the next deploy would write
    Unit,

    /// Show service status
    Status,

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            config,
            json,
            quiet,
            no_color,
            command,
        } = self;

        if let Command::Version = command {
            return commands::version::run(json);
        }

        let app = AppContext::new(AppFlags {
            config,
            no_color,
            quiet,
            json,
        })?;
        match command {
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::Plan => commands::plan::run(&app),
            Command::Unit => commands::unit::run(&app),
            Command::Status => commands::status::run(&app).await,
            Command::Version => commands::version::run(json),
        }
    }
}
