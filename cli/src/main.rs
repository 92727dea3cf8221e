//! saro-deploy - deployment orchestrator for the SARO education management system

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use saro_deploy::cli::Cli;
use saro_deploy::domain::error::{ConfigError, DeployError};
use saro_deploy::output::{OutputContext, json};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (json_mode, no_color) = (cli.json, cli.no_color);
    if let Err(e) = cli.run().await {
        let (code, exit_code) = classify(&e);
        let message = format!("{e:#}");
        match json_mode
            .then(|| json::format_error(&message, code, exit_code))
            .and_then(Result::ok)
        {
            Some(text) => println!("{text}"),
            None => OutputContext::new(no_color, false).error(&message),
        }
        std::process::exit(exit_code);
    }
}

/// JSON error code and process exit code for a failed command.
fn classify(e: &anyhow::Error) -> (&'static str, i32) {
    for cause in e.chain() {
        if let Some(deploy) = cause.downcast_ref::<DeployError>() {
            return (deploy.code(), deploy.exit_code());
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ("invalid_config", 1);
        }
    }
    ("error", 1)
}
