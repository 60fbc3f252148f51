//! `genvid` - submit video generation jobs from the command line.

mod cli;
mod commands;
mod config;

use std::process::ExitCode;

use clap::Parser;
use genvid_core::command::CommandOptions;
use genvid_remote::error::LifecycleError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    config::load_env_files();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genvid=info,genvid_remote=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Lifecycle errors already lead with their category.
            match e.downcast_ref::<LifecycleError>() {
                Some(lifecycle) => eprintln!("{lifecycle}"),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate { params, out } => {
            commands::generate(&cli.remote, &params.to_request(), &out).await
        }
        Commands::Status { job_id } => commands::status(&cli.remote, &job_id).await,
        Commands::Health => commands::health(&cli.remote).await,
        Commands::Command {
            params,
            python,
            ckpt_root,
            gpus,
        } => {
            let options = CommandOptions {
                python,
                ckpt_root,
                gpus,
                ..Default::default()
            };
            commands::print_command(&params.to_request(), &options)
        }
    }
}
