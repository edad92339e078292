pub mod cli;
pub mod commands;
pub mod error;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use assay_client::AnalysisService;
use assay_core::config::{self, Config};

pub fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    })
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

pub fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    match cli.command {
        Commands::Invoke(args) => {
            let service = AnalysisService::local(config);
            runtime()?.block_on(commands::invoke::handle_invoke(args, &service))
        }
        Commands::Show(args) => {
            let service = AnalysisService::local(config);
            runtime()?.block_on(commands::show::handle_show(args, &service))
        }
        Commands::SetJobStatus(args) => {
            commands::set_job_status::handle_set_job_status(args, &config)
        }
    }
}
