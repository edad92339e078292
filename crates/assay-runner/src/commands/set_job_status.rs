use crate::cli::SetJobStatusArgs;
use crate::error::CliError;
use assay_core::{config::Config, model::JobStatus};
use assay_executor::LocalBatchService;
use colored::Colorize;

pub fn handle_set_job_status(args: SetJobStatusArgs, config: &Config) -> Result<(), CliError> {
    let status: JobStatus = args
        .status
        .to_uppercase()
        .parse()
        .map_err(|e: assay_core::model::ParseJobStatusError| {
            CliError::InvalidArgument(e.to_string())
        })?;
    let reason = args.reason.filter(|_| status == JobStatus::Failed);

    LocalBatchService::new(&config.state_dir).set_job_status(&args.job_id, status, reason)?;
    println!(
        "{} Job '{}' is now {}",
        "[OK]".green(),
        args.job_id,
        status
    );
    Ok(())
}
