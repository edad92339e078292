use crate::cli::ShowArgs;
use crate::error::CliError;
use assay_client::AnalysisService;
use assay_core::model::AnalysisStatus;
use colored::{ColoredString, Colorize};

fn colored_status(status: AnalysisStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        AnalysisStatus::Succeeded => label.green(),
        AnalysisStatus::Failed => label.red(),
        AnalysisStatus::Failing | AnalysisStatus::Canceling => label.yellow(),
        AnalysisStatus::Running => label.cyan(),
        _ => label.normal(),
    }
}

pub async fn handle_show(args: ShowArgs, service: &AnalysisService) -> Result<(), CliError> {
    let analysis = service.get_analysis(&args.analysis_id.into()).await?;

    println!("Analysis: {}", analysis.id);
    if !analysis.description.is_empty() {
        println!("Description: {}", analysis.description);
    }
    println!("Status: {}", colored_status(analysis.status));
    println!(
        "Created: {} by {}",
        analysis.created_at.format("%Y-%m-%d %H:%M:%S"),
        analysis.created_by
    );
    if let Some(updated_at) = analysis.updated_at {
        println!("Updated: {}", updated_at.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(pipeline_id) = &analysis.pipeline_id {
        println!("Pipeline: {}", pipeline_id);
    }
    if let Some(datasets) = &analysis.datasets {
        println!("Datasets:");
        for (label, id) in datasets {
            println!("  {} -> {}", label, id);
        }
    }
    if let Some(error) = &analysis.error {
        println!("Error: {}", error.red());
    }

    let job_ids = analysis.job_ids.unwrap_or_default();
    let statuses = analysis.jobs.unwrap_or_default();
    if !job_ids.is_empty() {
        println!("Jobs:");
        for (index, job_id) in job_ids.iter().enumerate() {
            let status = statuses.get(index).map(String::as_str).unwrap_or("unknown");
            println!("  {}. {} [{}]", index, job_id, status);
        }
    }
    Ok(())
}
