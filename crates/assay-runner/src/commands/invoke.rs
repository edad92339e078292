use crate::cli::{Handler, InvokeArgs};
use crate::error::CliError;
use assay_client::AnalysisService;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

pub fn read_event(path: &Path) -> Result<String, CliError> {
    if path == Path::new("-") {
        let mut event = String::new();
        std::io::stdin().read_to_string(&mut event)?;
        Ok(event)
    } else {
        Ok(fs_err::read_to_string(path)?)
    }
}

fn parse<T: DeserializeOwned>(event: &str) -> Result<T, CliError> {
    serde_json::from_str(event).map_err(CliError::InvalidEvent)
}

fn encode<T: Serialize>(value: T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(CliError::Output)
}

pub async fn dispatch(
    handler: Handler,
    event: &str,
    service: &AnalysisService,
) -> Result<Value, CliError> {
    tracing::debug!("Invoking {:?}", handler);
    match handler {
        Handler::DefineJobs => encode(service.define_jobs(&parse(event)?).await?),
        Handler::SubmitJobs => encode(service.submit_jobs(&parse(event)?).await?),
        Handler::DescribeJobs => encode(service.describe_jobs(&parse(event)?).await?),
        Handler::CheckJobsUpdated => encode(service.check_jobs_updated(&parse(event)?)?),
        Handler::CalculateStatus => encode(service.calculate_status(&parse(event)?)?),
        Handler::UpdateStatus => encode(service.update_status(&parse(event)?).await?),
        Handler::RecordJobs => encode(service.record_jobs(&parse(event)?).await?),
        Handler::PollAnalysis => encode(service.poll_analysis(&parse(event)?).await?),
        Handler::SubmitAnalysis => encode(service.submit_analysis(&parse(event)?).await?),
        Handler::CancelAnalysis => encode(service.cancel_analysis(&parse(event)?).await?),
        Handler::TerminateJobs => encode(service.terminate_jobs(&parse(event)?).await?),
        Handler::CreateAnalysis => encode(service.create_analysis(&parse(event)?).await?),
        Handler::PutPipeline => encode(service.put_pipeline(&parse(event)?).await?),
    }
}

pub async fn handle_invoke(args: InvokeArgs, service: &AnalysisService) -> Result<(), CliError> {
    let event = read_event(&args.event)?;
    let result = dispatch(args.handler, &event, service).await?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .map_err(CliError::Output)?;
    println!("{}", rendered);
    Ok(())
}
