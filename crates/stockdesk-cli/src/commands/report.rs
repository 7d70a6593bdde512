use std::path::PathBuf;

use serde::Serialize;
use stockdesk_core::{Dashboard, DashboardReport};
use tracing::info;

use crate::cli::ReportArgs;
use crate::error::CliError;
use crate::export;

use super::{section_error, selection, start_date, CommandResult};

#[derive(Debug, Serialize)]
struct ReportResponseData<'a> {
    #[serde(flatten)]
    report: &'a DashboardReport,
    export_path: String,
}

pub async fn run(args: &ReportArgs, dashboard: &Dashboard) -> Result<CommandResult, CliError> {
    let selection = selection(&args.instrument)?;
    let start = start_date(args.start.as_deref(), dashboard.config())?;

    let report = dashboard.report(&selection, args.granularity, start).await;

    let path = args.out.clone().unwrap_or_else(|| {
        PathBuf::from(dashboard.config().report.file_name(&report.instrument.code))
    });
    export::write_report(&report, &path)?;
    info!(code = %report.instrument.code, path = %path.display(), "spreadsheet written");

    let market = dashboard.market_source();
    let errors = report
        .sections()
        .iter()
        .filter_map(|(section, status)| section_error(section, status, market))
        .collect();

    let data = serde_json::to_value(ReportResponseData {
        report: &report,
        export_path: path.display().to_string(),
    })?;

    Ok(CommandResult::ok(data, report.source_chain.clone())
        .with_warnings(report.warnings.clone())
        .with_errors(errors)
        .with_cache_hit(report.cache_hit))
}
