use serde::Serialize;
use stockdesk_core::{ChartView, Dashboard, Instrument, ResolvedBy};

use crate::cli::ChartArgs;
use crate::error::CliError;

use super::{section_error, selection, source_chain, start_date, CommandResult};

#[derive(Debug, Serialize)]
struct ChartResponseData {
    instrument: Instrument,
    resolved_by: ResolvedBy,
    chart: ChartView,
}

pub async fn run(args: &ChartArgs, dashboard: &Dashboard) -> Result<CommandResult, CliError> {
    let selection = selection(&args.instrument)?;
    let start = start_date(args.start.as_deref(), dashboard.config())?;

    let resolution = dashboard.resolve(&selection).await;
    let chart = dashboard
        .chart(&resolution.instrument.code, args.granularity, start)
        .await;

    let market = dashboard.market_source();
    let mut warnings = resolution.warnings;
    warnings.extend(chart.status.warning("prices"));
    let errors = section_error("prices", &chart.status, market)
        .into_iter()
        .collect();

    let chain = source_chain(resolution.source, market);
    let data = serde_json::to_value(ChartResponseData {
        instrument: resolution.instrument,
        resolved_by: resolution.resolved_by,
        chart,
    })?;

    Ok(CommandResult::ok(data, chain)
        .with_warnings(warnings)
        .with_errors(errors)
        .with_cache_hit(resolution.cache_hit))
}
