use stockdesk_core::{Dashboard, InstrumentCode};

use crate::cli::FinancialsArgs;
use crate::error::CliError;

use super::{section_error, CommandResult};

pub async fn run(args: &FinancialsArgs, dashboard: &Dashboard) -> Result<CommandResult, CliError> {
    let code = InstrumentCode::parse(&args.code)?;
    let view = dashboard.financials(&code).await;

    let market = dashboard.market_source();
    let warnings = view.status.warning("financials").into_iter().collect();
    let errors = section_error("financials", &view.status, market)
        .into_iter()
        .collect();

    Ok(CommandResult::ok(serde_json::to_value(&view)?, vec![market])
        .with_warnings(warnings)
        .with_errors(errors))
}
