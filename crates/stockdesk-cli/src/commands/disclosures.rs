use stockdesk_core::{Dashboard, InstrumentCode};

use crate::cli::DisclosuresArgs;
use crate::error::CliError;

use super::{section_error, CommandResult};

pub async fn run(
    args: &DisclosuresArgs,
    dashboard: &Dashboard,
) -> Result<CommandResult, CliError> {
    let limit = args
        .limit
        .unwrap_or(dashboard.config().report.disclosure_limit);
    if limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }

    let code = InstrumentCode::parse(&args.code)?;
    let view = dashboard.disclosures(&code, limit).await;

    let market = dashboard.market_source();
    let warnings = view.status.warning("disclosures").into_iter().collect();
    let errors = section_error("disclosures", &view.status, market)
        .into_iter()
        .collect();

    Ok(CommandResult::ok(serde_json::to_value(&view)?, vec![market])
        .with_warnings(warnings)
        .with_errors(errors))
}
