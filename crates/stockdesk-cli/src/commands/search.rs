use serde::Serialize;
use stockdesk_core::{Dashboard, Instrument, ProviderId};

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SearchResponseData {
    query: String,
    source: ProviderId,
    results: Vec<Instrument>,
}

pub async fn run(args: &SearchArgs, dashboard: &Dashboard) -> Result<CommandResult, CliError> {
    if args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }

    let query = args.query.trim();
    let lookup = dashboard.search(query, args.limit).await;

    let data = serde_json::to_value(SearchResponseData {
        query: query.to_owned(),
        source: lookup.source,
        results: lookup.instruments,
    })?;
    Ok(CommandResult::ok(data, vec![lookup.source])
        .with_warnings(lookup.warnings)
        .with_cache_hit(lookup.cache_hit))
}
