use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::fetch_body;
use crate::config::SourcesConfig;
use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, FetchResult, Fetched, PriceHistoryRequest, SourceError,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{
    DisclosureEntry, FinancialStatementTable, Instrument, InstrumentCode, PriceSeries, ProviderId,
};

/// Exchange listing connector.
#[derive(Clone)]
pub struct KrxAdapter {
    http_client: Arc<dyn HttpClient>,
    sources: SourcesConfig,
}

impl KrxAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, sources: SourcesConfig) -> Self {
        Self {
            http_client,
            sources,
        }
    }

    async fn fetch_listing(&self) -> FetchResult<Vec<Instrument>> {
        let request = HttpRequest::post(self.sources.listing_url.as_str())
            .with_header("referer", self.sources.listing_referer.as_str())
            .with_header("accept", "application/json, text/javascript, */*; q=0.01")
            .with_form_body(self.sources.listing_form.as_str());

        let body = fetch_body(self.http_client.as_ref(), request, self.sources.timeout()).await?;
        parse_listing(&body)
    }
}

impl DataSource for KrxAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Krx
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, false, false, false)
    }

    fn listing<'a>(&'a self) -> SourceFuture<'a, Vec<Instrument>> {
        Box::pin(async move { self.fetch_listing().await })
    }

    fn price_history<'a>(&'a self, _req: PriceHistoryRequest) -> SourceFuture<'a, PriceSeries> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::PriceHistory)) })
    }

    fn statements<'a>(
        &'a self,
        _code: &'a InstrumentCode,
    ) -> SourceFuture<'a, FinancialStatementTable> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Statements)) })
    }

    fn disclosures<'a>(
        &'a self,
        _code: &'a InstrumentCode,
    ) -> SourceFuture<'a, Vec<DisclosureEntry>> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Disclosures)) })
    }
}

#[derive(Debug, Deserialize)]
struct KrxListingResponse {
    #[serde(rename = "OutBlock_1")]
    out_block: Option<Vec<KrxListingRow>>,
}

#[derive(Debug, Deserialize)]
struct KrxListingRow {
    #[serde(rename = "ISU_SRT_CD", default)]
    short_code: String,
    #[serde(rename = "ISU_ABBRV", default)]
    abbreviation: String,
    #[serde(rename = "MKT_TP_NM", default)]
    market: Option<String>,
}

pub(crate) fn parse_listing(body: &str) -> FetchResult<Vec<Instrument>> {
    let response: KrxListingResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::decode(format!("failed to parse listing payload: {e}")))?;

    let rows = response
        .out_block
        .ok_or_else(|| SourceError::schema("listing payload has no OutBlock_1 array"))?;

    let total = rows.len();
    let instruments = rows
        .into_iter()
        .filter_map(|row| {
            let code = InstrumentCode::parse(&row.short_code).ok()?;
            let name = row.abbreviation.trim();
            if name.is_empty() {
                return None;
            }
            let market = row
                .market
                .map(|m| m.trim().to_owned())
                .filter(|m| !m.is_empty());
            Some(Instrument::new(code, name, market))
        })
        .collect::<Vec<_>>();

    if instruments.len() < total {
        debug!(
            skipped = total - instruments.len(),
            "dropped listing rows without code or name"
        );
    }

    Ok(Fetched::from_rows(instruments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{FixtureHttpClient, HttpMethod};

    const LISTING: &str = r#"{
        "OutBlock_1": [
            {"ISU_SRT_CD": "005930", "ISU_ABBRV": "삼성전자", "MKT_TP_NM": "KOSPI"},
            {"ISU_SRT_CD": "035720", "ISU_ABBRV": "카카오", "MKT_TP_NM": "KOSPI"},
            {"ISU_SRT_CD": "", "ISU_ABBRV": "broken"},
            {"ISU_SRT_CD": "247540", "ISU_ABBRV": "에코프로비엠", "MKT_TP_NM": "KOSDAQ"}
        ],
        "CURRENT_DATETIME": "2024.03.04 PM 05:00:00"
    }"#;

    #[test]
    fn parses_listing_rows() {
        let instruments = parse_listing(LISTING).expect("parse").data().expect("data");
        assert_eq!(instruments.len(), 3);
        assert_eq!(instruments[0].label(), "삼성전자 (005930)");
        assert_eq!(instruments[2].market.as_deref(), Some("KOSDAQ"));
    }

    #[test]
    fn listing_shape_errors_are_classified() {
        let schema = parse_listing(r#"{"output": []}"#).expect_err("schema");
        assert_eq!(schema.kind(), SourceErrorKind::Schema);

        let decode = parse_listing("<html>blocked</html>").expect_err("decode");
        assert_eq!(decode.kind(), SourceErrorKind::Decode);

        assert_eq!(parse_listing(r#"{"OutBlock_1": []}"#).expect("parse"), Fetched::Empty);
    }

    #[tokio::test]
    async fn listing_is_a_form_post_with_referer() {
        let client = Arc::new(FixtureHttpClient::new().respond("getJsonData.cmd", LISTING));
        let adapter = KrxAdapter::new(client.clone(), SourcesConfig::default());

        let outcome = adapter.listing().await.expect("listing");
        assert!(outcome.is_data());

        let sent = &client.recorded_requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert!(sent.headers.contains_key("referer"));
        assert!(sent
            .body
            .as_deref()
            .is_some_and(|body| body.contains("mktId=ALL")));
    }
}
