use std::sync::Arc;

use tracing::debug;

use super::html::{elements, parse_number, Element};
use super::{expand_template, fetch_body, validation_to_error};
use crate::config::SourcesConfig;
use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, FetchResult, Fetched, PriceHistoryRequest, SourceError,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalize::ordered_unique;
use crate::{
    DisclosureEntry, FinancialStatementTable, Granularity, Instrument, InstrumentCode, MarketDate,
    PriceBar, PriceSeries, ProviderId, StatementRow,
};

/// Chart feed and finance portal connector.
#[derive(Clone)]
pub struct NaverAdapter {
    http_client: Arc<dyn HttpClient>,
    sources: SourcesConfig,
}

impl NaverAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, sources: SourcesConfig) -> Self {
        Self {
            http_client,
            sources,
        }
    }

    fn portal_request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url).with_default_charset(self.sources.portal_charset.as_str())
    }

    async fn fetch_price_history(&self, req: PriceHistoryRequest) -> FetchResult<PriceSeries> {
        let count = req.span_days().to_string();
        let url = expand_template(
            &self.sources.chart_url,
            &[("code", req.code.as_str()), ("count", count.as_str())],
        );
        let body = fetch_body(
            self.http_client.as_ref(),
            self.portal_request(url),
            self.sources.timeout(),
        )
        .await?;
        parse_chart(&body, &req)
    }

    async fn fetch_statements(&self, code: &InstrumentCode) -> FetchResult<FinancialStatementTable> {
        let url = expand_template(&self.sources.statements_url, &[("code", code.as_str())]);
        let body = fetch_body(
            self.http_client.as_ref(),
            self.portal_request(url),
            self.sources.timeout(),
        )
        .await?;
        parse_statements(&body, self.sources.statements_table_index)
    }

    async fn fetch_disclosures(&self, code: &InstrumentCode) -> FetchResult<Vec<DisclosureEntry>> {
        let url = expand_template(&self.sources.disclosures_url, &[("code", code.as_str())]);
        let body = fetch_body(
            self.http_client.as_ref(),
            self.portal_request(url),
            self.sources.timeout(),
        )
        .await?;
        parse_disclosures(&body)
    }
}

impl DataSource for NaverAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Naver
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(false, true, true, true)
    }

    fn listing<'a>(&'a self) -> SourceFuture<'a, Vec<Instrument>> {
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Listing)) })
    }

    fn price_history<'a>(&'a self, req: PriceHistoryRequest) -> SourceFuture<'a, PriceSeries> {
        Box::pin(async move { self.fetch_price_history(req).await })
    }

    fn statements<'a>(
        &'a self,
        code: &'a InstrumentCode,
    ) -> SourceFuture<'a, FinancialStatementTable> {
        Box::pin(async move { self.fetch_statements(code).await })
    }

    fn disclosures<'a>(
        &'a self,
        code: &'a InstrumentCode,
    ) -> SourceFuture<'a, Vec<DisclosureEntry>> {
        Box::pin(async move { self.fetch_disclosures(code).await })
    }
}

/// Parse `<item data="YYYYMMDD|open|high|low|close|volume"/>` rows.
///
/// Rows outside `[req.start, req.end]` are dropped, as are rows that fail to
/// parse. Output is ascending by date with one bar per date.
pub(crate) fn parse_chart(body: &str, req: &PriceHistoryRequest) -> FetchResult<PriceSeries> {
    if elements(body, "chartdata").is_empty() {
        return Err(SourceError::schema("chart response has no <chartdata> element"));
    }

    let mut bars = Vec::new();
    let mut skipped = 0_usize;
    for item in elements(body, "item") {
        match item.attribute("data").as_deref().and_then(parse_chart_row) {
            Some(bar) if bar.date >= req.start && bar.date <= req.end => bars.push(bar),
            Some(_) => {}
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(code = %req.code, skipped, "dropped malformed chart rows");
    }

    Ok(Fetched::from_rows(ordered_unique(bars))
        .map(|bars| PriceSeries::new(req.code.clone(), Granularity::Daily, bars)))
}

fn parse_chart_row(data: &str) -> Option<PriceBar> {
    let fields: Vec<&str> = data.split('|').map(str::trim).collect();
    let [date, open, high, low, close, volume] = fields.as_slice() else {
        return None;
    };

    let date = MarketDate::parse_compact(date).ok()?;
    let close = close.parse::<f64>().ok()?;
    let mut open = open.parse::<f64>().ok()?;
    let mut high = high.parse::<f64>().ok()?;
    let mut low = low.parse::<f64>().ok()?;
    // halted sessions report zero open/high/low
    if open == 0.0 && high == 0.0 && low == 0.0 {
        (open, high, low) = (close, close, close);
    }
    let volume = volume.parse::<f64>().ok().filter(|v| *v >= 0.0)? as u64;

    PriceBar::new(date, open, high, low, close, volume).ok()
}

/// Parse the statements grid at `table_index` among the page's tables.
///
/// Period labels come from the second header row; each body row is a `<th>`
/// line-item label followed by `<td>` values.
pub(crate) fn parse_statements(
    body: &str,
    table_index: usize,
) -> FetchResult<FinancialStatementTable> {
    let tables = elements(body, "table");
    let Some(table) = tables.get(table_index) else {
        debug!(found = tables.len(), table_index, "statements table not on page");
        return Ok(Fetched::NoData);
    };

    let header_rows = table
        .find_first("thead")
        .map(|head| head.find_all("tr"))
        .unwrap_or_default();
    let columns: Vec<String> = header_rows
        .get(1)
        .map(|row| {
            row.find_all("th")
                .iter()
                .map(Element::text)
                .filter(|label| !label.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if columns.is_empty() {
        return Err(SourceError::schema(format!(
            "table {table_index} has no period header row"
        )));
    }

    let body_rows = table
        .find_first("tbody")
        .map(|tbody| tbody.find_all("tr"))
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(body_rows.len());
    for row in body_rows {
        let Some(label) = row.find_first("th").map(|th| th.text()) else {
            continue;
        };
        if label.is_empty() {
            continue;
        }

        let mut values: Vec<Option<f64>> = row
            .find_all("td")
            .iter()
            .map(|cell| parse_number(&cell.text()))
            .collect();
        if values.len() != columns.len() {
            debug!(
                %label,
                cells = values.len(),
                columns = columns.len(),
                "statement row width differs from header"
            );
            values.resize(columns.len(), None);
        }
        rows.push(StatementRow { label, values });
    }

    if rows.is_empty() {
        return Ok(Fetched::Empty);
    }

    FinancialStatementTable::new(columns, rows)
        .map(Fetched::Data)
        .map_err(validation_to_error)
}

/// Parse disclosure rows: a `td.title` headline and a `td.date` timestamp.
pub(crate) fn parse_disclosures(body: &str) -> FetchResult<Vec<DisclosureEntry>> {
    if elements(body, "table").is_empty() {
        return Ok(Fetched::NoData);
    }

    let entries = elements(body, "tr")
        .iter()
        .filter_map(|row| {
            let cells = row.find_all("td");
            let title = cells.iter().find(|cell| cell.has_class("title"))?;
            let headline = title
                .find_first("a")
                .map(|anchor| anchor.text())
                .unwrap_or_else(|| title.text());
            if headline.is_empty() {
                return None;
            }
            let date = cells
                .iter()
                .find(|cell| cell.has_class("date"))
                .and_then(|cell| MarketDate::parse_dotted(&cell.text()).ok());
            Some(DisclosureEntry::new(headline, date))
        })
        .collect::<Vec<_>>();

    Ok(Fetched::from_rows(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{FixtureHttpClient, FixtureReply};
    use crate::DisclosureCategory;
    use std::time::Duration;

    fn request(start: &str, end: &str) -> PriceHistoryRequest {
        PriceHistoryRequest::with_end(
            InstrumentCode::parse("005930").expect("code"),
            MarketDate::parse(start).expect("start"),
            MarketDate::parse(end).expect("end"),
        )
        .expect("request")
    }

    const CHART: &str = r#"<?xml version="1.0" encoding="EUC-KR" ?>
<protocol>
<chartdata symbol="005930" name="Samsung" count="5" timeframe="day" precision="0" origintime="19900103">
<item data="20231228|78000|78500|77500|78500|17142847" />
<item data="20240102|78200|79800|78200|79600|17142847" />
<item data="20240103|78500|78800|77000|77000|21753644" />
<item data="20240104|broken|0|0|0|0" />
<item data="20240104|76100|77300|76100|76600|15324439" />
<item data="20240105|0|0|0|76600|0" />
</chartdata>
</protocol>"#;

    #[test]
    fn chart_rows_before_start_and_malformed_rows_are_dropped() {
        let outcome = parse_chart(CHART, &request("2024-01-01", "2024-12-31")).expect("parse");
        let series = outcome.data().expect("data");

        let dates: Vec<String> = series.bars.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(
            dates,
            vec!["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
        );
        assert_eq!(series.granularity, Granularity::Daily);
        assert_eq!(series.bars[0].close, 79_600.0);
        assert_eq!(series.bars[3].open, 76_600.0);
    }

    #[test]
    fn chart_without_rows_in_range_is_empty() {
        let outcome = parse_chart(CHART, &request("2025-01-01", "2025-02-01")).expect("parse");
        assert_eq!(outcome, Fetched::Empty);
    }

    #[test]
    fn chart_without_envelope_is_schema_error() {
        let error = parse_chart("<html>maintenance</html>", &request("2024-01-01", "2024-02-01"))
            .expect_err("schema");
        assert_eq!(error.kind(), SourceErrorKind::Schema);
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let body = r#"<chartdata>
<item data="20240102|10|12|9|11|100" />
<item data="20240102|10|13|9|12|200" />
</chartdata>"#;
        let series = parse_chart(body, &request("2024-01-01", "2024-01-31"))
            .expect("parse")
            .data()
            .expect("data");
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars[0].close, 12.0);
        assert_eq!(series.bars[0].volume, 200);
    }

    const STATEMENTS: &str = r#"<html><body>
<table><tr><td>nav</td></tr></table>
<table><tr><td>quote</td></tr></table>
<table><tr><td>peers</td></tr></table>
<table class="tb_type1 tb_num">
<thead>
<tr><th rowspan="3">주요재무정보</th><th colspan="2">최근 연간 실적</th><th colspan="1">최근 분기 실적</th></tr>
<tr><th>2022.12</th><th>2023.12</th><th>2024.03<br><em>(E)</em></th></tr>
<tr><th>IFRS연결</th><th>IFRS연결</th><th>IFRS연결</th></tr>
</thead>
<tbody>
<tr><th scope="row"><strong>매출액</strong></th><td>3,022,314</td><td>2,589,355</td><td>71,916</td></tr>
<tr><th scope="row"><strong>영업이익</strong></th><td>433,766</td><td>65,670</td><td>-</td></tr>
<tr><th scope="row"><strong>부채비율</strong></th><td>26.41</td></tr>
</tbody>
</table>
</body></html>"#;

    #[test]
    fn statements_table_is_read_at_configured_index() {
        let table = parse_statements(STATEMENTS, 3)
            .expect("parse")
            .data()
            .expect("data");

        assert_eq!(table.columns, vec!["2022.12", "2023.12", "2024.03 (E)"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.value("매출액", "2022.12"), Some(3_022_314.0));
        assert_eq!(table.value("영업이익", "2024.03 (E)"), None);
        assert_eq!(table.rows[2].values, vec![Some(26.41), None, None]);
    }

    #[test]
    fn missing_statements_table_is_no_data() {
        assert_eq!(parse_statements(STATEMENTS, 9).expect("parse"), Fetched::NoData);
    }

    #[test]
    fn shifted_statements_table_is_schema_error() {
        let error = parse_statements(STATEMENTS, 0).expect_err("schema");
        assert_eq!(error.kind(), SourceErrorKind::Schema);
    }

    #[test]
    fn disclosures_are_categorised() {
        let body = r#"<table class="type5">
<tr><th>제목</th><th>정보제공</th><th>날짜</th></tr>
<tr><td class="title"><a href="/x">단일판매ㆍ공급계약체결</a></td><td class="info">KRX</td><td class="date">2024.03.04 17:21</td></tr>
<tr><td class="title"><a href="/y">현금ㆍ현물배당결정</a></td><td class="info">KRX</td><td class="date">2024.01.31 16:02</td></tr>
<tr><td class="title"><a href="/z">기업설명회(IR) 개최</a></td><td class="info">KRX</td><td class="date">bad</td></tr>
</table>"#;
        let entries = parse_disclosures(body).expect("parse").data().expect("data");

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].category, DisclosureCategory::Order);
        assert_eq!(entries[0].date, Some(MarketDate::parse("2024-03-04").expect("date")));
        assert_eq!(entries[1].category, DisclosureCategory::Dividend);
        assert_eq!(entries[2].category, DisclosureCategory::General);
        assert_eq!(entries[2].date, None);
    }

    #[test]
    fn disclosure_page_without_rows_is_empty() {
        let body = "<table class=\"type5\"><tr><th>제목</th></tr></table>";
        assert_eq!(parse_disclosures(body).expect("parse"), Fetched::Empty);
    }

    #[tokio::test]
    async fn chart_request_uses_code_and_span() {
        let client = Arc::new(FixtureHttpClient::new().respond("sise.nhn", CHART));
        let adapter = NaverAdapter::new(client.clone(), SourcesConfig::default());

        let outcome = adapter
            .price_history(request("2024-01-01", "2024-01-10"))
            .await
            .expect("fetch");
        assert!(outcome.is_data());

        let sent = client.recorded_requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].url.contains("symbol=005930"));
        assert!(sent[0].url.contains("count=10"));
        assert_eq!(sent[0].default_charset.as_deref(), Some("euc-kr"));
    }

    #[tokio::test]
    async fn stalled_portal_times_out() {
        let client = Arc::new(FixtureHttpClient::new().route("main.naver", FixtureReply::Stall));
        let sources = SourcesConfig {
            timeout_ms: 20,
            ..SourcesConfig::default()
        };
        let adapter = NaverAdapter::new(client, sources);
        let code = InstrumentCode::parse("005930").expect("code");

        let started = std::time::Instant::now();
        let error = adapter.statements(&code).await.expect_err("timeout");
        assert_eq!(error.kind(), SourceErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn listing_is_unsupported() {
        let adapter = NaverAdapter::new(Arc::new(FixtureHttpClient::new()), SourcesConfig::default());
        assert!(!adapter.capabilities().supports(Endpoint::Listing));
        let error = adapter.listing().await.expect_err("unsupported");
        assert_eq!(error.kind(), SourceErrorKind::UnsupportedEndpoint);
    }
}
