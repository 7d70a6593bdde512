//! Contract tests shared by the source connectors: capability matrix,
//! outcome classification and error codes.

use stockdesk_core::{
    DataSource, DisclosureCategory, Endpoint, FixtureHttpClient, FixtureReply, Fetched,
    HttpError, HttpErrorKind, HttpResponse, KrxAdapter, NaverAdapter, PriceHistoryRequest,
    SourceErrorKind, SourcesConfig,
};
use stockdesk_tests::{code, date, fixture_client, Arc};

fn connectors(client: FixtureHttpClient) -> Vec<Arc<dyn DataSource>> {
    let client = Arc::new(client);
    let sources = SourcesConfig::default();
    let krx: Arc<dyn DataSource> = Arc::new(KrxAdapter::new(client.clone(), sources.clone()));
    let naver: Arc<dyn DataSource> = Arc::new(NaverAdapter::new(client, sources));
    vec![krx, naver]
}

fn sample_client(overrides: FixtureHttpClient) -> FixtureHttpClient {
    fixture_client(&stockdesk_core::DashboardConfig::default(), overrides)
}

#[tokio::test]
async fn unsupported_endpoints_fail_without_network() {
    let client = Arc::new(FixtureHttpClient::new());
    let sources = SourcesConfig::default();
    let krx = KrxAdapter::new(client.clone(), sources.clone());
    let naver = NaverAdapter::new(client.clone(), sources);

    let krx_statements = krx.statements(&code("005930")).await;
    let naver_listing = naver.listing().await;

    for outcome in [krx_statements.map(|_| ()), naver_listing.map(|_| ())] {
        let error = outcome.expect_err("unsupported");
        assert_eq!(error.kind(), SourceErrorKind::UnsupportedEndpoint);
    }
    assert!(client.recorded_requests().is_empty());
}

#[tokio::test]
async fn every_endpoint_is_served_by_exactly_one_connector() {
    let connectors = connectors(FixtureHttpClient::new());
    for endpoint in [
        Endpoint::Listing,
        Endpoint::PriceHistory,
        Endpoint::Statements,
        Endpoint::Disclosures,
    ] {
        let serving = connectors
            .iter()
            .filter(|connector| connector.capabilities().supports(endpoint))
            .count();
        assert_eq!(serving, 1, "{endpoint}");
    }
}

#[tokio::test]
async fn upstream_error_status_is_classified() {
    let client = sample_client(FixtureHttpClient::new().route(
        "news_notice.naver",
        FixtureReply::Respond(HttpResponse::with_status(503, "busy")),
    ));
    let naver = NaverAdapter::new(Arc::new(client), SourcesConfig::default());

    let error = naver
        .disclosures(&code("005930"))
        .await
        .expect_err("503 is an error");
    assert_eq!(error.kind(), SourceErrorKind::UpstreamStatus);
    assert_eq!(error.code(), "source.upstream_status");
}

#[tokio::test]
async fn transport_failures_are_classified() {
    let client = FixtureHttpClient::new()
        .route(
            "getJsonData.cmd",
            FixtureReply::Fail(HttpError::new(HttpErrorKind::Connect, "refused")),
        )
        .route("sise.nhn", FixtureReply::Fail(HttpError::timeout("slow")));
    let client = Arc::new(client);
    let sources = SourcesConfig::default();

    let listing = KrxAdapter::new(client.clone(), sources.clone())
        .listing()
        .await
        .expect_err("connect failure");
    assert_eq!(listing.kind(), SourceErrorKind::Transport);

    let request = PriceHistoryRequest::new(code("005930"), date("2024-01-01")).expect("request");
    let chart = NaverAdapter::new(client, sources)
        .price_history(request)
        .await
        .expect_err("timeout");
    assert_eq!(chart.kind(), SourceErrorKind::Timeout);
}

#[tokio::test]
async fn changed_markup_is_a_schema_error_not_empty_data() {
    let client = sample_client(
        FixtureHttpClient::new()
            .respond("sise.nhn", "<html>moved</html>")
            .respond("getJsonData.cmd", r#"{"block1": []}"#),
    );
    let client = Arc::new(client);
    let sources = SourcesConfig::default();

    let request = PriceHistoryRequest::new(code("005930"), date("2024-01-01")).expect("request");
    let chart = NaverAdapter::new(client.clone(), sources.clone())
        .price_history(request)
        .await
        .expect_err("schema");
    assert_eq!(chart.kind(), SourceErrorKind::Schema);

    let listing = KrxAdapter::new(client, sources)
        .listing()
        .await
        .expect_err("schema");
    assert_eq!(listing.kind(), SourceErrorKind::Schema);
}

#[tokio::test]
async fn zero_rows_are_empty_and_missing_sections_are_no_data() {
    let client = sample_client(
        FixtureHttpClient::new()
            .respond("getJsonData.cmd", r#"{"OutBlock_1": []}"#)
            .respond("news_notice.naver", "<html><body>없음</body></html>"),
    );
    let client = Arc::new(client);
    let sources = SourcesConfig::default();

    let listing = KrxAdapter::new(client.clone(), sources.clone())
        .listing()
        .await
        .expect("listing");
    assert_eq!(listing, Fetched::Empty);

    let disclosures = NaverAdapter::new(client, sources)
        .disclosures(&code("005930"))
        .await
        .expect("disclosures");
    assert_eq!(disclosures, Fetched::NoData);
}

#[tokio::test]
async fn sample_portal_pages_parse_into_domain_rows() {
    let naver = NaverAdapter::new(
        Arc::new(sample_client(FixtureHttpClient::new())),
        SourcesConfig::default(),
    );

    let table = naver
        .statements(&code("005930"))
        .await
        .expect("statements")
        .data()
        .expect("table");
    assert_eq!(table.columns.first().map(String::as_str), Some("2022.12"));
    assert_eq!(table.value("매출액", "2022.12"), Some(3_022_314.0));
    assert_eq!(table.columns.len(), 5);
    assert_eq!(table.value("부채비율", &table.columns[2]), None);
    assert_eq!(table.value("부채비율", "2023.12"), Some(25.36));

    let entries = naver
        .disclosures(&code("005930"))
        .await
        .expect("disclosures")
        .data()
        .expect("entries");
    let categories: Vec<_> = entries.iter().map(|entry| entry.category).collect();
    assert!(categories.contains(&DisclosureCategory::Order));
    assert!(categories.contains(&DisclosureCategory::Dividend));
    assert!(categories.contains(&DisclosureCategory::General));
    assert!(entries.iter().all(|entry| entry.date.is_some()));
}
