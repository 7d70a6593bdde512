//! Deterministic offline payloads shaped like the real upstream responses.
//!
//! [`sample_http_client`] answers every configured endpoint without network
//! access, so the whole pipeline (parsing included) runs in demos and tests.
//! Prices are a seeded random walk over weekdays: the same date always
//! produces the same bar.

use std::fmt::Write as _;

use serde_json::json;
use time::{Date, Weekday};

use crate::config::SourcesConfig;
use crate::directory::builtin_instruments;
use crate::http_client::FixtureHttpClient;
use crate::MarketDate;

const SAMPLE_SEED: u64 = 0x5eed_d35c;

/// First trading day of the sample chart.
pub fn sample_origin() -> MarketDate {
    MarketDate::from_date(
        Date::from_calendar_date(2021, time::Month::January, 4).unwrap_or(Date::MIN),
    )
}

/// Offline transport answering the endpoints named in `sources`.
pub fn sample_http_client(sources: &SourcesConfig) -> FixtureHttpClient {
    FixtureHttpClient::new()
        .respond(route_key(&sources.chart_url), chart_xml(MarketDate::today()))
        .respond(route_key(&sources.listing_url), listing_json())
        .respond(
            route_key(&sources.statements_url),
            statements_html(sources.statements_table_index),
        )
        .respond(route_key(&sources.disclosures_url), disclosures_html())
}

/// URL prefix before the query string or the first placeholder.
fn route_key(template: &str) -> String {
    let end = template.find(['?', '{']).unwrap_or(template.len());
    template[..end].to_owned()
}

/// Chart feed XML from [`sample_origin`] through `through`.
pub fn chart_xml(through: MarketDate) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"EUC-KR\" ?>\n<protocol>\n\
         <chartdata symbol=\"SAMPLE\" name=\"Sample\" timeframe=\"day\" precision=\"0\">\n",
    );

    let mut state = SAMPLE_SEED;
    let mut close = 60_000.0_f64;
    let mut date = sample_origin().into_inner();
    let last = through.into_inner();

    while date <= last {
        if !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday) {
            state = next_state(state);
            // -2.00% .. +2.00%
            let drift = ((state >> 33) % 401) as f64 / 10_000.0 - 0.02;
            let open = close.round();
            let next = (close * (1.0 + drift)).round().max(100.0);
            let high = (open.max(next) * 1.01).ceil();
            let low = (open.min(next) * 0.99).floor();
            let volume = 5_000_000 + (state >> 40) % 10_000_000;

            let _ = writeln!(
                xml,
                "<item data=\"{:04}{:02}{:02}|{open}|{high}|{low}|{next}|{volume}\" />",
                date.year(),
                u8::from(date.month()),
                date.day(),
            );
            close = next;
        }

        match date.next_day() {
            Some(next_day) => date = next_day,
            None => break,
        }
    }

    xml.push_str("</chartdata>\n</protocol>\n");
    xml
}

fn next_state(state: u64) -> u64 {
    state
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407)
}

/// Listing payload built from the built-in instrument list.
pub fn listing_json() -> String {
    let rows: Vec<_> = builtin_instruments()
        .into_iter()
        .map(|instrument| {
            json!({
                "ISU_SRT_CD": instrument.code.as_str(),
                "ISU_ABBRV": instrument.name,
                "MKT_TP_NM": instrument.market.unwrap_or_default(),
            })
        })
        .collect();
    json!({ "OutBlock_1": rows }).to_string()
}

/// Portal page with the statements grid at `table_index`.
pub fn statements_html(table_index: usize) -> String {
    let mut html = String::from("<html><head><title>sample</title></head><body>\n");
    for filler in 0..table_index {
        let _ = writeln!(html, "<table class=\"filler\"><tr><td>section {filler}</td></tr></table>");
    }
    html.push_str(
        r#"<table class="tb_type1 tb_num tb_type1_ifrs">
<thead>
<tr><th rowspan="3">주요재무정보</th><th colspan="3">최근 연간 실적</th><th colspan="2">최근 분기 실적</th></tr>
<tr><th>2022.12</th><th>2023.12</th><th>2024.12<br><em>(E)</em></th><th>2024.06</th><th>2024.09</th></tr>
<tr><th>IFRS연결</th><th>IFRS연결</th><th>IFRS연결</th><th>IFRS연결</th><th>IFRS연결</th></tr>
</thead>
<tbody>
<tr><th scope="row"><strong>매출액</strong></th><td>3,022,314</td><td>2,589,355</td><td>3,008,709</td><td>740,683</td><td>790,987</td></tr>
<tr><th scope="row"><strong>영업이익</strong></th><td>433,766</td><td>65,670</td><td>327,260</td><td>104,439</td><td>91,834</td></tr>
<tr><th scope="row"><strong>당기순이익</strong></th><td>556,541</td><td>154,871</td><td>344,514</td><td>98,413</td><td>101,009</td></tr>
<tr><th scope="row"><strong>부채비율</strong></th><td>26.41</td><td>25.36</td><td></td><td>27.94</td><td>-</td></tr>
<tr><th scope="row"><strong>배당성향</strong></th><td>17.92</td><td>67.78</td><td>-</td><td></td><td></td></tr>
</tbody>
</table>
</body></html>
"#,
    );
    html
}

/// Disclosure list page covering every headline category.
pub fn disclosures_html() -> String {
    String::from(
        r#"<html><body>
<table class="type5" summary="공시 리스트">
<thead><tr><th>제목</th><th>정보제공</th><th>날짜</th></tr></thead>
<tbody>
<tr><td class="title"><a href="/item/news_notice_read.naver?no=1">단일판매ㆍ공급계약체결</a></td><td class="info">KRX</td><td class="date">2024.11.28 17:05</td></tr>
<tr><td class="title"><a href="/item/news_notice_read.naver?no=2">현금ㆍ현물배당결정</a></td><td class="info">KRX</td><td class="date">2024.10.31 15:40</td></tr>
<tr><td class="title"><a href="/item/news_notice_read.naver?no=3">기업설명회(IR) 개최(안내공시)</a></td><td class="info">KRX</td><td class="date">2024.10.17 16:12</td></tr>
<tr><td class="title"><a href="/item/news_notice_read.naver?no=4">대규모 수주 공시</a></td><td class="info">KRX</td><td class="date">2024.09.02 09:01</td></tr>
<tr><td class="title"><a href="/item/news_notice_read.naver?no=5">임원ㆍ주요주주특정증권등소유상황보고서</a></td><td class="info">KRX</td><td class="date">2024.08.21 18:30</td></tr>
</tbody>
</table>
</body></html>
"#,
    )
}
