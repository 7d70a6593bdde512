//! Upstream connectors.
//!
//! | Adapter | Provider | Endpoints |
//! |---------|----------|-----------|
//! | [`KrxAdapter`] | exchange listing service | listing |
//! | [`NaverAdapter`] | chart feed and finance portal | price history, statements, disclosures |
//!
//! Each call issues one request bounded by `sources.timeout_ms` and is never
//! retried.

pub mod html;
mod krx;
mod naver;
pub mod sample;

use std::time::Duration;

use tracing::debug;

pub use krx::KrxAdapter;
pub use naver::NaverAdapter;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest};
use crate::ValidationError;

/// Execute `request` under a hard deadline and return the decoded body.
///
/// The deadline is enforced here as well as on the transport, so a client that
/// ignores `timeout_ms` still cannot block the caller.
pub(crate) async fn fetch_body(
    http_client: &dyn HttpClient,
    request: HttpRequest,
    timeout: Duration,
) -> Result<String, SourceError> {
    let url = request.url.clone();
    let request = request.with_timeout_ms(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
    debug!(%url, timeout_ms = timeout.as_millis() as u64, "upstream request");

    let response = match tokio::time::timeout(timeout, http_client.execute(request)).await {
        Err(_) => {
            return Err(SourceError::timeout(format!(
                "no response from {url} within {} ms",
                timeout.as_millis()
            )))
        }
        Ok(Err(error)) => {
            return Err(match error.kind() {
                HttpErrorKind::Timeout => SourceError::timeout(format!(
                    "{url} timed out: {}",
                    error.message()
                )),
                HttpErrorKind::Body => SourceError::decode(format!(
                    "could not decode body from {url}: {}",
                    error.message()
                )),
                HttpErrorKind::Connect | HttpErrorKind::Other => SourceError::transport(format!(
                    "{url} unreachable: {}",
                    error.message()
                )),
            })
        }
        Ok(Ok(response)) => response,
    };

    if !response.is_success() {
        return Err(SourceError::upstream_status(response.status, &url));
    }

    debug!(%url, bytes = response.body.len(), "upstream response");
    Ok(response.body)
}

/// Substitute `{name}` placeholders in a configured URL template.
pub(crate) fn expand_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |url, (name, value)| {
            url.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
        })
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::decode(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{FixtureHttpClient, FixtureReply, HttpError, HttpResponse};

    #[test]
    fn template_values_are_url_encoded() {
        let url = expand_template(
            "https://x.test/?symbol={code}&count={count}",
            &[("code", "005930"), ("count", "10 0")],
        );
        assert_eq!(url, "https://x.test/?symbol=005930&count=10%200");
    }

    #[tokio::test]
    async fn stalled_upstream_is_a_timeout() {
        let client = FixtureHttpClient::new().route("slow", FixtureReply::Stall);
        let error = fetch_body(
            &client,
            HttpRequest::get("https://slow.test"),
            Duration::from_millis(20),
        )
        .await
        .expect_err("must time out");
        assert_eq!(error.kind(), SourceErrorKind::Timeout);
    }

    #[tokio::test]
    async fn transport_failures_are_classified() {
        let client = FixtureHttpClient::new()
            .route("down", FixtureReply::Fail(HttpError::new(HttpErrorKind::Connect, "refused")))
            .route("late", FixtureReply::Fail(HttpError::timeout("deadline")))
            .route(
                "gone",
                FixtureReply::Respond(HttpResponse::with_status(503, "")),
            );
        let timeout = Duration::from_secs(1);

        let down = fetch_body(&client, HttpRequest::get("https://down.test"), timeout)
            .await
            .expect_err("connect failure");
        assert_eq!(down.kind(), SourceErrorKind::Transport);

        let late = fetch_body(&client, HttpRequest::get("https://late.test"), timeout)
            .await
            .expect_err("transport timeout");
        assert_eq!(late.kind(), SourceErrorKind::Timeout);

        let gone = fetch_body(&client, HttpRequest::get("https://gone.test"), timeout)
            .await
            .expect_err("bad status");
        assert_eq!(gone.kind(), SourceErrorKind::UpstreamStatus);
    }

    #[tokio::test]
    async fn request_carries_configured_timeout() {
        let client = FixtureHttpClient::new().respond("ok.test", "body");
        let body = fetch_body(
            &client,
            HttpRequest::get("https://ok.test"),
            Duration::from_millis(1_500),
        )
        .await
        .expect("success");
        assert_eq!(body, "body");
        assert_eq!(client.recorded_requests()[0].timeout_ms, 1_500);
    }
}
