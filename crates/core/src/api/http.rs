use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, warn};

use super::{check_logical_errors, OrderApi, RawPayload};
use crate::config::OrderApiConfig;
use crate::errors::LookupError;

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("order API base url `{url}` is invalid: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// [`OrderApi`] over the backend's REST endpoints.
#[derive(Clone)]
pub struct HttpOrderApiClient {
    client: Client,
    base_url: Url,
    api_token: SecretString,
}

impl std::fmt::Debug for HttpOrderApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOrderApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpOrderApiClient {
    pub fn new(
        base_url: &str,
        api_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ClientBuildError> {
        let parsed = Url::parse(base_url).map_err(|error| ClientBuildError::BaseUrl {
            url: base_url.to_owned(),
            reason: error.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ClientBuildError::BaseUrl {
                url: base_url.to_owned(),
                reason: "expected an http(s) url".to_owned(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: parsed, api_token })
    }

    pub fn from_config(config: &OrderApiConfig) -> Result<Self, ClientBuildError> {
        Self::new(
            &config.base_url,
            config.api_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/order` or `{base}/order/{id}`, segments percent-encoded.
    fn order_url(&self, order_id: Option<&str>) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| LookupError::Network {
                status: None,
                reason: "URL base da API inválida".to_owned(),
            })?;
            segments.pop_if_empty().push("order");
            if let Some(order_id) = order_id {
                segments.push(order_id);
            }
        }
        Ok(url)
    }

    async fn get(&self, operation: &'static str, url: Url) -> Result<RawPayload, LookupError> {
        debug!(event_name = "order_api.request.sent", operation, "sending order API request");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await
            .map_err(|error| {
                let error = transport_error(error);
                warn!(
                    event_name = "order_api.request.failed",
                    operation,
                    error = %error,
                    "order API request did not complete"
                );
                error
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "order_api.response.rejected",
                operation,
                status = status.as_u16(),
                "order API returned a non-success status"
            );
            return Err(status_error(status));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let payload: RawPayload = serde_json::from_slice(&body).map_err(|error| {
            warn!(
                event_name = "order_api.response.invalid_body",
                operation,
                error = %error,
                "order API returned a body that is not JSON"
            );
            LookupError::InvalidBody(error.to_string())
        })?;

        if let Err(error) = check_logical_errors(&payload) {
            warn!(
                event_name = "order_api.response.logical_error",
                operation,
                error = %error,
                "order API reported an error in a successful response"
            );
            return Err(error);
        }

        debug!(
            event_name = "order_api.response.received",
            operation,
            "order API request succeeded"
        );
        Ok(payload)
    }
}

#[async_trait]
impl OrderApi for HttpOrderApiClient {
    async fn fetch_by_email(&self, email: &str) -> Result<RawPayload, LookupError> {
        let mut url = self.order_url(None)?;
        url.query_pairs_mut().append_pair("email", email);
        self.get("fetch_by_email", url).await
    }

    async fn fetch_by_external_id(&self, external_id: &str) -> Result<RawPayload, LookupError> {
        let mut url = self.order_url(None)?;
        url.query_pairs_mut().append_pair("q", external_id);
        self.get("fetch_by_external_id", url).await
    }

    async fn fetch_by_id(&self, order_id: &str) -> Result<RawPayload, LookupError> {
        let url = self.order_url(Some(order_id))?;
        self.get("fetch_by_id", url).await
    }
}

fn status_error(status: StatusCode) -> LookupError {
    LookupError::Network {
        status: Some(status.as_u16()),
        reason: status.canonical_reason().unwrap_or("Unknown Status").to_owned(),
    }
}

fn transport_error(error: reqwest::Error) -> LookupError {
    match error.status() {
        Some(status) => status_error(status),
        None => LookupError::Network { status: None, reason: error.without_url().to_string() },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::{Path, Query};
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::json;

    use super::{ClientBuildError, HttpOrderApiClient};
    use crate::api::OrderApi;
    use crate::errors::{ErrorKind, LookupError};

    const TOKEN: &str = "test-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
            == Some(&format!("Bearer {TOKEN}")[..])
    }

    async fn search(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }

        match (params.get("email").map(String::as_str), params.get("q")) {
            (Some("ana+promo@example.com"), _) => Json(json!([
                { "internal_id": "o-1", "status": "APPROVED" },
                { "internal_id": "o-2", "status": "PENDING" }
            ]))
            .into_response(),
            (Some("erro@example.com"), _) => {
                Json(json!({ "errors": [{ "message": "invalid token" }] })).into_response()
            }
            (None, Some(q)) => Json(json!({ "data": [{ "internal_id": format!("user-{q}") }] }))
                .into_response(),
            _ => Json(json!([])).into_response(),
        }
    }

    async fn by_id(headers: HeaderMap, Path(id): Path<String>) -> Response {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }

        match id.as_str() {
            "missing" => StatusCode::NOT_FOUND.into_response(),
            "broken" => (StatusCode::OK, "<html>oops</html>").into_response(),
            _ => Json(json!({ "internal_id": id })).into_response(),
        }
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route("/v1/app/order", get(search))
            .route("/v1/app/order/{id}", get(by_id));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}/v1/app")
    }

    fn client(base_url: &str, token: &str) -> HttpOrderApiClient {
        HttpOrderApiClient::new(
            base_url,
            SecretString::from(token.to_owned()),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn email_lookup_encodes_the_query_and_sends_the_bearer_token() {
        let base = spawn_backend().await;
        let payload =
            client(&base, TOKEN).fetch_by_email("ana+promo@example.com").await.expect("payload");
        assert_eq!(payload.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn external_id_lookup_uses_the_q_parameter() {
        let base = spawn_backend().await;
        let payload = client(&base, TOKEN).fetch_by_external_id("123456").await.expect("payload");
        assert_eq!(payload["data"][0]["internal_id"], "user-123456");
    }

    #[tokio::test]
    async fn order_ids_are_sent_as_a_single_path_segment() {
        let base = spawn_backend().await;
        let payload =
            client(&format!("{base}/"), TOKEN).fetch_by_id("a b/c").await.expect("payload");
        assert_eq!(payload["internal_id"], "a b/c");
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error_with_reason() {
        let base = spawn_backend().await;
        let error = client(&base, TOKEN).fetch_by_id("missing").await.expect_err("404");
        assert_eq!(
            error,
            LookupError::Network { status: Some(404), reason: "Not Found".to_owned() }
        );
        assert_eq!(error.to_string(), "Erro na API: 404 - Not Found");

        let error =
            client(&base, "wrong").fetch_by_email("ana@example.com").await.expect_err("401");
        assert_eq!(error.status(), Some(401));
    }

    #[tokio::test]
    async fn errors_in_a_successful_body_are_api_errors() {
        let base = spawn_backend().await;
        let error = client(&base, TOKEN).fetch_by_email("erro@example.com").await.expect_err("api");
        assert_eq!(error, LookupError::Api("invalid token".to_owned()));
        assert_eq!(error.kind(), ErrorKind::Api);
    }

    #[tokio::test]
    async fn non_json_bodies_are_invalid() {
        let base = spawn_backend().await;
        let error = client(&base, TOKEN).fetch_by_id("broken").await.expect_err("invalid");
        assert!(matches!(error, LookupError::InvalidBody(_)));
        assert_eq!(error.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn unreachable_backend_has_no_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let error = client(&format!("http://{addr}/v1/app"), TOKEN)
            .fetch_by_email("ana@example.com")
            .await
            .expect_err("refused");
        assert!(matches!(error, LookupError::Network { status: None, .. }));
    }

    #[test]
    fn base_url_must_be_http() {
        let token = || SecretString::from(TOKEN.to_owned());
        for url in ["not a url", "ftp://example.com/v1", "mailto:ops@example.com"] {
            let result = HttpOrderApiClient::new(url, token(), Duration::from_secs(1));
            assert!(matches!(result, Err(ClientBuildError::BaseUrl { .. })), "url {url}");
        }
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let client = client("https://api.example.com/v1/app", "super-secret");
        let rendered = format!("{client:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}
