use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct HealthState {
    client: reqwest::Client,
    order_api_base_url: String,
}

impl HealthState {
    pub fn new(order_api_base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), order_api_base_url: order_api_base_url.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub order_api: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let order_api = order_api_check(&state).await;
    let ready = order_api.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "orderdesk-server runtime initialized".to_string(),
        },
        order_api,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Any HTTP answer counts as reachable; the probe carries no credentials.
async fn order_api_check(state: &HealthState) -> HealthCheck {
    match state.client.get(&state.order_api_base_url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => HealthCheck {
            status: "ready",
            detail: format!("order API answered with HTTP {}", response.status().as_u16()),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("order API unreachable: {}", error.without_url()),
        },
    }
}
