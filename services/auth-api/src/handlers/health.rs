//! Health check handlers

use std::future::Future;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    pub latency_ms: u64,
}

impl CheckResult {
    fn is_ok(&self) -> bool {
        self.status == "connected"
    }
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: CheckResult,
    pub revocation_store: CheckResult,
}

/// Liveness probe - always returns OK if the service is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - checks the user store and the revocation store
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (database, revocation_store) = tokio::join!(
        check("database", state.principals().ping()),
        check("revocation_store", state.revocations().ping()),
    );

    let ok = database.is_ok() && revocation_store.is_ok();
    let response = ReadyResponse {
        status: if ok { "ready" } else { "not_ready" },
        database,
        revocation_store,
    };
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

async fn check<E, F>(name: &'static str, ping: F) -> CheckResult
where
    E: std::fmt::Debug,
    F: Future<Output = Result<(), E>>,
{
    let started = Instant::now();
    let result = ping.await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => CheckResult {
            status: "connected",
            latency_ms,
        },
        Err(e) => {
            tracing::error!(check = name, error = ?e, "Health check failed");
            CheckResult {
                status: "unavailable",
                latency_ms,
            }
        }
    }
}
