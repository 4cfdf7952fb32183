use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use device_store::DeviceStore;
use serde::Serialize;

use crate::config::Settings;

/// Non-sensitive configuration summary served by the diagnostic endpoint.
/// The admin secret value itself is never included, only whether the
/// default was overridden.
#[derive(Debug, Clone, Serialize)]
pub struct StatusDocument {
    pub store_url: String,
    pub store_url_configured: bool,
    pub has_api_key: bool,
    pub admin_pin_overridden: bool,
    pub database_url: String,
    pub submission_marker: bool,
    pub pending_entries: i64,
}

#[derive(Clone)]
pub struct StatusState {
    pub device: DeviceStore,
    pub store_url: String,
    pub has_api_key: bool,
    pub admin_pin_overridden: bool,
    pub database_url: String,
}

impl StatusState {
    pub fn new(device: DeviceStore, settings: &Settings, database_url: String) -> Self {
        Self {
            device,
            store_url: settings.store_url.clone(),
            has_api_key: !settings.store_api_key.is_empty(),
            admin_pin_overridden: settings.admin_pin_overridden(),
            database_url,
        }
    }

    pub async fn document(&self) -> anyhow::Result<StatusDocument> {
        Ok(StatusDocument {
            store_url: self.store_url.clone(),
            store_url_configured: !self.store_url.is_empty(),
            has_api_key: self.has_api_key,
            admin_pin_overridden: self.admin_pin_overridden,
            database_url: self.database_url.clone(),
            submission_marker: self.device.submission_marker().await?,
            pending_entries: self.device.pending_count().await?,
        })
    }
}

pub fn build_router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<StatusState>>) -> impl IntoResponse {
    match state.device.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "device store unreachable"),
    }
}

async fn status(State(state): State<Arc<StatusState>>) -> impl IntoResponse {
    match state.document().await {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
