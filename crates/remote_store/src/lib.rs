use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use shared::domain::{Entrant, EntrantId, NewEntrant};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

const ENTRANTS_TABLE: &str = "entrants";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Postgres error code for unique-constraint violations, surfaced in
/// PostgREST error bodies.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The insert hit the unique constraint on the email column.
    #[error("unique constraint violation on insert")]
    UniqueViolation,
    /// Any other store or transport failure, including request timeout.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Other(err.to_string())
    }
}

/// The external collaborator: a remote tabular store supporting insert,
/// filtered select, and filtered update, with a uniqueness constraint on
/// the entrant email.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn insert_entrant(&self, entry: &NewEntrant) -> Result<(), StoreError>;
    /// Entrants with `is_winner = false AND disqualified = false`.
    async fn eligible_entrants(&self) -> Result<Vec<Entrant>, StoreError>;
    /// Flips `is_winner` to true for the given entrant.
    async fn mark_winner(&self, id: EntrantId) -> Result<(), StoreError>;
}

/// Fallback used when no endpoint is configured; every call fails with a
/// descriptive error instead of panicking.
pub struct MissingRemoteStore;

#[async_trait]
impl RemoteStore for MissingRemoteStore {
    async fn insert_entrant(&self, _entry: &NewEntrant) -> Result<(), StoreError> {
        Err(StoreError::Other(
            "remote store endpoint is not configured".to_string(),
        ))
    }

    async fn eligible_entrants(&self) -> Result<Vec<Entrant>, StoreError> {
        Err(StoreError::Other(
            "remote store endpoint is not configured".to_string(),
        ))
    }

    async fn mark_winner(&self, _id: EntrantId) -> Result<(), StoreError> {
        Err(StoreError::Other(
            "remote store endpoint is not configured".to_string(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct WinnerPatch {
    is_winner: bool,
}

/// PostgREST-style client for the entrants table.
///
/// Predicates ride in the query string (`column=eq.value`), inserts are
/// JSON arrays, and unique violations come back as HTTP 409 carrying the
/// Postgres `23505` code.
pub struct RestRemoteStore {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl RestRemoteStore {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| StoreError::Other(format!("invalid store endpoint url: {err}")))?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(StoreError::from)?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn table_url(&self) -> Result<Url, StoreError> {
        self.base_url
            .join(&format!("rest/v1/{ENTRANTS_TABLE}"))
            .map_err(|err| StoreError::Other(format!("invalid table url: {err}")))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    /// Lightweight reachability check used for connectivity polling; any
    /// HTTP answer from the endpoint counts as online.
    pub async fn probe(&self) -> bool {
        let Ok(url) = self.table_url() else {
            return false;
        };
        self.authed(self.http.head(url)).send().await.is_ok()
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn insert_entrant(&self, entry: &NewEntrant) -> Result<(), StoreError> {
        let response = self
            .authed(self.http.post(self.table_url()?))
            .header("Prefer", "return=minimal")
            .json(&[entry])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(email = %entry.email, "entrant inserted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT || body.contains(PG_UNIQUE_VIOLATION) {
            warn!(email = %entry.email, "insert rejected by unique constraint");
            return Err(StoreError::UniqueViolation);
        }
        Err(StoreError::Other(format!("insert failed ({status}): {body}")))
    }

    async fn eligible_entrants(&self) -> Result<Vec<Entrant>, StoreError> {
        let response = self
            .authed(self.http.get(self.table_url()?))
            .query(&[
                ("select", "*"),
                ("is_winner", "eq.false"),
                ("disqualified", "eq.false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Other(format!("select failed ({status}): {body}")));
        }

        let entrants: Vec<Entrant> = response.json().await?;
        Ok(entrants)
    }

    async fn mark_winner(&self, id: EntrantId) -> Result<(), StoreError> {
        let response = self
            .authed(self.http.patch(self.table_url()?))
            .query(&[("id", format!("eq.{}", id.0))])
            .header("Prefer", "return=minimal")
            .json(&WinnerPatch { is_winner: true })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Other(format!("update failed ({status}): {body}")));
        }
        info!(entrant_id = %id.0, "winner flag set");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
