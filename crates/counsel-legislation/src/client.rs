//! The legislation REST client and its factory (§4.3).
//!
//! `LegislationClient::for_active` is the "client factory": every consumer
//! obtains a fresh, cheap client bound to whichever endpoint is active at
//! the moment of the call. A client never retries across endpoints inside a
//! single call — failover is the health manager's job, driven by its probe
//! loop or by the caller reporting the failure back.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{GatewayError, Result};
use crate::health::HealthManagerHandle;
use crate::model::*;

/// A client bound to a single base URL for the lifetime of one logical call.
pub struct LegislationClient {
    http: reqwest::Client,
    base_url: String,
}

impl LegislationClient {
    /// Builds a client bound to whichever endpoint the health manager
    /// currently considers active.
    pub async fn for_active(health: &HealthManagerHandle, timeout: Duration) -> Self {
        let base_url = health.active_url().await;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url }
    }

    /// Builds a client bound to an explicit base URL (used by the health
    /// probe, which always targets the primary regardless of `active`).
    pub fn for_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.into() }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(e.to_string())
                } else {
                    GatewayError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Service { status: status.as_u16(), body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Service { status: status.as_u16(), body: e.to_string() })
    }

    pub async fn search_legislation(
        &self,
        filter: &LegislationSearchFilter,
    ) -> Result<LegislationSearchResponse> {
        self.post(
            "/legislation/search",
            json!({
                "query": filter.query,
                "year_from": filter.year_from,
                "year_to": filter.year_to,
                "type": filter.legislation_type,
                "offset": filter.offset,
                "limit": filter.limit,
            }),
        )
        .await
    }

    pub async fn lookup(
        &self,
        legislation_type: &str,
        year: u32,
        number: u32,
    ) -> Result<LegislationItem> {
        self.post(
            "/legislation/lookup",
            json!({ "type": legislation_type, "year": year, "number": number }),
        )
        .await
    }

    pub async fn sections(&self, legislation_id: &str) -> Result<SectionsResponse> {
        self.post("/legislation/sections", json!({ "id": legislation_id })).await
    }

    pub async fn full_text(&self, legislation_id: &str) -> Result<FullTextResponse> {
        self.post("/legislation/full-text", json!({ "id": legislation_id })).await
    }

    /// Searches section-level text. `legislation_id` narrows the search to
    /// one act, used by the agent pipeline's enrichment pass (§4.5) to pull
    /// fuller per-act coverage once the top acts are known.
    pub async fn search_sections(
        &self,
        query: &str,
        legislation_id: Option<&str>,
        size: u32,
    ) -> Result<SectionSearchResponse> {
        self.post(
            "/legislation/sections/search",
            json!({ "query": query, "id": legislation_id, "size": size }),
        )
        .await
    }

    pub async fn search_amendments(&self, legislation_id: &str) -> Result<AmendmentsResponse> {
        self.post("/legislation/amendments", json!({ "id": legislation_id })).await
    }

    pub async fn search_explanatory_notes(&self, legislation_id: &str) -> Result<ExplanatoryNotesResponse> {
        self.post("/legislation/explanatory-notes", json!({ "id": legislation_id })).await
    }

    pub async fn dataset_statistics(&self) -> Result<DatasetStatistics> {
        self.post("/dataset/statistics", json!({})).await
    }

    pub async fn health_check(&self) -> Result<HealthCheckResponse> {
        self.post("/health", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_legislation_parses_tolerant_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legislation/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "results": [{ "title": "Housing Act 2004", "year": 2004, "extra_unknown_field": "ignored" }]
            })))
            .mount(&server)
            .await;

        let client = LegislationClient::for_url(server.uri(), Duration::from_secs(5));
        let response = client
            .search_legislation(&LegislationSearchFilter { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0].title, "Housing Act 2004");
        assert_eq!(response.results[0].year, 2004);
    }

    #[tokio::test]
    async fn not_found_status_maps_to_not_found_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legislation/lookup"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = LegislationClient::for_url(server.uri(), Duration::from_secs(5));
        let err = client.lookup("ukpga", 2004, 34).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = LegislationClient::for_url(server.uri(), Duration::from_secs(5));
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, GatewayError::Service { status: 503, .. }));
        assert!(err.degrades_to_unverified());
    }

    #[tokio::test]
    async fn for_active_binds_to_the_health_managers_current_endpoint() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "fallback-ok" })))
            .mount(&fallback)
            .await;

        let health = HealthManagerHandle::new(primary.uri(), fallback.uri(), 1);
        health.record_probe(false, chrono::Utc::now()).await;

        let client = LegislationClient::for_active(&health, Duration::from_secs(5)).await;
        let response = client.health_check().await.unwrap();
        assert_eq!(response.status, "fallback-ok");
    }
}
