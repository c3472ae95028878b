//! Proxy endpoint client
//!
//! This module fetches the current exchange rate from the proxy endpoint and
//! normalizes the indicator payload into a [`RateRecord`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::RateRecord;
use crate::config::{DEFAULT_ENDPOINT, FETCH_TIMEOUT};

/// Errors that can occur when fetching the exchange rate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Transport failure or non-2xx HTTP status
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// No response within the allowed time
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Response body is not a non-empty sequence of indicator records
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The rate value is present but not a positive number
    #[error("invalid rate value: {0}")]
    InvalidValue(String),
}

/// Something that can produce the current exchange rate
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Fetches the most recent rate
    async fn fetch(&self) -> Result<RateRecord, SourceError>;
}

/// One element of the indicator payload
///
/// Only the two fields the converter needs are read; anything else upstream adds
/// is ignored. `Valor` stays untyped so a non-numeric value can be told apart from
/// a missing one.
#[derive(Debug, Deserialize)]
struct IndicatorEntry {
    #[serde(rename = "Valor")]
    valor: Option<serde_json::Value>,
    #[serde(rename = "Fecha")]
    fecha: Option<String>,
}

/// Validates an indicator payload and extracts the most recent rate
///
/// The payload must be a non-empty JSON array; element 0 is taken as the most
/// recent entry as ordered upstream. Used by both the client and the proxy.
pub fn parse_payload(body: &str) -> Result<RateRecord, SourceError> {
    // Later entries are history and may use any shape
    let entries: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| SourceError::MalformedPayload(e.to_string()))?;

    let first = entries
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::MalformedPayload("empty sequence".to_string()))?;
    let first: IndicatorEntry = serde_json::from_value(first)
        .map_err(|e| SourceError::MalformedPayload(format!("first entry: {}", e)))?;

    let valor = first
        .valor
        .filter(|v| !v.is_null())
        .ok_or_else(|| SourceError::MalformedPayload("missing Valor".to_string()))?;
    let fecha = first
        .fecha
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| SourceError::MalformedPayload("missing Fecha".to_string()))?;

    let value = valor
        .as_f64()
        .ok_or_else(|| SourceError::InvalidValue(format!("non-numeric Valor {}", valor)))?;

    RateRecord::new(value, fecha)
        .ok_or_else(|| SourceError::InvalidValue(format!("Valor {} is not positive", value)))
}

/// Client for the `/api/tipo-cambio` proxy endpoint
#[derive(Debug, Clone)]
pub struct RateSource {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl Default for RateSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl RateSource {
    /// Create a new RateSource for the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Overrides the fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint this source reads from
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the current rate from the proxy
    ///
    /// # Returns
    /// * `Ok(RateRecord)` - The most recent published rate
    /// * `Err(SourceError)` - Transport failure, non-2xx status, timeout, or a bad payload
    ///
    /// The whole request, body included, is bounded by the timeout; when it fires
    /// the in-flight request is dropped.
    pub async fn fetch_rate(&self) -> Result<RateRecord, SourceError> {
        let request = async {
            let response = self
                .client
                .get(&self.endpoint)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::NetworkFailure(format!("HTTP {}", status)));
            }

            response.text().await.map_err(|e| self.classify(e))
        };

        let body = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| SourceError::Timeout(self.timeout))??;

        debug!(endpoint = %self.endpoint, bytes = body.len(), "Received rate payload");
        parse_payload(&body)
    }

    fn classify(&self, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::NetworkFailure(error.to_string())
        }
    }
}

#[async_trait]
impl RateFetcher for RateSource {
    async fn fetch(&self) -> Result<RateRecord, SourceError> {
        self.fetch_rate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve_once, serve_silent};

    #[test]
    fn test_parse_valid_payload_takes_first_element() {
        let body = r#"[
            {"Valor": 24.7012, "Fecha": "2024-03-15T00:00:00", "Indicador": 97},
            {"Valor": 24.6500, "Fecha": "2024-03-14T00:00:00", "Indicador": 97}
        ]"#;

        let record = parse_payload(body).expect("valid payload");
        assert!((record.value() - 24.7012).abs() < 1e-9);
        assert_eq!(record.as_of_date(), "2024-03-15T00:00:00");
    }

    #[test]
    fn test_parse_ignores_shape_of_older_entries() {
        let body = r#"[
            {"Valor": 24.5, "Fecha": "2024-01-01"},
            {"Valor": 24.4, "Fecha": 20240101},
            "unexpected"
        ]"#;

        let record = parse_payload(body).expect("only the first entry is read");
        assert!((record.value() - 24.5).abs() < f64::EPSILON);
        assert_eq!(record.as_of_date(), "2024-01-01");
    }

    #[test]
    fn test_parse_first_entry_must_be_an_object() {
        assert!(matches!(
            parse_payload(r#"[24.5, {"Valor": 24.4, "Fecha": "2024-01-01"}]"#),
            Err(SourceError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload(r#"[{"Valor": 24.5, "Fecha": 20240101}]"#),
            Err(SourceError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_empty_sequence_is_malformed() {
        assert!(matches!(
            parse_payload("[]"),
            Err(SourceError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_non_array_is_malformed() {
        let body = r#"{"error": "boom", "status": 500}"#;
        assert!(matches!(
            parse_payload(body),
            Err(SourceError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload("not json"),
            Err(SourceError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_missing_fields_is_malformed() {
        assert!(matches!(
            parse_payload(r#"[{"Fecha": "2024-01-01"}]"#),
            Err(SourceError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload(r#"[{"Valor": 24.5}]"#),
            Err(SourceError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload(r#"[{"Valor": null, "Fecha": "2024-01-01"}]"#),
            Err(SourceError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_non_positive_value_is_invalid() {
        assert!(matches!(
            parse_payload(r#"[{"Valor": 0, "Fecha": "2024-01-01"}]"#),
            Err(SourceError::InvalidValue(_))
        ));
        assert!(matches!(
            parse_payload(r#"[{"Valor": -3.2, "Fecha": "2024-01-01"}]"#),
            Err(SourceError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_parse_non_numeric_value_is_invalid() {
        assert!(matches!(
            parse_payload(r#"[{"Valor": "24.5", "Fecha": "2024-01-01"}]"#),
            Err(SourceError::InvalidValue(_))
        ));
        assert!(matches!(
            parse_payload(r#"[{"Valor": true, "Fecha": "2024-01-01"}]"#),
            Err(SourceError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = serve_once(200, r#"[{"Valor": 24.5, "Fecha": "2024-01-01"}]"#).await;
        let source = RateSource::new(url);

        let record = source.fetch_rate().await.expect("fetch should succeed");
        assert!((record.value() - 24.5).abs() < f64::EPSILON);
        assert_eq!(record.as_of_date(), "2024-01-01");
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_network_failure_regardless_of_body() {
        let body = r#"{"error":"Timeout","timestamp":"2024-01-01T00:00:00Z","status":504}"#;
        let url = serve_once(504, body).await;
        let source = RateSource::new(url);

        let err = source.fetch_rate().await.unwrap_err();
        assert!(matches!(err, SourceError::NetworkFailure(ref m) if m.contains("504")));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_failure() {
        let source = RateSource::new("http://127.0.0.1:1/api/tipo-cambio");

        let err = source.fetch_rate().await.unwrap_err();
        assert!(matches!(err, SourceError::NetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_fetch_times_out_when_server_is_silent() {
        let url = serve_silent().await;
        let source = RateSource::new(url).with_timeout(Duration::from_millis(200));

        let err = source.fetch_rate().await.unwrap_err();
        assert_eq!(err, SourceError::Timeout(Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_fetch_bad_payload_is_classified() {
        let url = serve_once(200, r#"[{"Valor": -1, "Fecha": "2024-01-01"}]"#).await;
        let source = RateSource::new(url);

        assert!(matches!(
            source.fetch_rate().await,
            Err(SourceError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_default_endpoint() {
        let source = RateSource::default();
        assert!(source.endpoint().ends_with("/api/tipo-cambio"));
    }
}
