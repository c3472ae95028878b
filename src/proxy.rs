//! Rate proxy endpoint
//!
//! Serves `GET /api/tipo-cambio` by calling the upstream indicator API with the
//! server-side subscription key, validating the payload, and passing it through
//! with CORS and CDN cache headers. The key never reaches the client.

use actix_web::http::{Method, StatusCode};
use actix_web::middleware::DefaultHeaders;
use actix_web::{web, HttpResponse, HttpServer};
use chrono::{SecondsFormat, Utc};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::ProxyConfig;
use crate::rate::{parse_payload, SourceError};

/// Path the proxy serves
pub const ROUTE: &str = "/api/tipo-cambio";

/// Header carrying the upstream subscription key
const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

const PROXY_USER_AGENT: &str = "DolarLempira/1.0";

/// Errors that can occur while serving a rate request
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// `BCH_API_KEY` is not configured
    #[error("BCH_API_KEY is not configured")]
    MissingApiKey,

    /// Upstream did not answer in time
    #[error("upstream request timed out")]
    Timeout,

    /// Upstream could not be reached
    #[error("could not connect to upstream: {0}")]
    Connect(String),

    /// Upstream answered with a non-2xx status
    #[error("upstream HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Upstream payload failed validation
    #[error("invalid upstream payload: {0}")]
    Payload(#[from] SourceError),

    /// Any other request failure
    #[error("upstream request failed: {0}")]
    Request(String),
}

impl UpstreamError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_connect() {
            UpstreamError::Connect(e.to_string())
        } else {
            UpstreamError::Request(e.to_string())
        }
    }

    /// HTTP status returned to the client
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            UpstreamError::Connect(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing summary
    pub fn public_message(&self) -> &'static str {
        match self {
            UpstreamError::Timeout => "Timeout: upstream did not respond in time",
            UpstreamError::Connect(_) => "Could not connect to upstream",
            _ => "Failed to fetch exchange rate from upstream",
        }
    }
}

/// JSON body for failed requests
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    timestamp: String,
    status: u16,
}

/// JSON body for disallowed methods
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MethodNotAllowedBody {
    error: &'static str,
    allowed_methods: [&'static str; 1],
}

/// Shared state for request handlers
#[derive(Debug, Clone)]
pub struct ProxyState {
    client: Client,
    config: ProxyConfig,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Fetches and validates the upstream payload, returning the raw JSON body
    async fn fetch_upstream(&self) -> Result<String, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingApiKey)?;

        let response = self
            .client
            .get(&self.config.upstream_url)
            .query(&[("reciente", "1"), ("formato", "json"), ("ordenamiento", "desc")])
            .header(API_KEY_HEADER, api_key)
            .header(USER_AGENT, PROXY_USER_AGENT)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::from_reqwest)?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let record = parse_payload(&body)?;
        info!(valor = record.value(), fecha = record.as_of_date(), "Upstream rate fetched");
        Ok(body)
    }
}

/// Headers attached to every response
pub fn default_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
        .add(("Cache-Control", "s-maxage=3600, stale-while-revalidate"))
}

/// Registers the proxy route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(ROUTE)
            .route(web::get().to(get_rate))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    );
}

async fn get_rate(state: web::Data<ProxyState>) -> HttpResponse {
    match state.fetch_upstream().await {
        Ok(body) => HttpResponse::Ok()
            .content_type("application/json")
            .body(body),
        Err(e) => {
            let status = e.status_code();
            error!(error = %e, status = status.as_u16(), "Error serving {}", ROUTE);
            let body = ErrorBody {
                error: e.public_message(),
                details: state.config.expose_details.then(|| e.to_string()),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                status: status.as_u16(),
            };
            HttpResponse::build(status).json(body)
        }
    }
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(MethodNotAllowedBody {
        error: "Method not allowed",
        allowed_methods: ["GET"],
    })
}

/// Runs the proxy until the server is stopped
pub async fn serve(config: ProxyConfig) -> std::io::Result<()> {
    if config.api_key.is_none() {
        error!("BCH_API_KEY is not configured; every request will fail");
    }
    let bind = config.bind.clone();
    let state = web::Data::new(ProxyState::new(config));

    info!(bind = %bind, route = ROUTE, "Starting rate proxy");
    HttpServer::new(move || {
        actix_web::App::new()
            .app_data(state.clone())
            .wrap(default_headers())
            .configure(configure)
    })
    .bind(bind.as_str())?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve_once, serve_silent};
    use actix_web::test as actix_test;
    use std::time::Duration;

    fn config_for(upstream_url: String) -> ProxyConfig {
        ProxyConfig {
            upstream_url,
            api_key: Some("test-key".to_string()),
            ..ProxyConfig::default()
        }
    }

    macro_rules! proxy_app {
        ($config:expr) => {
            actix_test::init_service(
                actix_web::App::new()
                    .app_data(web::Data::new(ProxyState::new($config)))
                    .wrap(default_headers())
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_options_preflight_returns_200_with_cors() {
        let app = proxy_app!(ProxyConfig::default());
        let req = actix_test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri(ROUTE)
            .to_request();

        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
        assert_eq!(
            resp.headers().get("Cache-Control").unwrap(),
            "s-maxage=3600, stale-while-revalidate"
        );
    }

    #[actix_web::test]
    async fn test_non_get_method_is_rejected() {
        let app = proxy_app!(ProxyConfig::default());
        let req = actix_test::TestRequest::post().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "Method not allowed");
        assert_eq!(body["allowedMethods"][0], "GET");
    }

    #[actix_web::test]
    async fn test_missing_api_key_is_500() {
        let app = proxy_app!(ProxyConfig::default());
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], 500);
        assert!(body["details"].as_str().unwrap().contains("BCH_API_KEY"));
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn test_details_hidden_in_production() {
        let config = ProxyConfig {
            expose_details: false,
            ..ProxyConfig::default()
        };
        let app = proxy_app!(config);
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert!(body.get("details").is_none());
        assert_eq!(body["status"], 500);
    }

    #[actix_web::test]
    async fn test_upstream_payload_is_passed_through() {
        let payload = r#"[{"Valor":24.7012,"Fecha":"2024-03-15T00:00:00"}]"#;
        let upstream = serve_once(200, payload).await;
        let app = proxy_app!(config_for(upstream));
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = actix_test::read_body(resp).await;
        assert_eq!(body, payload.as_bytes());
    }

    #[actix_web::test]
    async fn test_older_entries_are_not_validated() {
        let payload = r#"[{"Valor":24.5,"Fecha":"2024-01-01"},{"Valor":24.4,"Fecha":20240101}]"#;
        let upstream = serve_once(200, payload).await;
        let app = proxy_app!(config_for(upstream));
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_invalid_upstream_payload_is_500() {
        let upstream = serve_once(200, r#"[{"Valor":0,"Fecha":"2024-03-15"}]"#).await;
        let app = proxy_app!(config_for(upstream));
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_upstream_http_error_is_500() {
        let upstream = serve_once(404, r#"{"message":"not found"}"#).await;
        let app = proxy_app!(config_for(upstream));
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], 500);
        assert!(body["details"].as_str().unwrap().contains("404"));
    }

    #[actix_web::test]
    async fn test_unreachable_upstream_is_503() {
        let app = proxy_app!(config_for("http://127.0.0.1:1/cifras".to_string()));
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_silent_upstream_is_504() {
        let upstream = serve_silent().await;
        let config = ProxyConfig {
            timeout: Duration::from_millis(200),
            ..config_for(upstream)
        };
        let app = proxy_app!(config);
        let req = actix_test::TestRequest::get().uri(ROUTE).to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(UpstreamError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            UpstreamError::Connect("refused".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            UpstreamError::MissingApiKey.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
