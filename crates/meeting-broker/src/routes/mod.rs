//! HTTP routes for Meeting Broker.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::BrokerService;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Overall request timeout. Flows finish earlier on their own deadline, so
/// this only cuts off requests that never reach a flow's error path.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Create, token and join flows.
    pub broker: BrokerService,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - `/api/CreateMeeting`, `/api/GetToken`, `/api/JoinMeeting` - Flows
/// - CORS layer answering OPTIONS preflight on every route
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origin);

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/CreateMeeting", post(handlers::create_meeting))
        .route("/api/GetToken", post(handlers::get_token))
        .route("/api/JoinMeeting", post(handlers::join_meeting))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflight, stamp allow-origin on every response
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// CORS policy for browser clients.
///
/// `*` allows any origin; anything else is matched exactly.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = if allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(allowed_origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(
                    target: "mb.routes",
                    "CORS_ALLOWED_ORIGIN is not a valid header value, allowing any origin"
                );
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::identity::mock::MockIdentityProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_router(vars: HashMap<String, String>, configured: bool) -> Router {
        let config = Config::from_vars(&vars).unwrap();
        let provider: Option<Arc<dyn crate::services::IdentityProvider>> = if configured {
            Some(Arc::new(MockIdentityProvider::working()))
        } else {
            None
        };
        let broker = BrokerService::new(provider, config.token_scopes.clone());
        let handle = PrometheusBuilder::new().build_recorder().handle();

        build_routes(Arc::new(AppState { config, broker }), handle)
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_preflight_is_answered() {
        let app = test_router(HashMap::new(), true);

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/CreateMeeting")
            .header("origin", "https://app.example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let methods = response.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
    }

    #[tokio::test]
    async fn test_configured_origin_is_used() {
        let vars = HashMap::from([(
            "CORS_ALLOWED_ORIGIN".to_string(),
            "https://app.example.com".to_string(),
        )]);
        let app = test_router(vars, true);

        let request = Request::builder()
            .method("POST")
            .uri("/api/GetToken")
            .header("origin", "https://app.example.com")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = test_router(HashMap::new(), false);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["acsConfigured"], false);
    }

    #[tokio::test]
    async fn test_slow_provider_yields_failure_envelope() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        let provider: Arc<dyn crate::services::IdentityProvider> =
            Arc::new(MockIdentityProvider::slow(Duration::from_secs(5)));
        let broker = BrokerService::new(Some(provider), config.token_scopes.clone())
            .with_flow_timeout(Duration::from_millis(50));
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = build_routes(Arc::new(AppState { config, broker }), handle);

        let request = Request::builder()
            .method("POST")
            .uri("/api/CreateMeeting")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Failed to create meeting: Identity service did not respond in time"
        );
    }

    #[tokio::test]
    async fn test_flow_routes_reject_get() {
        let app = test_router(HashMap::new(), true);

        let request = Request::builder()
            .method("GET")
            .uri("/api/CreateMeeting")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
