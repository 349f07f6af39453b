//! Test server harness for E2E testing
//!
//! Provides `TestBrokerServer` for spawning real broker instances in tests.

use meeting_broker::config::Config;
use meeting_broker::observability::metrics::init_metrics_recorder;
use meeting_broker::routes::{self, AppState};
use meeting_broker::services::{BrokerService, IdentityProvider};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Access key shared by harness-built connection strings ("test-access-key").
pub const TEST_ACCESS_KEY: &str = "dGVzdC1hY2Nlc3Mta2V5";

/// Global metrics handle for test servers.
///
/// The recorder can only be installed once per process, so every server in
/// a test binary shares it.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Meeting Broker in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestBrokerServer::spawn(None).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestBrokerServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestBrokerServer {
    /// Spawn a server over `provider` with default configuration.
    ///
    /// `None` starts the server without an identity provider, as when
    /// `ACS_CONNECTION_STRING` is unset.
    pub async fn spawn(provider: Option<Arc<dyn IdentityProvider>>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new(), provider).await
    }

    /// Spawn a server over `provider` with extra environment variables.
    pub async fn spawn_with_vars(
        vars: HashMap<String, String>,
        provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self, anyhow::Error> {
        let config = test_config(vars)?;
        let broker = BrokerService::new(provider, config.token_scopes.clone());

        Self::start(config, broker).await
    }

    /// Spawn a server that talks to a real ACS-compatible endpoint
    /// (typically a `wiremock::MockServer`) through `AcsIdentityClient`.
    pub async fn spawn_with_acs(
        endpoint: &str,
        mut vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        vars.insert(
            "ACS_CONNECTION_STRING".to_string(),
            format!("endpoint={}/;accesskey={}", endpoint, TEST_ACCESS_KEY),
        );

        let config = test_config(vars)?;
        let broker = BrokerService::from_config(&config)
            .map_err(|e| anyhow::anyhow!("Failed to create ACS client: {}", e))?;

        Self::start(config, broker).await
    }

    async fn start(config: Config, broker: BrokerService) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState {
            config: config.clone(),
            broker,
        });

        // Build routes using meeting-broker's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestBrokerServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends
        self._handle.abort();
    }
}

/// Build a test configuration, binding to 127.0.0.1:0 unless overridden.
fn test_config(mut vars: HashMap<String, String>) -> Result<Config, anyhow::Error> {
    vars.entry("BIND_ADDRESS".to_string())
        .or_insert_with(|| "127.0.0.1:0".to_string());

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}
