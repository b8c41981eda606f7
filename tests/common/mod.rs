//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cart_service::config::ServiceConfig;
use cart_service::lifecycle::startup::serve;
use cart_service::lifecycle::{Services, Shutdown};
use cart_service::observability::InMemorySink;
use cart_service::CartRepository;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running service bound to an ephemeral port.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub sink: Arc<InMemorySink>,
    pub repository: Arc<CartRepository>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("service did not shut down")
            .unwrap();
    }
}

/// Start the full service with an in-memory telemetry sink.
pub async fn start_service(gauge_interval_secs: u64) -> TestService {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.observability.gauge_interval_secs = gauge_interval_secs;

    let sink = Arc::new(InMemorySink::new());
    let services = Services::build(sink.clone());
    let repository = services.repository.clone();

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        serve(config, listener, services, &server_shutdown).await.unwrap();
    });

    TestService { addr, sink, repository, shutdown, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
