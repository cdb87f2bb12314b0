//! Shared utilities for integration tests.

use api_guard::config::{ApiKey, ServiceConfig};
use api_guard::HttpServer;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const TEST_KEY: &str = "integration-test-key";

/// A valid config bound to an ephemeral port.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.auth.api_key = ApiKey::new(TEST_KEY);
    config
}

/// Serve `config` on an ephemeral port. Dropping or firing the returned
/// sender stops the server.
#[allow(dead_code)]
pub async fn spawn_server(config: ServiceConfig) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = rx.await;
            })
            .await;
    });

    (addr, tx)
}
