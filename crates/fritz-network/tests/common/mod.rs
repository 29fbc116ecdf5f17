//! Common test utilities for client integration tests.

#![allow(dead_code)]

use fritz_core::Credentials;
use fritz_network::mock::MockGateway;
use fritz_network::{ClientConfig, FritzClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const USER: &str = "fritz3141";
pub const PASSWORD: &str = "secret";

pub type MockClient = FritzClient<Arc<MockGateway>>;

/// Route client logs to the test harness (`RUST_LOG=debug` to see them).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config(username: &str, password: &str) -> ClientConfig {
    ClientConfig {
        credentials: Credentials::new(username, password).unwrap(),
        ..ClientConfig::default()
    }
}

/// Same as [`config`] without the background keep-alive.
pub fn config_without_keep_alive(username: &str, password: &str) -> ClientConfig {
    let mut config = config(username, password);
    config.keep_alive.enabled = false;
    config
}

pub fn gateway() -> Arc<MockGateway> {
    Arc::new(MockGateway::new(USER, PASSWORD))
}

pub fn client(gateway: &Arc<MockGateway>) -> MockClient {
    FritzClient::with_transport(Arc::clone(gateway), config(USER, PASSWORD))
}
