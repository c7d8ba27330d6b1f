#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use waypost_api::{setup::routes::setup_routes, AppState};
use waypost_core::ServerConfig;

/// Test application state
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Setup a test application with the given verbosity and no environment lookups
pub fn setup_test_app(verbosity: i32) -> TestApp {
    setup_test_app_with(verbosity, &[])
}

pub fn setup_test_app_with(verbosity: i32, env: &[(&str, &str)]) -> TestApp {
    let env: Vec<(String, String)> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = ServerConfig::from_lookup(|key| {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("Failed to build test config");
    config.reporter.verbosity.set(verbosity);

    let state = Arc::new(AppState::new(config));
    let router = setup_routes(state.clone());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, state }
}
