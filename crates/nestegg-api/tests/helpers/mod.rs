//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p nestegg-api`.

use axum_test::TestServer;
use nestegg_api::setup::routes;
use nestegg_api::AppState;
use nestegg_core::Config;
use nestegg_storage::StorageRegistry;
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server plus the resources it owns.
pub struct TestApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Build an app from explicit environment pairs. `LOCAL_STORAGE_PATH`
/// always points into a fresh temp dir.
pub async fn setup_test_app(vars: &[(&str, &str)]) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().join("uploads");
    let storage_path = storage_path.to_str().expect("temp path is utf-8").to_string();

    let mut pairs: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    pairs.push(("LOCAL_STORAGE_PATH".to_string(), storage_path));

    let config = Config::from_vars(pairs).expect("Failed to build config");
    let storage = StorageRegistry::from_config(&config)
        .await
        .expect("Failed to initialize storage");
    let state = Arc::new(AppState::new(storage));

    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp { server, temp_dir }
}

pub async fn setup_local_app() -> TestApp {
    setup_test_app(&[("STORAGE_PROVIDER", "local")]).await
}

pub async fn setup_s3_app() -> TestApp {
    setup_test_app(&[
        ("STORAGE_PROVIDER", "s3"),
        ("S3_REGION", "us-east-1"),
        ("S3_BUCKET", "nestegg-covers"),
        ("S3_ACCESS_KEY_ID", "AKIDEXAMPLE"),
        ("S3_SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
    ])
    .await
}

/// Minimal PNG signature plus IHDR chunk; contents are never decoded.
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
    ]
}
