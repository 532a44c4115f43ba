//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use nestegg_core::constants::MAX_UPLOAD_BYTES;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    // Upload routes buffer the whole body; anything over the cap is rejected
    // by the extractor before it is read in full.
    let upload_routes = Router::new()
        .route(
            "/api/storage/local-upload/{*key}",
            put(handlers::local_upload::put_local_upload),
        )
        .route(
            "/api/storage/vercel-upload/{*key}",
            put(handlers::blob_upload::put_blob_upload),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize));

    Router::new()
        .route(
            "/api/storage/upload-target",
            post(handlers::upload_target::create_upload_target),
        )
        .route(
            "/api/storage/local-file/{*key}",
            get(handlers::local_file::get_local_file),
        )
        .merge(upload_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
