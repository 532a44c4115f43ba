//! Blob upload proxy integration tests against an in-process blob API.
//!
//! Run with: `cargo test -p nestegg-api --test blob_upload_test`

mod helpers;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::put,
    Json, Router,
};
use bytes::Bytes;
use helpers::{png_bytes, setup_local_app, setup_test_app, TestApp};
use serde_json::{json, Value};

const PUBLIC_BASE: &str = "https://store.public.blob.vercel-storage.com";

/// Accepts a put only when it carries the server's token.
async fn blob_put(
    Path(pathname): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    if headers.get("authorization").and_then(|v| v.to_str().ok())
        != Some("Bearer vercel_blob_rw_test")
    {
        return Err(StatusCode::FORBIDDEN);
    }
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({
        "url": format!("{}/{}", PUBLIC_BASE, pathname),
        "pathname": pathname,
        "contentType": headers.get("x-content-type").and_then(|v| v.to_str().ok()),
    })))
}

async fn spawn_blob_api() -> String {
    let app = Router::new().route("/{*pathname}", put(blob_put));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn setup_blob_app(api_url: &str) -> TestApp {
    setup_test_app(&[
        ("STORAGE_PROVIDER", "vercel"),
        ("BLOB_READ_WRITE_TOKEN", "vercel_blob_rw_test"),
        ("BLOB_PUBLIC_URL_BASE", PUBLIC_BASE),
        ("BLOB_API_URL", api_url),
    ])
    .await
}

#[tokio::test]
async fn test_upload_target_points_at_proxy() {
    let app = setup_blob_app("http://127.0.0.1:9").await;

    let response = app
        .client()
        .post("/api/storage/upload-target")
        .json(&json!({ "contentType": "image/gif", "contentLength": 99 }))
        .await;

    assert_eq!(response.status_code(), 200);
    let raw = response.text();
    assert!(!raw.contains("vercel_blob_rw_test"));

    let body: Value = serde_json::from_str(&raw).unwrap();
    let target = &body["target"];
    let key = target["key"].as_str().unwrap();
    assert_eq!(target["provider"], "vercel");
    assert_eq!(target["kind"], "proxy-put");
    assert_eq!(
        target["url"],
        format!("/api/storage/vercel-upload/{}", key).as_str()
    );
    assert_eq!(
        target["publicUrl"],
        format!("{}/{}", PUBLIC_BASE, key).as_str()
    );
}

#[tokio::test]
async fn test_proxy_forwards_to_blob_api() {
    let api_url = spawn_blob_api().await;
    let app = setup_blob_app(&api_url).await;

    let response = app
        .client()
        .put("/api/storage/vercel-upload/goals/covers/abc.png")
        .add_header("Content-Type", "image/png")
        .bytes(Bytes::from(png_bytes()))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["url"], format!("{}/goals/covers/abc.png", PUBLIC_BASE).as_str());
}

#[tokio::test]
async fn test_proxy_surfaces_blob_api_failure() {
    let api_url = spawn_blob_api().await;
    let app = setup_blob_app(&api_url).await;

    let response = app
        .client()
        .put("/api/storage/vercel-upload/goals/covers/empty.png")
        .add_header("Content-Type", "image/png")
        .bytes(Bytes::new())
        .await;

    assert_eq!(response.status_code(), 502);
    let body: Value = response.json();
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_proxy_validates_before_forwarding() {
    let app = setup_blob_app("http://127.0.0.1:9").await;

    let response = app
        .client()
        .put("/api/storage/vercel-upload/goals/covers/abc.bmp")
        .add_header("Content-Type", "image/bmp")
        .bytes(Bytes::from_static(b"BM"))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_proxy_requires_vercel_provider() {
    let app = setup_local_app().await;

    let response = app
        .client()
        .put("/api/storage/vercel-upload/goals/covers/abc.png")
        .add_header("Content-Type", "image/png")
        .bytes(Bytes::from(png_bytes()))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Vercel Blob provider is not enabled.");
}
