//! Integration tests for presigned URLs, object management and proxied transfers.

mod helpers;

use axum::http::StatusCode;

#[tokio::test]
async fn test_missing_object_name_is_rejected() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/storage/upload-url", None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "objectName is required");
    assert_eq!(response.body["kind"], "VALIDATION");
}

#[tokio::test]
async fn test_requests_without_identity_are_refused() {
    let app = helpers::TestApp::new();

    let response = app
        .send("GET", "/api/storage/exists?objectName=a.txt", None, None)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_external_storage_returns_presigned_urls() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "GET",
            "/api/storage/upload-url?objectName=u%2Fa.txt&expiresIn=60",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["proxied"], false);
    assert_eq!(response.body["objectName"], "u/a.txt");
    assert_eq!(response.body["expiresIn"], 60);
    assert!(
        response.body["url"]
            .as_str()
            .unwrap()
            .starts_with("memory://bucket/u/a.txt?method=PUT")
    );
}

#[tokio::test]
async fn test_internal_storage_returns_proxy_urls() {
    let app = helpers::TestApp::internal();
    app.objects.insert("u/a b.txt", "x").await;

    let upload = app
        .request("GET", "/api/storage/upload-url?objectName=u%2Fa%20b.txt", None)
        .await;
    assert_eq!(upload.status, StatusCode::OK);
    assert_eq!(upload.body["proxied"], true);
    assert_eq!(
        upload.body["url"],
        "/api/files/upload?objectName=u%2Fa%20b.txt"
    );

    let download = app
        .request(
            "GET",
            "/api/storage/download-url?objectName=u%2Fa%20b.txt&fileName=report.txt",
            None,
        )
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(
        download.body["url"],
        "/api/files/download?objectName=u%2Fa%20b.txt&fileName=report.txt"
    );
}

#[tokio::test]
async fn test_download_url_for_absent_object_is_not_found() {
    let app = helpers::TestApp::new();

    let response = app
        .request("GET", "/api/storage/download-url?objectName=missing", None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "File not found");
}

#[tokio::test]
async fn test_exists_and_delete() {
    let app = helpers::TestApp::new();
    app.objects.insert("u/a.txt", "hello").await;

    let exists = app
        .request("GET", "/api/storage/exists?objectName=u/a.txt", None)
        .await;
    assert_eq!(exists.body["exists"], true);

    let deleted = app
        .request("DELETE", "/api/storage/object?objectName=u/a.txt", None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Object deleted successfully");
    assert!(app.objects.get("u/a.txt").await.is_none());

    let exists = app
        .request("GET", "/api/storage/exists?objectName=u/a.txt", None)
        .await;
    assert_eq!(exists.body["exists"], false);
}

#[tokio::test]
async fn test_public_url_in_internal_mode_needs_storage_url() {
    let app = helpers::TestApp::internal();

    let response = app
        .request("GET", "/api/storage/public-url?objectName=u/a.txt", None)
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["kind"], "CONFIGURATION");
}

#[tokio::test]
async fn test_proxied_upload_then_download() {
    let app = helpers::TestApp::internal();

    let upload = app
        .send_bytes("PUT", "/api/files/upload?objectName=u/notes.txt", b"hello world")
        .await;
    assert_eq!(upload.status, StatusCode::OK);
    assert_eq!(upload.body["size"], 11);
    assert_eq!(app.objects.get("u/notes.txt").await.unwrap(), "hello world");

    let download = app
        .send("GET", "/api/files/download?objectName=u/notes.txt", None, Some(app.user_id))
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(&download.bytes[..], b"hello world");
    assert_eq!(download.header("content-type"), "text/plain");
    assert!(download.header("content-disposition").contains("notes.txt"));
}

#[tokio::test]
async fn test_proxied_upload_over_limit_is_rejected() {
    let app = helpers::TestApp::with_config(true, |config| {
        config.server.max_upload_size_bytes = 4;
    });

    let upload = app
        .send_bytes("PUT", "/api/files/upload?objectName=u/big.bin", b"too large")
        .await;

    assert_eq!(upload.status, StatusCode::BAD_REQUEST);
    assert_eq!(upload.body["details"]["maxFileSize"], 4);
    assert!(app.objects.is_empty().await);
}

#[tokio::test]
async fn test_health_reports_storage() {
    let app = helpers::TestApp::internal();

    let response = app.send("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["storage"], "memory");
    assert_eq!(response.body["internalStorage"], true);
}
