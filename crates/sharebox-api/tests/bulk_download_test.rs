//! Integration tests for streamed zip downloads.

mod helpers;

use std::io::{Cursor, Read};

use axum::http::StatusCode;
use serde_json::json;

fn archive_contents(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries.sort();
    entries
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/bulk-download",
            Some(json!({ "fileIds": [], "folderIds": [], "zipName": "x.zip" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "No files or folders to download");
}

#[tokio::test]
async fn test_bulk_download_streams_files_and_folders() {
    let app = helpers::TestApp::new();
    let user = app.user_id;

    let loose = app.store.add_file("a.txt", 3, "u/a", None, user).await;
    let docs = app.store.add_folder("Docs", None, user).await;
    let nested = app.store.add_folder("Deep", Some(docs.id), user).await;
    app.store.add_file("b.txt", 3, "u/b", Some(docs.id), user).await;
    app.store.add_file("c.txt", 3, "u/c", Some(nested.id), user).await;
    app.objects.insert("u/a", "aaa").await;
    app.objects.insert("u/b", "bbb").await;
    app.objects.insert("u/c", "ccc").await;

    let response = app
        .request(
            "POST",
            "/api/bulk-download",
            Some(json!({
                "fileIds": [loose.id],
                "folderIds": [docs.id],
                "zipName": "bundle",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/zip");
    assert!(response.header("content-disposition").contains("bundle.zip"));
    assert_eq!(
        archive_contents(&response.bytes),
        vec![
            ("Docs/Deep/c.txt".to_string(), "ccc".to_string()),
            ("Docs/b.txt".to_string(), "bbb".to_string()),
            ("a.txt".to_string(), "aaa".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_missing_objects_are_left_out() {
    let app = helpers::TestApp::new();
    let user = app.user_id;
    let kept = app.store.add_file("kept.txt", 1, "u/kept", None, user).await;
    let gone = app.store.add_file("gone.txt", 1, "u/gone", None, user).await;
    app.objects.insert("u/kept", "k").await;

    let response = app
        .request(
            "POST",
            "/api/bulk-download",
            Some(json!({ "fileIds": [kept.id, gone.id], "folderIds": [] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("content-disposition").contains("download.zip"));
    assert_eq!(
        archive_contents(&response.bytes),
        vec![("kept.txt".to_string(), "k".to_string())]
    );
}

#[tokio::test]
async fn test_folder_download_uses_relative_paths() {
    let app = helpers::TestApp::new();
    let user = app.user_id;
    let docs = app.store.add_folder("Docs", None, user).await;
    app.store.add_file("b.txt", 3, "u/b", Some(docs.id), user).await;
    app.objects.insert("u/b", "bbb").await;

    let response = app
        .request(
            "GET",
            &format!("/api/bulk-download/folder/{}/Docs", docs.id),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("content-disposition").contains("Docs.zip"));
    assert_eq!(
        archive_contents(&response.bytes),
        vec![("b.txt".to_string(), "bbb".to_string())]
    );
}

#[tokio::test]
async fn test_folder_download_of_foreign_folder_is_not_found() {
    let app = helpers::TestApp::new();
    let docs = app
        .store
        .add_folder("Docs", None, uuid::Uuid::new_v4())
        .await;

    let response = app
        .request(
            "GET",
            &format!("/api/bulk-download/folder/{}/Docs", docs.id),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
