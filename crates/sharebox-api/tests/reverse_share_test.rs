//! Integration tests for the public reverse-share upload flow.

mod helpers;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use sharebox_database::ReverseShareStore;
use sharebox_entity::share::ReverseShare;

fn share(alias: &str, owner: Uuid) -> ReverseShare {
    ReverseShare {
        id: Uuid::new_v4(),
        name: Some("Inbox".to_string()),
        alias: Some(alias.to_string()),
        creator_id: owner,
        is_active: true,
        expiration: None,
        password_hash: None,
        max_files: None,
        max_file_size: None,
        allowed_file_types: None,
        created_at: Utc::now(),
    }
}

async fn register(app: &helpers::TestApp, alias: &str, name: &str, size: u64) -> helpers::TestResponse {
    app.send(
        "POST",
        &format!("/api/reverse-shares/alias/{alias}/files"),
        Some(json!({
            "name": name,
            "extension": "txt",
            "size": size,
            "objectName": format!("reverse-shares/{alias}/1-{name}.txt"),
            "uploaderName": "Ada",
        })),
        None,
    )
    .await
}

#[tokio::test]
async fn test_unknown_alias_is_not_found() {
    let app = helpers::TestApp::new();

    let response = app
        .send(
            "POST",
            "/api/reverse-shares/alias/nope/multipart/create",
            Some(json!({ "filename": "a", "extension": "txt" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Reverse share not found");
}

#[tokio::test]
async fn test_multipart_flow() {
    let app = helpers::TestApp::new();
    app.store.add_reverse_share(share("inbox", app.user_id)).await;

    let created = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/multipart/create",
            Some(json!({ "filename": "report", "extension": "pdf" })),
            None,
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let object_name = created.body["objectName"].as_str().unwrap().to_string();
    let upload_id = created.body["uploadId"].as_str().unwrap().to_string();
    assert!(object_name.starts_with("reverse-shares/inbox/"));
    assert!(object_name.ends_with("-report.pdf"));

    let part = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/multipart/part-url",
            Some(json!({ "objectName": object_name, "uploadId": upload_id, "partNumber": 1 })),
            None,
        )
        .await;
    assert_eq!(part.status, StatusCode::OK);
    assert!(part.body["url"].as_str().unwrap().contains("partNumber=1"));

    let complete = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/multipart/complete",
            Some(json!({
                "objectName": object_name,
                "uploadId": upload_id,
                "parts": [{ "partNumber": 1, "eTag": "abc" }],
            })),
            None,
        )
        .await;
    assert_eq!(complete.status, StatusCode::OK);
    assert!(app.objects.get(&object_name).await.is_some());
}

#[tokio::test]
async fn test_part_url_outside_share_scope_is_rejected() {
    let app = helpers::TestApp::new();
    app.store.add_reverse_share(share("inbox", app.user_id)).await;

    let response = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/multipart/part-url",
            Some(json!({ "objectName": "someone/else.txt", "uploadId": "x", "partNumber": 1 })),
            None,
        )
        .await;

    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn test_register_enforces_max_files() {
    let app = helpers::TestApp::new();
    let mut limited = share("inbox", app.user_id);
    limited.max_files = Some(1);
    app.store.add_reverse_share(limited).await;
    app.objects.insert("reverse-shares/inbox/1-one.txt", "one").await;

    let first = register(&app, "inbox", "one", 3).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["name"], "one");

    let second = register(&app, "inbox", "two", 3).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["error"], "Maximum number of files reached");
    assert_eq!(second.body["details"]["maxFiles"], 1);
}

#[tokio::test]
async fn test_register_cannot_claim_another_users_object() {
    let app = helpers::TestApp::new();
    let inbox = share("inbox", app.user_id);
    app.store.add_reverse_share(inbox.clone()).await;
    let victim = Uuid::new_v4();
    let foreign = format!("{victim}/1700000000000-secret.pdf");
    app.objects.insert(&foreign, "victim-data").await;

    let response = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/files",
            Some(json!({
                "name": "secret",
                "extension": "pdf",
                "size": 11,
                "objectName": foreign,
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Object does not belong to this reverse share");
    assert_eq!(app.store.count_files(inbox.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_inactive_share_rejects_uploads() {
    let app = helpers::TestApp::new();
    let mut inactive = share("closed", app.user_id);
    inactive.is_active = false;
    app.store.add_reverse_share(inactive).await;

    let response = register(&app, "closed", "one", 3).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Reverse share is inactive");
}

#[tokio::test]
async fn test_owner_copies_file_into_own_files() {
    let app = helpers::TestApp::new();
    app.store.add_reverse_share(share("inbox", app.user_id)).await;
    app.objects.insert("reverse-shares/inbox/1-one.txt", "abc").await;
    let registered = register(&app, "inbox", "one", 3).await;
    let file_id = registered.body["id"].as_str().unwrap().to_string();

    let stranger = app
        .send(
            "POST",
            &format!("/api/reverse-shares/files/{file_id}/copy"),
            None,
            Some(Uuid::new_v4()),
        )
        .await;
    assert_eq!(stranger.status, StatusCode::FORBIDDEN);
    assert_eq!(stranger.body["error"], "Unauthorized to copy this file");

    let copied = app
        .request("POST", &format!("/api/reverse-shares/files/{file_id}/copy"), None)
        .await;
    assert_eq!(copied.status, StatusCode::OK);
    let target = copied.body["file"]["objectName"].as_str().unwrap();
    assert!(target.starts_with(&format!("{}/", app.user_id)));
    assert_eq!(app.objects.get(target).await.unwrap(), "abc");
    assert_eq!(app.store.file_count().await, 1);
}

#[tokio::test]
async fn test_presigned_upload_url_stays_inside_the_share() {
    let app = helpers::TestApp::new();
    app.store.add_reverse_share(share("inbox", app.user_id)).await;

    let response = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/presigned-url",
            Some(json!({ "objectName": "reverse-shares/inbox/1-notes.txt" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["objectName"], "reverse-shares/inbox/1-notes.txt");
    assert!(
        response.body["url"]
            .as_str()
            .unwrap()
            .contains("reverse-shares/inbox/1-notes.txt?method=PUT")
    );

    let response = app
        .send(
            "POST",
            "/api/reverse-shares/alias/inbox/presigned-url",
            Some(json!({ "objectName": format!("{}/1-avatar.png", Uuid::new_v4()) })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Object does not belong to this reverse share");
}

async fn received_file(app: &helpers::TestApp, share_id: Uuid, name: &str, key: &str) -> Uuid {
    app.objects.insert(key, name.to_uppercase()).await;
    app.store
        .create_file(&sharebox_entity::share::CreateReverseShareFile {
            reverse_share_id: share_id,
            name: name.to_string(),
            extension: "txt".to_string(),
            size: name.len() as i64,
            object_name: key.to_string(),
            uploader_email: None,
            uploader_name: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_reverse_share_bulk_download_is_owner_only() {
    let app = helpers::TestApp::new();
    let mine = share("inbox", app.user_id);
    let theirs = share("elsewhere", Uuid::new_v4());
    app.store.add_reverse_share(mine.clone()).await;
    app.store.add_reverse_share(theirs.clone()).await;

    let a = received_file(&app, mine.id, "a.txt", "reverse-shares/inbox/1-a.txt").await;
    let again = received_file(&app, mine.id, "a.txt", "reverse-shares/inbox/2-a.txt").await;
    let foreign = received_file(&app, theirs.id, "x.txt", "reverse-shares/elsewhere/1-x.txt").await;

    let response = app
        .request(
            "POST",
            "/api/bulk-download/reverse-share",
            Some(json!({ "fileIds": [], "zipName": "inbox" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "No files to download");

    let response = app
        .request(
            "POST",
            "/api/bulk-download/reverse-share",
            Some(json!({ "fileIds": [foreign], "zipName": "inbox" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "No files found or unauthorized");

    let response = app
        .send(
            "POST",
            "/api/bulk-download/reverse-share",
            Some(json!({ "fileIds": [a], "zipName": "inbox" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            "POST",
            "/api/bulk-download/reverse-share",
            Some(json!({ "fileIds": [a, again, foreign], "zipName": "inbox" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/zip");
    assert!(response.header("content-disposition").contains("inbox.zip"));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(response.bytes.to_vec())).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a (2).txt".to_string(), "a.txt".to_string()]);
}
