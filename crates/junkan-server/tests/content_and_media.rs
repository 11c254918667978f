mod support;

use serde_json::{json, Value};
use support::{send_raw, spawn_server, TestServer};

async fn create_content(server: &TestServer, admin: &str, payload: Value) -> String {
    let (status, body) = server
        .post("/v1/admin/contents", Some(admin), &payload.to_string())
        .await;
    assert_eq!(status, 200, "create content: {body}");
    body["data"]["id"].as_str().expect("content id").to_string()
}

fn find<'a>(items: &'a Value, id: &str) -> Option<&'a Value> {
    items
        .as_array()
        .and_then(|items| items.iter().find(|item| item["id"] == id))
}

#[tokio::test]
async fn premium_content_is_locked_until_the_rank_allows_it() {
    let server = spawn_server().await;
    let admin = server.admin_cookie().await;
    let (member, cookie) = server.active_member("kaito@example.com").await;

    let premium = create_content(
        &server,
        &admin,
        json!({
            "type": "article",
            "title": "Pricing playbook",
            "body": "Only for gold members.",
            "author_name": "Junkan Editors",
            "premium": true,
            "tags": ["sales", "pricing"],
        }),
    )
    .await;
    let open = create_content(
        &server,
        &admin,
        json!({
            "type": "article",
            "title": "Welcome",
            "body": "Hello everyone.",
            "author_name": "Junkan Editors",
            "tags": ["sales"],
        }),
    )
    .await;

    let (status, body) = server.get("/v1/feed", Some(&cookie)).await;
    assert_eq!(status, 200, "{body}");
    let item = find(&body["data"], &premium).expect("premium in feed");
    assert_eq!(item["locked"], true);
    assert_eq!(item["required_rank"], "gold");
    assert!(item["body"].is_null());
    let item = find(&body["data"], &open).expect("open item in feed");
    assert_eq!(item["locked"], false);
    assert_eq!(item["body"], "Hello everyone.");

    let (status, body) = server
        .put(
            &format!("/v1/admin/users/{}/rank", member.id),
            Some(&admin),
            r#"{"rank":"gold"}"#,
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["rank"], "gold");

    let (status, body) = server
        .get(&format!("/v1/contents/{premium}"), Some(&cookie))
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["content"]["locked"], false);
    assert_eq!(body["data"]["content"]["body"], "Only for gold members.");
    assert_eq!(body["data"]["content"]["views"], 1);
    assert_eq!(body["data"]["interaction"]["liked"], false);
    let related = body["data"]["related"].as_array().expect("related");
    assert!(related.iter().any(|item| item["id"] == open.as_str()));
}

#[tokio::test]
async fn likes_bookmarks_and_shares_are_recorded() {
    let server = spawn_server().await;
    let admin = server.admin_cookie().await;
    let (_, cookie) = server.active_member("nao@example.com").await;
    let id = create_content(
        &server,
        &admin,
        json!({
            "type": "external",
            "title": "Industry report",
            "url": "https://example.com/report",
            "author_name": "Guest",
        }),
    )
    .await;

    let like = format!("/v1/contents/{id}/like");
    let (status, body) = server.post(&like, Some(&cookie), "").await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["active"], true);
    let (_, body) = server.get("/v1/me/likes", Some(&cookie)).await;
    assert_eq!(find(&body["data"], &id).map(|item| &item["likes"]), Some(&json!(1)));
    let (_, body) = server.post(&like, Some(&cookie), "").await;
    assert_eq!(body["data"]["active"], false);
    let (_, body) = server.get("/v1/me/likes", Some(&cookie)).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = server
        .post(&format!("/v1/contents/{id}/bookmark"), Some(&cookie), "")
        .await;
    assert_eq!(body["data"]["active"], true);
    let (_, body) = server.get("/v1/me/bookmarks", Some(&cookie)).await;
    assert!(find(&body["data"], &id).is_some());

    let share = format!("/v1/contents/{id}/share");
    let (status, body) = server.post(&share, Some(&cookie), "").await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["condition_completed"], true);
    let (_, body) = server.post(&share, Some(&cookie), "").await;
    assert_eq!(body["data"]["condition_completed"], false);

    let (status, body) = server
        .post("/v1/contents/does-not-exist/like", Some(&cookie), "")
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn drafts_and_future_schedules_stay_out_of_the_feed() {
    let server = spawn_server().await;
    let admin = server.admin_cookie().await;
    let (_, cookie) = server.active_member("emi@example.com").await;
    let draft = create_content(
        &server,
        &admin,
        json!({
            "type": "article",
            "title": "Work in progress",
            "author_name": "Junkan Editors",
            "status": "draft",
        }),
    )
    .await;
    let scheduled = create_content(
        &server,
        &admin,
        json!({
            "type": "video",
            "title": "Launch stream",
            "author_name": "Junkan Editors",
            "publish_date": "2026-06-16T09:00:00Z",
        }),
    )
    .await;

    let (_, body) = server.get("/v1/admin/contents?status=scheduled", Some(&admin)).await;
    let item = find(&body["data"], &scheduled).expect("scheduled listed for admins");
    assert_eq!(item["status"], "scheduled");

    let (_, body) = server.get("/v1/feed", Some(&cookie)).await;
    assert!(find(&body["data"], &draft).is_none());
    assert!(find(&body["data"], &scheduled).is_none());
    let (status, _) = server
        .get(&format!("/v1/contents/{draft}"), Some(&cookie))
        .await;
    assert_eq!(status, 404);

    server.clock.advance(chrono::Duration::days(1));
    let (_, body) = server.get("/v1/feed", Some(&cookie)).await;
    assert!(find(&body["data"], &scheduled).is_some());

    let (status, body) = server
        .call("DELETE", &format!("/v1/admin/contents/{draft}"), Some(&admin), None)
        .await;
    assert_eq!(status, 200, "{body}");
    let (status, _) = server
        .call("DELETE", &format!("/v1/admin/contents/{draft}"), Some(&admin), None)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn invalid_content_lists_every_field_error() {
    let server = spawn_server().await;
    let admin = server.admin_cookie().await;
    let (status, body) = server
        .post(
            "/v1/admin/contents",
            Some(&admin),
            r#"{"type":"external","url":"ftp://nowhere"}"#,
        )
        .await;
    assert_eq!(status, 422);
    let fields: Vec<&str> = body["error"]["details"]["field_errors"]
        .as_array()
        .expect("field errors")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["title", "author_name", "url"]);
}

#[tokio::test]
async fn uploaded_thumbnails_are_served_back() {
    let server = spawn_server().await;
    let admin = server.admin_cookie().await;
    let (status, _, body) = send_raw(
        server.addr,
        "POST",
        "/v1/admin/media/thumbnail?filename=cover.PNG",
        &[("Cookie", admin.as_str()), ("Content-Type", "image/png")],
        Some("not-really-a-png"),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    let body = support::json(&body);
    let upload = &body["data"];
    assert_eq!(upload["bucket"], "thumbnails");
    assert_eq!(upload["content_type"], "image/png");
    assert_eq!(upload["size"], 16);
    let path = upload["path"].as_str().expect("path");
    assert!(path.starts_with("thumbnails/"));
    assert!(path.ends_with(".png"));
    let url = upload["url"].as_str().expect("url");
    assert_eq!(url, format!("/media/thumbnails/{path}"));

    let (status, head, served) = send_raw(server.addr, "GET", url, &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(served, "not-really-a-png");
    assert_eq!(
        support::header_value(&head, "content-type").as_deref(),
        Some("image/png")
    );

    let (status, _, body) = send_raw(
        server.addr,
        "POST",
        "/v1/admin/media/thumbnail",
        &[("Cookie", admin.as_str()), ("Content-Type", "text/plain")],
        Some("hello"),
    )
    .await;
    assert_eq!(status, 415);
    assert!(body.contains("unsupported_media_type"));

    let (status, body) = server.get("/media/thumbnails/nope.png", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");
}
