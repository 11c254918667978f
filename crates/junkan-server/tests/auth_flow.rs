mod support;

use junkan_server::MailKind;
use support::{send_raw, session_cookie, spawn_server, spawn_server_with, MEMBER_PASSWORD};

#[tokio::test]
async fn signup_confirm_approve_signin_reaches_the_feed() {
    let server = spawn_server().await;
    let code = server.mint_admin_invite();

    let (status, body) = server
        .get(&format!("/v1/invites/verify?code={}", code.to_lowercase()), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["referrer_name"], "Junkan Admin");

    let signup = serde_json::json!({
        "last_name": "Sato",
        "first_name": "Hana",
        "email": "Hana@Example.com",
        "password": MEMBER_PASSWORD,
        "question": "I run a small design studio and want to learn.",
        "ref": code,
    })
    .to_string();
    let (status, body) = server.post("/v1/auth/signup", None, &signup).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["confirmation_sent"], true);
    let user_id = body["data"]["user_id"].as_str().expect("user id").to_string();

    let payload = serde_json::json!({"email": "hana@example.com", "password": MEMBER_PASSWORD})
        .to_string();
    let (status, body) = server.post("/v1/auth/signin", None, &payload).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "email_not_confirmed");

    let token = server
        .mailer
        .last_token("hana@example.com", MailKind::ConfirmEmail)
        .expect("confirmation link");
    let (status, head, body) = send_raw(
        server.addr,
        "GET",
        &format!("/v1/auth/confirm?token={token}"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(body.contains("\"next\":\"pending\""));
    let cookie = session_cookie(&head).expect("confirm opens a session");

    let (status, body) = server.get("/v1/feed", Some(&cookie)).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "account_pending");

    let answer = r#"{"answer":"Updated answer about my studio."}"#;
    let (status, body) = server.post("/v1/auth/screening", Some(&cookie), answer).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["next"], "pending");

    let admin = server.admin_cookie().await;
    let (status, body) = server
        .put(
            &format!("/v1/admin/users/{user_id}/status"),
            Some(&admin),
            r#"{"status":"active"}"#,
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["status"], "active");

    let (status, head, body) =
        send_raw(server.addr, "POST", "/v1/auth/signin", &[], Some(&payload)).await;
    assert_eq!(status, 200, "{body}");
    assert!(body.contains("\"redirect\":\"/feed\""));
    let set_cookie = support::header_value(&head, "set-cookie").expect("set-cookie");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let cookie = session_cookie(&head).expect("session cookie");

    let (status, body) = server.get("/v1/feed", Some(&cookie)).await;
    assert_eq!(status, 200, "{body}");
    assert!(body["data"].as_array().is_some());

    let (status, body) = server.get("/v1/me/logins", Some(&cookie)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn pending_members_cannot_sign_in() {
    let server = spawn_server().await;
    server.register_confirmed("pend@example.com").await;
    let payload = serde_json::json!({"email": "pend@example.com", "password": MEMBER_PASSWORD})
        .to_string();
    let (status, head, body) =
        send_raw(server.addr, "POST", "/v1/auth/signin", &[], Some(&payload)).await;
    assert_eq!(status, 403, "{body}");
    assert!(session_cookie(&head).is_none());
    let body = support::json(&body);
    assert_eq!(body["error"]["code"], "account_pending");
    assert_eq!(body["error"]["message"], "account is under review");
}

#[tokio::test]
async fn admins_are_sent_to_the_admin_area() {
    let server = spawn_server().await;
    let payload = serde_json::json!({
        "email": support::ADMIN_EMAIL,
        "password": support::ADMIN_PASSWORD,
    })
    .to_string();
    let (status, body) = server.post("/v1/auth/signin", None, &payload).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["redirect"], "/admin");
}

#[tokio::test]
async fn signup_rejects_bad_input_and_unknown_invites() {
    let server = spawn_server().await;
    let (status, body) = server
        .post("/v1/auth/signup", None, r#"{"email":"nope","password":"short"}"#)
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "validation_failed");
    let fields: Vec<&str> = body["error"]["details"]["field_errors"]
        .as_array()
        .expect("field errors")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"ref"));

    let signup = serde_json::json!({
        "last_name": "Sato",
        "first_name": "Hana",
        "email": "hana@example.com",
        "password": MEMBER_PASSWORD,
        "question": "I run a small design studio and want to learn.",
        "ref": "ZZZZZZZZ",
    })
    .to_string();
    let (status, body) = server.post("/v1/auth/signup", None, &signup).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid_invite_code");

    let (status, body) = server.post("/v1/auth/signup", None, "{not json").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn wrong_password_and_signout_behave() {
    let server = spawn_server().await;
    let (_, cookie) = server.active_member("ken@example.com").await;

    let payload = r#"{"email":"ken@example.com","password":"wrong-pass-9"}"#;
    let (status, body) = server.post("/v1/auth/signin", None, payload).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "invalid_credentials");

    let (status, head, _) = send_raw(
        server.addr,
        "POST",
        "/v1/auth/signout",
        &[("Cookie", cookie.as_str())],
        None,
    )
    .await;
    assert_eq!(status, 200);
    let cleared = support::header_value(&head, "set-cookie").expect("cleared cookie");
    assert!(cleared.contains("Max-Age=0"));

    let (status, body) = server.get("/v1/me/profile", Some(&cookie)).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthenticated");
}

#[tokio::test]
async fn password_reset_mails_a_single_use_link() {
    let server = spawn_server().await;
    server.active_member("mei@example.com").await;

    let (status, body) = server
        .post(
            "/v1/auth/password-reset/request",
            None,
            r#"{"email":"nobody@example.com"}"#,
        )
        .await;
    assert_eq!(status, 404, "{body}");

    let (status, _) = server
        .post(
            "/v1/auth/password-reset/request",
            None,
            r#"{"email":"MEI@example.com"}"#,
        )
        .await;
    assert_eq!(status, 200);
    let token = server
        .mailer
        .last_token("mei@example.com", MailKind::PasswordReset)
        .expect("reset link");

    let reset = serde_json::json!({"token": token, "password": "fresh-pass-2"}).to_string();
    let (status, body) = server.post("/v1/auth/password-reset", None, &reset).await;
    assert_eq!(status, 200, "{body}");
    let (status, body) = server.post("/v1/auth/password-reset", None, &reset).await;
    assert_eq!(status, 422, "{body}");

    server.sign_in("mei@example.com", "fresh-pass-2").await;
}

#[tokio::test]
async fn resend_confirmation_only_for_unconfirmed_addresses() {
    let server = spawn_server().await;
    server.register_confirmed("rin@example.com").await;
    let (status, body) = server
        .post("/v1/auth/confirm/resend", None, r#"{"email":"rin@example.com"}"#)
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, _) = server
        .post("/v1/auth/confirm/resend", None, r#"{"email":"ghost@example.com"}"#)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn signin_is_rate_limited_per_client() {
    let server = spawn_server_with(|cfg| {
        cfg.auth_rate_limit.capacity = 2.0;
        cfg.auth_rate_limit.refill_per_sec = 0.5;
    })
    .await;
    let payload = r#"{"email":"nobody@example.com","password":"whatever-1"}"#;
    for _ in 0..2 {
        let (status, _) = server.post("/v1/auth/signin", None, payload).await;
        assert_eq!(status, 401);
    }
    let (status, head, body) =
        send_raw(server.addr, "POST", "/v1/auth/signin", &[], Some(payload)).await;
    assert_eq!(status, 429);
    assert!(body.contains("rate_limited"));
    assert_eq!(
        support::header_value(&head, "retry-after").as_deref(),
        Some("2")
    );

    let (status, _, _) = send_raw(
        server.addr,
        "POST",
        "/v1/auth/signin",
        &[("X-Forwarded-For", "198.51.100.4")],
        Some(payload),
    )
    .await;
    assert_eq!(status, 401);
}
