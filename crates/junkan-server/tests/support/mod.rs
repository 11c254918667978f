#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use junkan_core::FixedClock;
use junkan_model::{Profile, UnlockCondition};
use junkan_server::{build_router, AppState, MailKind, RecordingMailer, ServerConfig};
use junkan_store::{LocalFsMediaStore, MembershipStore};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const ADMIN_EMAIL: &str = "admin@junkan.test";
pub const ADMIN_PASSWORD: &str = "admin-pass-1";
pub const MEMBER_PASSWORD: &str = "member-pass-1";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<FixedClock>,
    pub admin: Profile,
    _dir: TempDir,
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(|_| {}).await
}

pub async fn spawn_server_with(edit: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc
        .with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
        .single()
        .expect("fixture time");
    let clock = Arc::new(FixedClock::new(now));
    let mut config = ServerConfig {
        db_path: dir.path().join("junkan.sqlite"),
        media_root: dir.path().join("media"),
        public_base_url: "http://junkan.test".to_string(),
        ..ServerConfig::default()
    };
    edit(&mut config);

    let store = MembershipStore::open(&config.db_path)
        .expect("open store")
        .with_clock(clock.clone())
        .with_password_iterations(1);
    store.seed_default_rewards().expect("seed rewards");
    let admin = store
        .create_admin(ADMIN_EMAIL, ADMIN_PASSWORD, "Junkan Admin")
        .expect("create admin");
    let media = LocalFsMediaStore::new(config.media_root.clone(), "/media");
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        Arc::new(store),
        Arc::new(media),
        mailer.clone(),
        clock.clone(),
        config,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    TestServer {
        addr,
        state,
        mailer,
        clock,
        admin,
        _dir: dir,
    }
}

pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    let has_content_type = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    if let Some(payload) = body {
        if !has_content_type {
            req.push_str("Content-Type: application/json\r\n");
        }
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    } else if matches!(method, "POST" | "PUT") {
        req.push_str("Content-Length: 0\r\n");
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    if let Some(payload) = body {
        req.push_str(payload);
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("json body ({e}): {body}"))
}

pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim()
            .eq_ignore_ascii_case(name)
            .then(|| v.trim().to_string())
    })
}

/// `name=value` pair of the session cookie set by the response.
pub fn session_cookie(head: &str) -> Option<String> {
    header_value(head, "set-cookie")
        .and_then(|v| v.split(';').next().map(str::to_string))
        .filter(|pair| pair.starts_with("junkan_session=") && pair.len() > "junkan_session=".len())
}

impl TestServer {
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> (u16, Value) {
        self.call("GET", path, cookie, None).await
    }

    pub async fn post(&self, path: &str, cookie: Option<&str>, body: &str) -> (u16, Value) {
        self.call("POST", path, cookie, Some(body)).await
    }

    pub async fn put(&self, path: &str, cookie: Option<&str>, body: &str) -> (u16, Value) {
        self.call("PUT", path, cookie, Some(body)).await
    }

    pub async fn call(
        &self,
        method: &str,
        path: &str,
        cookie: Option<&str>,
        body: Option<&str>,
    ) -> (u16, Value) {
        let headers: Vec<(&str, &str)> = cookie.map(|c| ("Cookie", c)).into_iter().collect();
        let (status, _, body) = send_raw(self.addr, method, path, &headers, body).await;
        (status, json(&body))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> String {
        let payload = serde_json::json!({"email": email, "password": password}).to_string();
        let (status, head, body) =
            send_raw(self.addr, "POST", "/v1/auth/signin", &[], Some(&payload)).await;
        assert_eq!(status, 200, "sign-in failed: {body}");
        session_cookie(&head).expect("session cookie")
    }

    pub async fn admin_cookie(&self) -> String {
        self.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Completes unlock conditions on demand so the admin never runs dry.
    pub fn mint_admin_invite(&self) -> String {
        let store = &self.state.store;
        let slots = store.invite_slots(&self.admin.id).expect("slots");
        if slots.remaining() == 0 {
            let unlocked = UnlockCondition::ALL.iter().copied().any(|condition| {
                store
                    .complete_condition(&self.admin.id, condition)
                    .expect("complete condition")
            });
            assert!(unlocked, "admin ran out of invite slots");
        }
        store
            .generate_invite_code(&self.admin.id)
            .expect("mint invite")
            .code
    }

    /// Signs up with a fresh admin invite and confirms the address; the
    /// member stays pending.
    pub async fn register_confirmed(&self, email: &str) -> Profile {
        let code = self.mint_admin_invite();
        let payload = serde_json::json!({
            "last_name": "Sato",
            "first_name": "Hana",
            "email": email,
            "password": MEMBER_PASSWORD,
            "question": "I run a small design studio and want to learn.",
            "ref": code,
        })
        .to_string();
        let (status, body) = self.post("/v1/auth/signup", None, &payload).await;
        assert_eq!(status, 200, "signup failed: {body}");
        let token = self
            .mailer
            .last_token(email, MailKind::ConfirmEmail)
            .expect("confirmation mail");
        let (status, body) = self
            .get(&format!("/v1/auth/confirm?token={token}"), None)
            .await;
        assert_eq!(status, 200, "confirm failed: {body}");
        self.state.store.profile_by_email(email).expect("profile")
    }

    /// Registered, confirmed and approved; returns the session cookie.
    pub async fn active_member(&self, email: &str) -> (Profile, String) {
        let profile = self.register_confirmed(email).await;
        let profile = self
            .state
            .store
            .set_user_status(&profile.id, junkan_model::UserStatus::Active)
            .expect("approve");
        let cookie = self.sign_in(email, MEMBER_PASSWORD).await;
        (profile, cookie)
    }
}
