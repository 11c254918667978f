#![forbid(unsafe_code)]
//! HTTP runtime of the junkan membership service.
//!
//! [`build_router`] wires every `/v1` route behind two layers: request
//! tracing (request id, span, timeout) and the session gate that resolves
//! the caller and enforces public / session / member / admin access.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use junkan_core::ClockPort;
use junkan_store::{MediaStore, MembershipStore};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

mod config;
mod http;
mod mailer;
mod middleware;
mod rate_limiter;

pub use config::{
    validate_startup_config_contract, RateLimitConfig, ServerConfig, DEFAULT_COOKIE_NAME,
};
pub use mailer::{LoggingMailer, MailError, MailKind, Mailer, OutgoingMail, RecordingMailer};

pub const CRATE_NAME: &str = "junkan-server";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MembershipStore>,
    pub media: Arc<dyn MediaStore>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn ClockPort>,
    pub config: Arc<ServerConfig>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) auth_limiter: Arc<rate_limiter::RateLimiter>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<MembershipStore>,
        media: Arc<dyn MediaStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn ClockPort>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            media,
            mailer,
            clock,
            config: Arc::new(config),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            auth_limiter: Arc::new(rate_limiter::RateLimiter::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory_for_tests() -> Self {
        let store = MembershipStore::open_in_memory()
            .expect("in-memory store")
            .with_password_iterations(1);
        let media_root = std::env::temp_dir().join("junkan-server-unit-media");
        Self::new(
            Arc::new(store),
            Arc::new(junkan_store::LocalFsMediaStore::new(media_root, "/media")),
            Arc::new(RecordingMailer::default()),
            Arc::new(junkan_core::SystemClock),
            ServerConfig::default(),
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/", get(http::system::landing_handler))
        .route("/healthz", get(http::system::healthz_handler))
        .route("/readyz", get(http::system::readyz_handler))
        .route("/v1/version", get(http::system::version_handler))
        .route("/v1/openapi.json", get(http::system::openapi_handler))
        .route("/v1/auth/signup", post(http::auth::signup_handler))
        .route("/v1/auth/signin", post(http::auth::signin_handler))
        .route("/v1/auth/signout", post(http::auth::signout_handler))
        .route("/v1/auth/confirm", get(http::auth::confirm_email_handler))
        .route(
            "/v1/auth/confirm/resend",
            post(http::auth::resend_confirmation_handler),
        )
        .route(
            "/v1/auth/password-reset/request",
            post(http::auth::password_reset_request_handler),
        )
        .route(
            "/v1/auth/password-reset",
            post(http::auth::password_reset_handler),
        )
        .route("/v1/auth/screening", post(http::auth::screening_handler))
        .route("/v1/invites/verify", get(http::members::verify_invite_handler))
        .route(
            "/v1/me/invite-code",
            get(http::members::my_invite_code_handler).post(http::members::mint_invite_code_handler),
        )
        .route("/v1/me/invite-slots", get(http::members::invite_slots_handler))
        .route(
            "/v1/me/unlock-conditions",
            get(http::members::unlock_conditions_handler),
        )
        .route("/v1/me/referrals", get(http::members::referral_stats_handler))
        .route(
            "/v1/me/profile",
            get(http::members::profile_handler).put(http::members::update_profile_handler),
        )
        .route(
            "/v1/me/notifications",
            get(http::members::notifications_handler)
                .put(http::members::update_notifications_handler),
        )
        .route("/v1/me/password", post(http::members::change_password_handler))
        .route("/v1/me/logins", get(http::members::login_history_handler))
        .route("/v1/me/feedback", post(http::members::feedback_handler))
        .route("/v1/me/likes", get(http::feed::liked_contents_handler))
        .route("/v1/me/bookmarks", get(http::feed::bookmarked_contents_handler))
        .route("/v1/feed", get(http::feed::feed_handler))
        .route("/v1/contents/:id", get(http::feed::content_detail_handler))
        .route("/v1/contents/:id/like", post(http::feed::like_handler))
        .route("/v1/contents/:id/bookmark", post(http::feed::bookmark_handler))
        .route("/v1/contents/:id/share", post(http::feed::share_handler))
        .route("/v1/recommended", get(http::feed::recommended_handler))
        .route("/v1/broadcasts", get(http::feed::broadcasts_handler))
        .route("/v1/rewards", get(http::feed::rewards_handler))
        .route("/v1/rewards/:id/claim", post(http::feed::claim_reward_handler))
        .route(
            "/v1/admin/contents",
            get(http::admin::list_contents_handler).post(http::admin::create_content_handler),
        )
        .route(
            "/v1/admin/contents/:id",
            put(http::admin::update_content_handler).delete(http::admin::delete_content_handler),
        )
        .route(
            "/v1/admin/contents/:id/thumbnail",
            put(http::admin::set_thumbnail_handler),
        )
        .route(
            "/v1/admin/media/thumbnail",
            post(http::media::upload_thumbnail_handler),
        )
        .route("/v1/admin/media/video", post(http::media::upload_video_handler))
        .route("/v1/admin/users", get(http::admin::users_handler))
        .route(
            "/v1/admin/users/:id/status",
            put(http::admin::set_user_status_handler),
        )
        .route("/v1/admin/users/:id/rank", put(http::admin::set_user_rank_handler))
        .route("/v1/admin/dashboard", get(http::admin::dashboard_handler))
        .route("/v1/admin/rewards", get(http::admin::rewards_overview_handler))
        .route("/v1/admin/rewards/:id", put(http::admin::update_reward_handler))
        .route(
            "/v1/admin/reward-claims/:id/grant",
            post(http::admin::grant_claim_handler),
        )
        .route(
            "/v1/admin/broadcasts",
            get(http::admin::broadcasts_handler).post(http::admin::send_broadcast_handler),
        )
        .route("/media/:bucket/*path", get(http::media::serve_media_handler))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_gate_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
