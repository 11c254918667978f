use super::{blocking, ok, ApiResult};
use crate::{AppState, CRATE_NAME};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use junkan_api::{openapi_v1_spec, ApiError, ApiErrorCode, HealthDto, ReadyDto, VersionDto, API_VERSION};
use junkan_store::{MembershipStore, SCHEMA_VERSION};
use std::sync::atomic::Ordering;

pub(crate) async fn landing_handler() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Junkan</title></head><body>\
         <h1>Junkan</h1><p>Invite-only membership service.</p>\
         <p><a href=\"/v1/openapi.json\">API description</a></p></body></html>",
    )
}

pub(crate) async fn healthz_handler() -> ApiResult<HealthDto> {
    ok(HealthDto {
        status: "ok".to_string(),
    })
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> ApiResult<ReadyDto> {
    if !state.accepting_requests.load(Ordering::Relaxed) {
        return Err(ApiError::new(
            ApiErrorCode::NotReady,
            "server is shutting down",
            serde_json::json!({}),
        )
        .into());
    }
    blocking(&state, MembershipStore::ping)
        .await
        .map_err(|_| {
            ApiError::new(
                ApiErrorCode::NotReady,
                "database unavailable",
                serde_json::json!({}),
            )
        })?;
    ok(ReadyDto {
        status: "ready".to_string(),
        schema_version: SCHEMA_VERSION,
    })
}

pub(crate) async fn version_handler() -> Response {
    let mut response = Json(junkan_api::ApiResponseEnvelope::new(VersionDto {
        name: CRATE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: API_VERSION.to_string(),
    }))
    .into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=30"),
    );
    response
}

pub(crate) async fn openapi_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(openapi_v1_spec()))
}
