// SPDX-License-Identifier: Apache-2.0

use crate::AppState;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use junkan_api::{status_for, ApiError, ApiErrorCode, ApiResponseEnvelope};
use junkan_model::{Profile, ValidationError};
use junkan_store::{MediaError, MembershipStore, StoreError, StoreErrorCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod feed;
pub(crate) mod media;
pub(crate) mod members;
pub(crate) mod system;

/// Error leaving a handler. The request-tracing layer stamps the request id.
#[derive(Debug)]
pub(crate) struct HttpError(pub ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(status_for(self.0.code)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = (status, Json(self.0.to_body())).into_response();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry = self.0.details["retry_after_secs"].as_u64().unwrap_or(5);
            if let Ok(value) = HeaderValue::from_str(&retry.to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        resp.extensions_mut().insert(self.0);
        resp
    }
}

impl From<ApiError> for HttpError {
    fn from(error: ApiError) -> Self {
        Self(error)
    }
}

impl From<ValidationError> for HttpError {
    fn from(error: ValidationError) -> Self {
        Self(ApiError::from(error))
    }
}

impl From<StoreError> for HttpError {
    fn from(error: StoreError) -> Self {
        if matches!(error.code, StoreErrorCode::Internal | StoreErrorCode::Io) {
            tracing::error!(error = %error, "store failure");
        }
        Self(ApiError::from(error))
    }
}

impl From<MediaError> for HttpError {
    fn from(error: MediaError) -> Self {
        Self(ApiError::from(error))
    }
}

pub(crate) type ApiResult<T> = Result<Json<ApiResponseEnvelope<T>>, HttpError>;

pub(crate) fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponseEnvelope::new(data)))
}

/// Runs store work off the async executor.
pub(crate) async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, HttpError>
where
    F: FnOnce(&MembershipStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || work(&store))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "store task failed");
            HttpError(ApiError::internal())
        })?
        .map_err(HttpError::from)
}

pub(crate) fn body_rejection(e: BytesRejection) -> HttpError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HttpError(ApiError::new(
            ApiErrorCode::PayloadTooLarge,
            "request body too large",
            serde_json::json!({}),
        ))
    } else {
        HttpError(ApiError::invalid_body(e.body_text()))
    }
}

/// JSON request body whose failures use the API error envelope.
pub(crate) struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(body_rejection)?;
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| HttpError(ApiError::invalid_body(e.to_string())))
    }
}

/// The signed-in profile resolved by the session layer.
#[derive(Debug, Clone)]
pub(crate) struct Viewer(pub Profile);

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<crate::middleware::CurrentUser>()
            .map(|user| Self(user.0.clone()))
            .ok_or_else(|| HttpError(ApiError::unauthenticated()))
    }
}

pub(crate) fn session_cookie(state: &AppState, token: &str, max_age_secs: u64) -> HeaderValue {
    let mut cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}",
        state.config.cookie_name
    );
    if state.config.secure_cookies {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// First `x-forwarded-for` hop, else the peer address.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.chars().take(200).collect())
}
