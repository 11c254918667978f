// SPDX-License-Identifier: Apache-2.0

use super::{body_rejection, ok, ApiResult, HttpError};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use junkan_api::MediaUploadDto;
use junkan_store::{media_object_path, UploadPolicy, THUMBNAIL_POLICY, VIDEO_POLICY};
use std::collections::BTreeMap;

const UPLOAD_SUFFIX_LEN: usize = 6;

async fn upload(
    state: &AppState,
    policy: &UploadPolicy,
    query: &BTreeMap<String, String>,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<MediaUploadDto> {
    let bytes = body.map_err(body_rejection)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    policy.check(content_type, bytes.len())?;
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(UPLOAD_SUFFIX_LEN)
        .collect();
    let path = media_object_path(
        policy,
        query.get("filename").map(String::as_str),
        state.clock.now().timestamp_millis(),
        &suffix,
    );
    let stored = state
        .media
        .put(policy.bucket, &path, &essence, &bytes)
        .await?;
    tracing::info!(
        backend = state.media.backend_tag(),
        bucket = %stored.bucket,
        path = %stored.path,
        size = stored.size,
        "media uploaded"
    );
    ok(MediaUploadDto::from(stored))
}

pub(crate) async fn upload_thumbnail_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<MediaUploadDto> {
    upload(&state, &THUMBNAIL_POLICY, &query, &headers, body).await
}

pub(crate) async fn upload_video_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<MediaUploadDto> {
    upload(&state, &VIDEO_POLICY, &query, &headers, body).await
}

pub(crate) async fn serve_media_handler(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    let object = state.media.get(&bucket, &path).await?;
    let content_type = HeaderValue::from_str(&object.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            ),
        ],
        object.bytes,
    )
        .into_response())
}
