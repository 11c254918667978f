// SPDX-License-Identifier: Apache-2.0

use super::{
    blocking, client_ip, ok, session_cookie, user_agent, ApiResult, HttpError, JsonBody, Viewer,
};
use crate::mailer::{MailKind, OutgoingMail};
use crate::middleware::SessionToken;
use crate::AppState;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use junkan_api::{
    required_param, AckDto, ApiError, ApiErrorCode, ApiResponseEnvelope, ConfirmEmailResponseDto,
    EmailRequestDto, NextStep, PasswordResetDto, SignInResponseDto, SignUpResponseDto,
};
use junkan_model::{
    validate_email, Profile, ScreeningAnswerInput, SignInInput, SignUpInput, UserStatus,
};
use std::collections::BTreeMap;
use std::net::SocketAddr;

async fn send_link(state: &AppState, to: &str, kind: MailKind, link: String) -> bool {
    let mail = OutgoingMail {
        to: to.to_string(),
        kind,
        link,
    };
    match state.mailer.send(mail).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                backend = state.mailer.backend_tag(),
                kind = kind.as_str(),
                error = %e,
                "mail delivery failed"
            );
            false
        }
    }
}

async fn send_confirmation(state: &AppState, to: &str, token: &str) -> bool {
    let link = format!(
        "{}/v1/auth/confirm?token={token}",
        state.config.public_base_url
    );
    send_link(state, to, MailKind::ConfirmEmail, link).await
}

/// Opens a session for `profile` and renders `body` with its cookie.
async fn with_new_session<T: serde::Serialize>(
    state: &AppState,
    profile: &Profile,
    body: T,
) -> Result<Response, HttpError> {
    let ttl = chrono::Duration::from_std(state.config.session_ttl)
        .map_err(|_| HttpError(ApiError::internal()))?;
    let user_id = profile.id.clone();
    let token = blocking(state, move |store| store.create_session(&user_id, ttl)).await?;
    let cookie = session_cookie(state, &token, state.config.session_ttl.as_secs());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponseEnvelope::new(body)),
    )
        .into_response())
}

pub(crate) async fn signup_handler(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignUpInput>,
) -> ApiResult<SignUpResponseDto> {
    let signup = input.validate()?;
    let registration = blocking(&state, move |store| store.register_member(&signup)).await?;
    let profile = registration.profile;
    let confirmation_sent =
        send_confirmation(&state, &profile.email, &registration.confirmation_token).await;
    ok(SignUpResponseDto {
        user_id: profile.id,
        member_id: profile.member_id,
        status: profile.status,
        confirmation_sent,
    })
}

pub(crate) async fn signin_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<SignInInput>,
) -> Result<Response, HttpError> {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let limit = &state.config.auth_rate_limit;
    let key = ip.clone().unwrap_or_else(|| "unknown".to_string());
    if !state.auth_limiter.allow(&key, limit).await {
        let retry_after = (1.0 / limit.refill_per_sec).ceil().max(1.0) as u64;
        tracing::warn!(client_ip = %key, "sign-in rate limited");
        return Err(ApiError::rate_limited(retry_after).into());
    }
    let credentials = input.validate()?;
    let profile = blocking(&state, move |store| {
        store.authenticate(&credentials.email, &credentials.password)
    })
    .await?;
    if !profile.email_confirmed {
        return Err(ApiError::new(
            ApiErrorCode::EmailNotConfirmed,
            "email address has not been confirmed",
            serde_json::json!({}),
        )
        .into());
    }
    match profile.status {
        UserStatus::Active => {}
        UserStatus::Pending => {
            return Err(ApiError::new(
                ApiErrorCode::AccountPending,
                "account is under review",
                serde_json::json!({}),
            )
            .into());
        }
        UserStatus::Suspended => {
            return Err(ApiError::new(
                ApiErrorCode::AccountSuspended,
                "account is suspended",
                serde_json::json!({}),
            )
            .into());
        }
    }
    let user_id = profile.id.clone();
    let device = user_agent(&headers);
    blocking(&state, move |store| {
        store.record_login(&user_id, device.as_deref(), ip.as_deref())
    })
    .await?;
    tracing::info!(user_id = %profile.id, "signed in");
    with_new_session(&state, &profile, SignInResponseDto::for_profile(&profile)).await
}

pub(crate) async fn signout_handler(
    State(state): State<AppState>,
    token: Option<Extension<SessionToken>>,
) -> Result<Response, HttpError> {
    if let Some(Extension(SessionToken(token))) = token {
        blocking(&state, move |store| store.delete_session(&token)).await?;
    }
    Ok((
        [(header::SET_COOKIE, session_cookie(&state, "", 0))],
        Json(ApiResponseEnvelope::new(AckDto::ok())),
    )
        .into_response())
}

/// Confirms the address and signs the member in so the next step
/// (usually screening) can follow.
pub(crate) async fn confirm_email_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Response, HttpError> {
    let token = required_param(&query, "token")?;
    let profile = blocking(&state, move |store| store.confirm_email(&token)).await?;
    let next = NextStep::for_profile(&profile);
    tracing::info!(user_id = %profile.id, next = ?next, "email confirmed");
    with_new_session(&state, &profile, ConfirmEmailResponseDto { next }).await
}

pub(crate) async fn resend_confirmation_handler(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<EmailRequestDto>,
) -> ApiResult<AckDto> {
    let email = validate_email(&input.email)?;
    let lookup = email.clone();
    let token = blocking(&state, move |store| store.resend_confirmation(&lookup)).await?;
    send_confirmation(&state, &email, &token).await;
    ok(AckDto::ok())
}

pub(crate) async fn password_reset_request_handler(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<EmailRequestDto>,
) -> ApiResult<AckDto> {
    let email = validate_email(&input.email)?;
    let lookup = email.clone();
    let token = blocking(&state, move |store| store.request_password_reset(&lookup)).await?;
    let link = format!(
        "{}/reset-password?token={token}",
        state.config.public_base_url
    );
    send_link(&state, &email, MailKind::PasswordReset, link).await;
    ok(AckDto::ok())
}

pub(crate) async fn password_reset_handler(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PasswordResetDto>,
) -> ApiResult<AckDto> {
    let (token, password) = input.validate()?;
    blocking(&state, move |store| store.reset_password(&token, &password)).await?;
    ok(AckDto::ok())
}

pub(crate) async fn screening_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(input): JsonBody<ScreeningAnswerInput>,
) -> ApiResult<ConfirmEmailResponseDto> {
    let answer = input.validate()?;
    let user_id = viewer.id.clone();
    blocking(&state, move |store| {
        store.submit_screening_answer(&user_id, &answer)?;
        store.profile(&user_id)
    })
    .await
    .and_then(|profile| {
        ok(ConfirmEmailResponseDto {
            next: NextStep::for_profile(&profile),
        })
    })
}
