use super::{blocking, ok, ApiResult, JsonBody, Viewer};
use crate::AppState;
use axum::extract::{Query, State};
use junkan_api::{required_param, AckDto, ConditionDto, InviteCodeDto};
use junkan_model::{
    ChangePasswordInput, FeedbackInput, InviteCode, InviteSlots, InviteVerification, LoginEntry,
    NotificationPreferences, Profile, ProfileUpdateInput, ReferralStats, UnlockConditionState,
};
use std::collections::BTreeMap;

const LOGIN_HISTORY_LIMIT: usize = 10;

/// A successful check also counts as a click on the invite link.
pub(crate) async fn verify_invite_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<InviteVerification> {
    let code = required_param(&query, "code")?;
    let verification = blocking(&state, move |store| {
        let verification = store.verify_invite_code(&code)?;
        if verification.valid {
            store.record_invite_click(&code)?;
        }
        Ok(verification)
    })
    .await?;
    ok(verification)
}

pub(crate) async fn my_invite_code_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<InviteCodeDto> {
    let code = blocking(&state, move |store| store.my_invite_code(&viewer.id)).await?;
    ok(InviteCodeDto { code })
}

pub(crate) async fn mint_invite_code_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<InviteCode> {
    ok(blocking(&state, move |store| store.generate_invite_code(&viewer.id)).await?)
}

pub(crate) async fn invite_slots_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<InviteSlots> {
    ok(blocking(&state, move |store| store.invite_slots(&viewer.id)).await?)
}

pub(crate) async fn unlock_conditions_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<UnlockConditionState>> {
    ok(blocking(&state, move |store| store.unlock_conditions(&viewer.id)).await?)
}

pub(crate) async fn referral_stats_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<ReferralStats> {
    ok(blocking(&state, move |store| store.referral_stats(&viewer.id)).await?)
}

pub(crate) async fn profile_handler(Viewer(viewer): Viewer) -> ApiResult<Profile> {
    ok(viewer)
}

pub(crate) async fn update_profile_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(input): JsonBody<ProfileUpdateInput>,
) -> ApiResult<Profile> {
    let update = input.validate()?;
    ok(blocking(&state, move |store| store.update_profile(&viewer.id, &update)).await?)
}

pub(crate) async fn notifications_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<NotificationPreferences> {
    ok(blocking(&state, move |store| store.notification_preferences(&viewer.id)).await?)
}

pub(crate) async fn update_notifications_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(prefs): JsonBody<NotificationPreferences>,
) -> ApiResult<NotificationPreferences> {
    ok(blocking(&state, move |store| {
        store.update_notification_preferences(&viewer.id, &prefs)
    })
    .await?)
}

pub(crate) async fn change_password_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(input): JsonBody<ChangePasswordInput>,
) -> ApiResult<AckDto> {
    let change = input.validate()?;
    blocking(&state, move |store| {
        store.change_password(&viewer.id, &change.current_password, &change.new_password)
    })
    .await?;
    ok(AckDto::ok())
}

pub(crate) async fn login_history_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<LoginEntry>> {
    ok(blocking(&state, move |store| {
        store.login_history(&viewer.id, LOGIN_HISTORY_LIMIT)
    })
    .await?)
}

pub(crate) async fn feedback_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(input): JsonBody<FeedbackInput>,
) -> ApiResult<ConditionDto> {
    let message = input.validate()?;
    let condition_completed =
        blocking(&state, move |store| store.submit_feedback(&viewer.id, &message)).await?;
    ok(ConditionDto {
        condition_completed,
    })
}
