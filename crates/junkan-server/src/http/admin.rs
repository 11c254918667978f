use super::{blocking, ok, ApiResult, JsonBody, Viewer};
use crate::AppState;
use axum::extract::{Path, Query, State};
use junkan_api::{
    parse_content_list_params, AckDto, ApiError, RankUpdateDto, StatusUpdateDto,
    ThumbnailUpdateDto,
};
use junkan_model::{
    Broadcast, BroadcastInput, Content, ContentInput, DashboardStats, Profile, Reward,
    RewardClaim, RewardUpdateInput, ValidationError,
};
use junkan_store::{AdminUser, RewardsOverview};
use std::collections::BTreeMap;

pub(crate) async fn list_contents_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Vec<Content>> {
    let filter = parse_content_list_params(&query)?;
    ok(blocking(&state, move |store| store.all_contents(&filter)).await?)
}

pub(crate) async fn create_content_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(input): JsonBody<ContentInput>,
) -> ApiResult<Content> {
    let draft = input.validate(state.clock.now())?;
    let content = blocking(&state, move |store| {
        store.create_content(Some(&viewer.id), &draft)
    })
    .await?;
    ok(content)
}

pub(crate) async fn update_content_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ContentInput>,
) -> ApiResult<Content> {
    let draft = input.validate(state.clock.now())?;
    ok(blocking(&state, move |store| store.update_content(&id, &draft)).await?)
}

pub(crate) async fn delete_content_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AckDto> {
    let target = id.clone();
    blocking(&state, move |store| store.delete_content(&target)).await?;
    tracing::info!(content_id = %id, "content deleted");
    ok(AckDto::ok())
}

pub(crate) async fn set_thumbnail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ThumbnailUpdateDto>,
) -> ApiResult<Content> {
    let url = input.thumbnail_url.trim().to_string();
    if url.is_empty() {
        return Err(ValidationError::single("thumbnail_url", "thumbnail url is required").into());
    }
    ok(blocking(&state, move |store| store.set_thumbnail(&id, &url)).await?)
}

pub(crate) async fn users_handler(State(state): State<AppState>) -> ApiResult<Vec<AdminUser>> {
    ok(blocking(&state, |store| store.admin_users()).await?)
}

pub(crate) async fn set_user_status_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<StatusUpdateDto>,
) -> ApiResult<Profile> {
    if id == viewer.id {
        return Err(ApiError::forbidden("admins cannot change their own status").into());
    }
    ok(blocking(&state, move |store| store.set_user_status(&id, input.status)).await?)
}

pub(crate) async fn set_user_rank_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<RankUpdateDto>,
) -> ApiResult<Profile> {
    ok(blocking(&state, move |store| store.set_user_rank(&id, input.rank)).await?)
}

pub(crate) async fn dashboard_handler(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let now = state.clock.now();
    ok(blocking(&state, move |store| store.dashboard(now)).await?)
}

pub(crate) async fn rewards_overview_handler(
    State(state): State<AppState>,
) -> ApiResult<RewardsOverview> {
    ok(blocking(&state, |store| store.rewards_overview()).await?)
}

pub(crate) async fn update_reward_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<RewardUpdateInput>,
) -> ApiResult<Reward> {
    let update = input.validate()?;
    ok(blocking(&state, move |store| store.update_reward(&id, &update)).await?)
}

pub(crate) async fn grant_claim_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RewardClaim> {
    ok(blocking(&state, move |store| store.grant_claim(&id)).await?)
}

pub(crate) async fn broadcasts_handler(State(state): State<AppState>) -> ApiResult<Vec<Broadcast>> {
    ok(blocking(&state, |store| store.broadcasts()).await?)
}

pub(crate) async fn send_broadcast_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    JsonBody(input): JsonBody<BroadcastInput>,
) -> ApiResult<Broadcast> {
    let draft = input.validate()?;
    ok(blocking(&state, move |store| store.create_broadcast(&viewer.id, &draft)).await?)
}
