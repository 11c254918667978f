use super::{blocking, ok, ApiResult, Viewer};
use crate::AppState;
use axum::extract::{Path, Query, State};
use junkan_api::{parse_recommended_limit, ConditionDto, ContentDetailDto, FeedItemDto, ToggleDto};
use junkan_model::{Broadcast, Content, InteractionType, MemberRewardView, Profile, RewardClaim};
use std::collections::BTreeMap;

const RELATED_LIMIT: usize = 3;

fn feed_items(contents: Vec<Content>, viewer: &Profile) -> Vec<FeedItemDto> {
    contents
        .into_iter()
        .map(|content| FeedItemDto::for_viewer(content, viewer))
        .collect()
}

pub(crate) async fn feed_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<FeedItemDto>> {
    let now = state.clock.now();
    let contents = blocking(&state, move |store| store.live_contents(now)).await?;
    ok(feed_items(contents, &viewer))
}

/// Drafts and future schedules are invisible to members.
pub(crate) async fn content_detail_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<ContentDetailDto> {
    let now = state.clock.now();
    let user_id = viewer.id.clone();
    let is_admin = viewer.is_admin();
    let (content, related, interaction) = blocking(&state, move |store| {
        let content = store.content(&id)?;
        if !content.is_live(now) && !is_admin {
            return Err(junkan_store::StoreError::not_found("content"));
        }
        let content = store.record_view(&user_id, &content.id)?;
        let related = store.related_contents(&content, RELATED_LIMIT, now)?;
        let interaction = store.interaction_state(&user_id, &content.id)?;
        Ok((content, related, interaction))
    })
    .await?;
    ok(ContentDetailDto {
        content: FeedItemDto::for_viewer(content, &viewer),
        related: feed_items(related, &viewer),
        interaction,
    })
}

async fn toggle(
    state: AppState,
    viewer: Profile,
    id: String,
    kind: InteractionType,
) -> ApiResult<ToggleDto> {
    let active = blocking(&state, move |store| {
        store.toggle_interaction(&viewer.id, &id, kind)
    })
    .await?;
    ok(ToggleDto { active })
}

pub(crate) async fn like_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<ToggleDto> {
    toggle(state, viewer, id, InteractionType::Like).await
}

pub(crate) async fn bookmark_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<ToggleDto> {
    toggle(state, viewer, id, InteractionType::Bookmark).await
}

pub(crate) async fn share_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<ConditionDto> {
    let condition_completed =
        blocking(&state, move |store| store.record_share(&viewer.id, &id)).await?;
    ok(ConditionDto {
        condition_completed,
    })
}

async fn interacted(
    state: AppState,
    viewer: Profile,
    kind: InteractionType,
) -> ApiResult<Vec<FeedItemDto>> {
    let user_id = viewer.id.clone();
    let contents = blocking(&state, move |store| store.interacted_contents(&user_id, kind)).await?;
    ok(feed_items(contents, &viewer))
}

pub(crate) async fn liked_contents_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<FeedItemDto>> {
    interacted(state, viewer, InteractionType::Like).await
}

pub(crate) async fn bookmarked_contents_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<FeedItemDto>> {
    interacted(state, viewer, InteractionType::Bookmark).await
}

pub(crate) async fn recommended_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Vec<FeedItemDto>> {
    let limit = parse_recommended_limit(&query)?;
    let now = state.clock.now();
    let contents = blocking(&state, move |store| store.recommended(limit, now)).await?;
    ok(feed_items(contents, &viewer))
}

pub(crate) async fn broadcasts_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<Broadcast>> {
    ok(blocking(&state, move |store| store.broadcasts_for(viewer.rank)).await?)
}

pub(crate) async fn rewards_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> ApiResult<Vec<MemberRewardView>> {
    ok(blocking(&state, move |store| store.claimable_rewards(&viewer.id)).await?)
}

pub(crate) async fn claim_reward_handler(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<RewardClaim> {
    ok(blocking(&state, move |store| store.claim_reward(&viewer.id, &id)).await?)
}
