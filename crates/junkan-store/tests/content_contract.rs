use chrono::{DateTime, Duration, TimeZone, Utc};
use junkan_core::{ClockPort, FixedClock};
use junkan_model::{
    BroadcastInput, BroadcastTarget, ClaimStatus, ContentDraft, ContentFilter, ContentInput,
    ContentStatus, ContentType, InteractionType, MemberRank, RequiredRank, RewardUpdateInput,
    SignUpInput, UnlockCondition, UserStatus,
};
use junkan_store::{MembershipStore, StoreErrorCode};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    store: MembershipStore,
    clock: Arc<FixedClock>,
    db: PathBuf,
    admin: String,
    _dir: TempDir,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).single().expect("ts")
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("junkan.sqlite");
    let clock = Arc::new(FixedClock::new(start()));
    let store = MembershipStore::open(&db)
        .expect("open store")
        .with_clock(clock.clone())
        .with_password_iterations(1);
    let admin = store
        .create_admin("admin@junkan.test", "adminpass1", "Admin")
        .expect("admin")
        .id;
    Fixture {
        store,
        clock,
        db,
        admin,
        _dir: dir,
    }
}

fn member(fx: &Fixture, email: &str) -> String {
    let code = fx.store.generate_invite_code(&fx.admin).expect("mint").code;
    let signup = SignUpInput {
        last_name: "Tanaka".to_string(),
        first_name: "Yui".to_string(),
        email: email.to_string(),
        password: "pass1234".to_string(),
        question: "Heard about it from a coworker".to_string(),
        ref_code: code,
    }
    .validate()
    .expect("valid");
    let id = fx.store.register_member(&signup).expect("register").profile.id;
    fx.store
        .set_user_status(&id, UserStatus::Active)
        .expect("activate");
    id
}

fn draft(fx: &Fixture, content_type: ContentType, title: &str) -> ContentDraft {
    ContentInput {
        content_type,
        title: title.to_string(),
        description: Some("summary".to_string()),
        body: Some("body text".to_string()),
        author_name: "Editorial".to_string(),
        author_bio: None,
        url: (content_type == ContentType::External).then(|| "https://example.com".to_string()),
        thumbnail_url: None,
        duration: None,
        status: None,
        publish_date: None,
        premium: false,
        required_rank: None,
        tags: vec!["growth".to_string(), "ai".to_string()],
    }
    .validate(fx.clock.now())
    .expect("valid content")
}

/// Inserts registered referrals straight into the database.
fn seed_referrals(db: &PathBuf, referrer: &str, count: usize) {
    let conn = Connection::open(db).expect("raw connection");
    for i in 0..count {
        conn.execute(
            "INSERT INTO referrals (id, referrer_id, referred_id, invite_code_id, clicked_at, registered_at)
             VALUES (?1, ?2, NULL, NULL, '2026-06-01T00:00:00.000000Z', '2026-06-01T00:00:00.000000Z')",
            params![format!("{referrer}-seed-{i}"), referrer],
        )
        .expect("seed referral");
    }
}

#[test]
fn live_feed_excludes_drafts_and_future_schedules() {
    let fx = fixture();
    let published = fx
        .store
        .create_content(Some(&fx.admin), &draft(&fx, ContentType::Article, "Published"))
        .expect("create");
    assert_eq!(published.tags, vec!["growth".to_string(), "ai".to_string()]);

    let mut scheduled = draft(&fx, ContentType::Video, "Scheduled");
    scheduled.status = ContentStatus::Scheduled;
    scheduled.publish_date = Some(fx.clock.now() + Duration::hours(3));
    let scheduled = fx.store.create_content(None, &scheduled).expect("create");

    let mut hidden = draft(&fx, ContentType::External, "Hidden draft");
    hidden.status = ContentStatus::Draft;
    fx.store.create_content(None, &hidden).expect("create");

    let ids = |now| -> Vec<String> {
        fx.store
            .live_contents(now)
            .expect("live")
            .into_iter()
            .map(|c| c.id)
            .collect()
    };
    assert_eq!(ids(fx.clock.now()), vec![published.id.clone()]);
    let later = fx.clock.now() + Duration::hours(4);
    assert_eq!(ids(later), vec![scheduled.id.clone(), published.id.clone()]);

    let videos = fx
        .store
        .all_contents(&ContentFilter {
            content_type: Some(ContentType::Video),
            limit: 50,
            ..ContentFilter::default()
        })
        .expect("filter");
    assert_eq!(videos.len(), 1);
    let drafts = fx
        .store
        .all_contents(&ContentFilter {
            status: Some(ContentStatus::Draft),
            limit: 50,
            ..ContentFilter::default()
        })
        .expect("filter");
    assert_eq!(drafts[0].title, "Hidden draft");
    let searched = fx
        .store
        .all_contents(&ContentFilter {
            search: Some("sched".to_string()),
            limit: 50,
            ..ContentFilter::default()
        })
        .expect("search");
    assert_eq!(searched.len(), 1);
}

#[test]
fn update_delete_and_thumbnail() {
    let fx = fixture();
    let created = fx
        .store
        .create_content(None, &draft(&fx, ContentType::Article, "Original"))
        .expect("create");
    let mut edit = draft(&fx, ContentType::Article, "Edited");
    edit.premium = true;
    edit.required_rank = RequiredRank::Rank(MemberRank::Platinum);
    edit.tags = vec!["ops".to_string()];
    let updated = fx.store.update_content(&created.id, &edit).expect("update");
    assert_eq!(updated.title, "Edited");
    assert_eq!(updated.tags, vec!["ops".to_string()]);
    assert_eq!(updated.required_rank, RequiredRank::Rank(MemberRank::Platinum));

    let with_thumb = fx
        .store
        .set_thumbnail(&created.id, "/media/thumbnails/thumbnails/1-abc.png")
        .expect("thumbnail");
    assert_eq!(
        with_thumb.thumbnail_url.as_deref(),
        Some("/media/thumbnails/thumbnails/1-abc.png")
    );

    fx.store.delete_content(&created.id).expect("delete");
    assert_eq!(
        fx.store.content(&created.id).expect_err("gone").code,
        StoreErrorCode::NotFound
    );
    assert_eq!(
        fx.store.delete_content(&created.id).expect_err("gone").code,
        StoreErrorCode::NotFound
    );
}

#[test]
fn interactions_toggle_and_drive_recommendations() {
    let fx = fixture();
    let a = fx
        .store
        .create_content(None, &draft(&fx, ContentType::Article, "A"))
        .expect("a");
    fx.clock.advance(Duration::minutes(1));
    let b = fx
        .store
        .create_content(None, &draft(&fx, ContentType::Article, "B"))
        .expect("b");
    let user = member(&fx, "reader@example.com");

    assert!(fx
        .store
        .toggle_interaction(&user, &a.id, InteractionType::Like)
        .expect("like"));
    assert!(fx
        .store
        .toggle_interaction(&user, &a.id, InteractionType::Bookmark)
        .expect("bookmark"));
    assert_eq!(fx.store.content(&a.id).expect("a").likes, 1);
    let state = fx.store.interaction_state(&user, &a.id).expect("state");
    assert!(state.liked && state.bookmarked);

    let recommended = fx.store.recommended(3, fx.clock.now()).expect("recommended");
    assert_eq!(recommended[0].id, a.id);
    assert_eq!(recommended[1].id, b.id);

    assert!(!fx
        .store
        .toggle_interaction(&user, &a.id, InteractionType::Like)
        .expect("unlike"));
    assert_eq!(fx.store.content(&a.id).expect("a").likes, 0);
    assert!(fx
        .store
        .interacted_contents(&user, InteractionType::Like)
        .expect("likes")
        .is_empty());
    assert_eq!(
        fx.store
            .interacted_contents(&user, InteractionType::Bookmark)
            .expect("bookmarks")
            .len(),
        1
    );
    assert_eq!(
        fx.store
            .toggle_interaction(&user, &a.id, InteractionType::View)
            .expect_err("views are not toggles")
            .code,
        StoreErrorCode::Validation
    );
}

#[test]
fn three_distinct_views_unlock_a_bonus_slot() {
    let fx = fixture();
    let user = member(&fx, "viewer@example.com");
    let ids: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|title| {
            fx.store
                .create_content(None, &draft(&fx, ContentType::Article, title))
                .expect("create")
                .id
        })
        .collect();

    for _ in 0..3 {
        fx.store.record_view(&user, &ids[0]).expect("view");
    }
    assert_eq!(fx.store.content(&ids[0]).expect("c").views, 3);
    assert_eq!(fx.store.invite_slots(&user).expect("slots").bonus_slots, 0);

    fx.store.record_view(&user, &ids[1]).expect("view");
    fx.store.record_view(&user, &ids[2]).expect("view");
    let conditions = fx.store.unlock_conditions(&user).expect("conditions");
    let views = conditions
        .iter()
        .find(|c| c.key == UnlockCondition::ContentViews3)
        .expect("condition");
    assert!(views.done);
    assert_eq!(fx.store.invite_slots(&user).expect("slots").bonus_slots, 1);

    assert!(fx.store.record_share(&user, &ids[0]).expect("share"));
    assert_eq!(
        fx.store.record_share(&user, "missing").expect_err("missing").code,
        StoreErrorCode::NotFound
    );
}

#[test]
fn reward_tiers_count_achievers_and_gate_claims() {
    let fx = fixture();
    let star = member(&fx, "star@example.com");
    let rookie = member(&fx, "rookie@example.com");
    seed_referrals(&fx.db, &star, 12);
    seed_referrals(&fx.db, &rookie, 3);

    let overview = fx.store.rewards_overview().expect("overview");
    let required: Vec<u32> = overview
        .rewards
        .iter()
        .map(|r| r.reward.required_referrals)
        .collect();
    assert_eq!(required, vec![10, 100, 1000]);
    assert_eq!(overview.rewards[0].achieved_count, 1);
    assert_eq!(overview.rewards[1].achieved_count, 0);
    assert_eq!(overview.achievers.len(), 1);
    assert_eq!(overview.achievers[0].id, star);
    assert_eq!(overview.achievers[0].referrals, 12);
    assert_eq!(fx.store.seed_default_rewards().expect("seed"), 0);

    let first = overview.rewards[0].reward.id.clone();
    let renamed = fx
        .store
        .update_reward(
            &first,
            &RewardUpdateInput {
                title: "Junkan hoodie".to_string(),
                description: None,
            }
            .validate()
            .expect("valid"),
        )
        .expect("update reward");
    assert_eq!(renamed.title, "Junkan hoodie");

    let view = fx.store.claimable_rewards(&star).expect("view");
    assert!(view[0].achieved && !view[1].achieved);
    assert_eq!(view[0].referral_count, 12);

    let err = fx.store.claim_reward(&rookie, &first).expect_err("not achieved");
    assert_eq!(err.code, StoreErrorCode::Forbidden);
    let claim = fx.store.claim_reward(&star, &first).expect("claim");
    assert_eq!(claim.status, ClaimStatus::Pending);
    let dup = fx.store.claim_reward(&star, &first).expect_err("twice");
    assert_eq!(dup.code, StoreErrorCode::Conflict);
    let granted = fx.store.grant_claim(&claim.id).expect("grant");
    assert_eq!(granted.status, ClaimStatus::Granted);
    assert!(granted.granted_at.is_some());
    let view = fx.store.claimable_rewards(&star).expect("view");
    assert_eq!(
        view[0].claim.as_ref().map(|c| c.status),
        Some(ClaimStatus::Granted)
    );
}

#[test]
fn broadcasts_count_reached_members() {
    let fx = fixture();
    let gold = member(&fx, "gold@example.com");
    fx.store
        .set_user_rank(&gold, MemberRank::Gold)
        .expect("rank");
    member(&fx, "standard@example.com");

    let send = |target: Option<BroadcastTarget>| {
        fx.store
            .create_broadcast(
                &fx.admin,
                &BroadcastInput {
                    title: "News".to_string(),
                    body: "Hello members".to_string(),
                    target_rank: target,
                }
                .validate()
                .expect("valid"),
            )
            .expect("broadcast")
    };
    // The admin itself is an active diamond profile.
    assert_eq!(send(None).recipient_count, 3);
    fx.clock.advance(Duration::minutes(1));
    assert_eq!(send(Some(BroadcastTarget::Premium)).recipient_count, 2);
    fx.clock.advance(Duration::minutes(1));
    assert_eq!(
        send(Some(BroadcastTarget::Rank(MemberRank::Platinum))).recipient_count,
        1
    );

    assert_eq!(fx.store.broadcasts().expect("list").len(), 3);
    let for_standard = fx
        .store
        .broadcasts_for(MemberRank::Standard)
        .expect("standard");
    assert_eq!(for_standard.len(), 1);
    assert_eq!(for_standard[0].target_rank, BroadcastTarget::All);
    assert_eq!(fx.store.broadcasts_for(MemberRank::Gold).expect("gold").len(), 2);
}

#[test]
fn admin_listing_status_and_dashboard() {
    let fx = fixture();
    let code = fx.store.generate_invite_code(&fx.admin).expect("mint");
    fx.store.record_invite_click(&code.code).expect("click");
    fx.store.record_invite_click(&code.code).expect("click");
    let signup = SignUpInput {
        last_name: "Mori".to_string(),
        first_name: "Ken".to_string(),
        email: "ken@example.com".to_string(),
        password: "pass1234".to_string(),
        question: "Met the founders at a meetup".to_string(),
        ref_code: code.code,
    }
    .validate()
    .expect("valid");
    let ken = fx.store.register_member(&signup).expect("register").profile;
    fx.store
        .create_content(None, &draft(&fx, ContentType::Article, "Post"))
        .expect("content");

    let users = fx.store.admin_users().expect("users");
    let admin_row = users
        .iter()
        .find(|u| u.profile.id == fx.admin)
        .expect("admin row");
    assert_eq!((admin_row.clicks, admin_row.registrations), (2, 1));

    let stats = fx.store.dashboard(fx.clock.now()).expect("dashboard");
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.active_rate, 50);
    assert_eq!(stats.content_count, 1);
    assert_eq!(stats.monthly_new_users, 2);
    assert_eq!(stats.weekly[6].registrations, 2);
    assert_eq!(stats.growth[5].invited, 1);

    let active = fx
        .store
        .set_user_status(&ken.id, UserStatus::Active)
        .expect("approve");
    assert_eq!(active.status, UserStatus::Active);
    let err = fx
        .store
        .set_user_status(&fx.admin, UserStatus::Suspended)
        .expect_err("admin stays active");
    assert_eq!(err.code, StoreErrorCode::Forbidden);
    assert_eq!(
        fx.store
            .set_user_rank("missing", MemberRank::Gold)
            .expect_err("missing")
            .code,
        StoreErrorCode::NotFound
    );
}

#[test]
fn each_content_carries_only_its_own_tags() {
    let fx = fixture();
    let mut ids = Vec::new();
    for (title, tags) in [
        ("First", vec!["ai", "growth"]),
        ("Second", vec!["ops"]),
        ("Third", vec![]),
    ] {
        let mut item = draft(&fx, ContentType::Article, title);
        item.tags = tags.into_iter().map(str::to_string).collect();
        ids.push(fx.store.create_content(None, &item).expect("create").id);
    }

    assert_eq!(
        fx.store.content(&ids[1]).expect("second").tags,
        vec!["ops".to_string()]
    );
    assert!(fx.store.content(&ids[2]).expect("third").tags.is_empty());

    let listed = fx
        .store
        .all_contents(&ContentFilter {
            limit: 50,
            ..ContentFilter::default()
        })
        .expect("list");
    let tags_of = |id: &str| {
        listed
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.tags.clone())
            .expect("listed")
    };
    assert_eq!(tags_of(&ids[0]), vec!["ai".to_string(), "growth".to_string()]);
    assert_eq!(tags_of(&ids[1]), vec!["ops".to_string()]);
    assert!(tags_of(&ids[2]).is_empty());
}
