use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use junkan_model::{
    parse_ts, Broadcast, BroadcastStatus, BroadcastTarget, ClaimStatus, Content, ContentStatus,
    ContentType, InviteCode, LoginEntry, MemberRank, Profile, Referral, RequiredRank, Reward,
    RewardClaim, RewardStatus, UserRole, UserStatus,
};
use rusqlite::types::Type;
use rusqlite::Row;

fn conversion(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(StoreError::new(StoreErrorCode::Internal, message)),
    )
}

pub(crate) fn text_enum<T, E: std::fmt::Display>(
    row: &Row<'_>,
    idx: usize,
    parse: impl Fn(&str) -> Result<T, E>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| conversion(idx, e.to_string()))
}

pub(crate) fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| conversion(idx, format!("bad timestamp: {raw}")))
}

pub(crate) fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_ts(&raw)
            .map(Some)
            .ok_or_else(|| conversion(idx, format!("bad timestamp: {raw}"))),
    }
}

pub(crate) fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let v: i64 = row.get(idx)?;
    Ok(u64::try_from(v).unwrap_or(0))
}

pub(crate) fn count_u32(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let v: i64 = row.get(idx)?;
    Ok(u32::try_from(v).unwrap_or(0))
}

pub(crate) const PROFILE_COLUMNS: &str = "p.id, p.member_id, p.display_name, p.email, p.phone, \
     p.bio, p.location, p.company, p.position, p.avatar_url, p.member_rank, p.role, p.status, \
     p.screening_answer, p.invited_by, a.email_confirmed_at IS NOT NULL, p.created_at, p.updated_at";

pub(crate) const PROFILE_FROM: &str = "profiles p JOIN accounts a ON a.id = p.id";

/// Reads `PROFILE_COLUMNS` starting at column 0.
pub(crate) fn profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        member_id: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        bio: row.get(5)?,
        location: row.get(6)?,
        company: row.get(7)?,
        position: row.get(8)?,
        avatar_url: row.get(9)?,
        rank: text_enum(row, 10, MemberRank::parse)?,
        role: text_enum(row, 11, UserRole::parse)?,
        status: text_enum(row, 12, UserStatus::parse)?,
        screening_answer: row.get(13)?,
        invited_by: row.get(14)?,
        email_confirmed: row.get(15)?,
        created_at: ts(row, 16)?,
        updated_at: ts(row, 17)?,
    })
}

pub(crate) const CONTENT_COLUMNS: &str = "c.id, c.content_type, c.title, c.description, c.body, \
     c.status, c.publish_date, c.author_id, c.author_name, c.author_bio, c.thumbnail_url, c.url, \
     c.duration, c.views, c.likes, c.premium, c.required_rank, c.created_at, c.updated_at";

/// Tags are attached separately.
pub(crate) fn content(row: &Row<'_>) -> rusqlite::Result<Content> {
    Ok(Content {
        id: row.get(0)?,
        content_type: text_enum(row, 1, ContentType::parse)?,
        title: row.get(2)?,
        description: row.get(3)?,
        body: row.get(4)?,
        status: text_enum(row, 5, ContentStatus::parse)?,
        publish_date: opt_ts(row, 6)?,
        author_id: row.get(7)?,
        author_name: row.get(8)?,
        author_bio: row.get(9)?,
        thumbnail_url: row.get(10)?,
        url: row.get(11)?,
        duration: row.get(12)?,
        views: count(row, 13)?,
        likes: count(row, 14)?,
        premium: row.get(15)?,
        required_rank: text_enum(row, 16, RequiredRank::parse)?,
        tags: Vec::new(),
        created_at: ts(row, 17)?,
        updated_at: ts(row, 18)?,
    })
}

pub(crate) const INVITE_COLUMNS: &str =
    "id, code, created_by, used_by, is_used, click_count, expires_at, created_at";

pub(crate) fn invite_code(row: &Row<'_>) -> rusqlite::Result<InviteCode> {
    Ok(InviteCode {
        id: row.get(0)?,
        code: row.get(1)?,
        created_by: row.get(2)?,
        used_by: row.get(3)?,
        is_used: row.get(4)?,
        click_count: count(row, 5)?,
        expires_at: opt_ts(row, 6)?,
        created_at: ts(row, 7)?,
    })
}

pub(crate) const REFERRAL_COLUMNS: &str =
    "id, referrer_id, referred_id, invite_code_id, clicked_at, registered_at";

pub(crate) fn referral(row: &Row<'_>) -> rusqlite::Result<Referral> {
    Ok(Referral {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referred_id: row.get(2)?,
        invite_code_id: row.get(3)?,
        clicked_at: ts(row, 4)?,
        registered_at: opt_ts(row, 5)?,
    })
}

pub(crate) const REWARD_COLUMNS: &str =
    "id, title, description, required_referrals, icon, status, created_at";

pub(crate) fn reward(row: &Row<'_>) -> rusqlite::Result<Reward> {
    Ok(Reward {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        required_referrals: count_u32(row, 3)?,
        icon: row.get(4)?,
        status: text_enum(row, 5, RewardStatus::parse)?,
        created_at: ts(row, 6)?,
    })
}

pub(crate) const CLAIM_COLUMNS: &str = "id, user_id, reward_id, status, claimed_at, granted_at";

pub(crate) fn claim(row: &Row<'_>) -> rusqlite::Result<RewardClaim> {
    Ok(RewardClaim {
        id: row.get(0)?,
        user_id: row.get(1)?,
        reward_id: row.get(2)?,
        status: text_enum(row, 3, ClaimStatus::parse)?,
        claimed_at: ts(row, 4)?,
        granted_at: opt_ts(row, 5)?,
    })
}

pub(crate) const BROADCAST_COLUMNS: &str =
    "id, title, body, target_rank, status, recipient_count, sent_at, created_by";

pub(crate) fn broadcast(row: &Row<'_>) -> rusqlite::Result<Broadcast> {
    Ok(Broadcast {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        target_rank: text_enum(row, 3, BroadcastTarget::parse)?,
        status: text_enum(row, 4, BroadcastStatus::parse)?,
        recipient_count: count_u32(row, 5)?,
        sent_at: ts(row, 6)?,
        created_by: row.get(7)?,
    })
}

pub(crate) fn login_entry(row: &Row<'_>) -> rusqlite::Result<LoginEntry> {
    Ok(LoginEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        device: row.get(2)?,
        ip_address: row.get(3)?,
        logged_in_at: ts(row, 4)?,
    })
}
