// SPDX-License-Identifier: Apache-2.0

use super::admin::RewardsOverview;
use super::{new_id, MembershipStore};
use crate::rows;
use crate::{StoreError, StoreErrorCode};
use junkan_model::{
    achieved_count, achievers, format_ts, referral_counts, Broadcast, BroadcastDraft,
    BroadcastStatus, MemberRank, MemberRewardView, Reward, RewardClaim, RewardStatus,
    RewardUpdate, RewardWithStats, UserStatus, DEFAULT_REWARD_TIERS,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

fn seed_rewards_in(conn: &Connection, stamp: &str) -> Result<usize, StoreError> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM rewards", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }
    for tier in &DEFAULT_REWARD_TIERS {
        conn.execute(
            "INSERT INTO rewards (id, title, description, required_referrals, icon, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new_id(),
                tier.title,
                tier.description,
                i64::from(tier.required_referrals),
                tier.icon,
                RewardStatus::Active.as_str(),
                stamp
            ],
        )?;
    }
    Ok(DEFAULT_REWARD_TIERS.len())
}

fn rewards_in(conn: &Connection, only_active: bool) -> Result<Vec<Reward>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM rewards WHERE (?1 = 0 OR status = 'active')
         ORDER BY required_referrals, created_at",
        rows::REWARD_COLUMNS
    ))?;
    let rewards = stmt
        .query_map(params![only_active], rows::reward)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rewards)
}

fn registered_referrals_of(conn: &Connection, user_id: &str) -> Result<u32, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM referrals WHERE referrer_id = ?1 AND registered_at IS NOT NULL",
        params![user_id],
        |row| rows::count_u32(row, 0),
    )?)
}

fn load_claim(conn: &Connection, claim_id: &str) -> Result<RewardClaim, StoreError> {
    conn.query_row(
        &format!("SELECT {} FROM reward_claims WHERE id = ?1", rows::CLAIM_COLUMNS),
        params![claim_id],
        rows::claim,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("reward claim"))
}

impl MembershipStore {
    /// Inserts the default tiers when no reward exists yet.
    pub fn seed_default_rewards(&self) -> Result<usize, StoreError> {
        let stamp = format_ts(self.now());
        let conn = self.conn()?;
        seed_rewards_in(&conn, &stamp)
    }

    /// All rewards with how many members reached each, plus the achievers.
    pub fn rewards_overview(&self) -> Result<RewardsOverview, StoreError> {
        let stamp = format_ts(self.now());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        seed_rewards_in(&tx, &stamp)?;
        let rewards = rewards_in(&tx, false)?;

        let mut stmt = tx.prepare(&format!(
            "SELECT {} FROM referrals WHERE registered_at IS NOT NULL",
            rows::REFERRAL_COLUMNS
        ))?;
        let referrals = stmt
            .query_map([], rows::referral)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        let counts = referral_counts(&referrals);

        let mut names = BTreeMap::new();
        let mut stmt = tx.prepare("SELECT id, display_name FROM profiles")?;
        for pair in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))? {
            let (id, name) = pair?;
            names.insert(id, name);
        }
        drop(stmt);
        tx.commit()?;

        Ok(RewardsOverview {
            rewards: rewards
                .into_iter()
                .map(|reward| RewardWithStats {
                    achieved_count: achieved_count(&counts, reward.required_referrals),
                    reward,
                })
                .collect(),
            achievers: achievers(&counts, &names),
        })
    }

    pub fn update_reward(&self, reward_id: &str, update: &RewardUpdate) -> Result<Reward, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE rewards SET title = ?2, description = ?3 WHERE id = ?1",
            params![reward_id, update.title, update.description],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("reward"));
        }
        Ok(conn.query_row(
            &format!("SELECT {} FROM rewards WHERE id = ?1", rows::REWARD_COLUMNS),
            params![reward_id],
            rows::reward,
        )?)
    }

    /// Active rewards from the member's point of view.
    pub fn claimable_rewards(&self, user_id: &str) -> Result<Vec<MemberRewardView>, StoreError> {
        let conn = self.conn()?;
        let rewards = rewards_in(&conn, true)?;
        let referral_count = registered_referrals_of(&conn, user_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reward_claims WHERE user_id = ?1",
            rows::CLAIM_COLUMNS
        ))?;
        let mut claims: BTreeMap<String, RewardClaim> = stmt
            .query_map(params![user_id], rows::claim)?
            .map(|claim| claim.map(|c| (c.reward_id.clone(), c)))
            .collect::<Result<_, _>>()?;
        Ok(rewards
            .into_iter()
            .map(|reward| MemberRewardView {
                achieved: referral_count >= reward.required_referrals,
                claim: claims.remove(&reward.id),
                referral_count,
                reward,
            })
            .collect())
    }

    pub fn claim_reward(&self, user_id: &str, reward_id: &str) -> Result<RewardClaim, StoreError> {
        let stamp = format_ts(self.now());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let reward = tx
            .query_row(
                &format!(
                    "SELECT {} FROM rewards WHERE id = ?1 AND status = 'active'",
                    rows::REWARD_COLUMNS
                ),
                params![reward_id],
                rows::reward,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("reward"))?;
        if registered_referrals_of(&tx, user_id)? < reward.required_referrals {
            return Err(StoreError::new(
                StoreErrorCode::Forbidden,
                "reward has not been achieved yet",
            ));
        }
        let claim_id = new_id();
        tx.execute(
            "INSERT INTO reward_claims (id, user_id, reward_id, status, claimed_at, granted_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, NULL)",
            params![claim_id, user_id, reward_id, stamp],
        )
        .map_err(|e| match StoreError::from(e) {
            err if err.code == StoreErrorCode::Conflict => {
                StoreError::new(StoreErrorCode::Conflict, "reward already claimed")
            }
            err => err,
        })?;
        let claim = load_claim(&tx, &claim_id)?;
        tx.commit()?;
        tracing::info!(user_id, reward_id, "reward claimed");
        Ok(claim)
    }

    pub fn grant_claim(&self, claim_id: &str) -> Result<RewardClaim, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE reward_claims SET status = 'granted', granted_at = COALESCE(granted_at, ?2)
             WHERE id = ?1",
            params![claim_id, format_ts(self.now())],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("reward claim"));
        }
        load_claim(&conn, claim_id)
    }

    /// Records the broadcast as sent to every active member it reaches.
    pub fn create_broadcast(
        &self,
        created_by: &str,
        draft: &BroadcastDraft,
    ) -> Result<Broadcast, StoreError> {
        let stamp = format_ts(self.now());
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT member_rank FROM profiles WHERE status = ?1")?;
        let ranks = stmt
            .query_map(params![UserStatus::Active.as_str()], |row| {
                rows::text_enum(row, 0, MemberRank::parse)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        let recipients = ranks
            .into_iter()
            .filter(|rank| draft.target_rank.reaches(*rank))
            .count();
        let id = new_id();
        conn.execute(
            "INSERT INTO broadcasts (
               id, title, body, target_rank, status, recipient_count, sent_at, created_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                draft.title,
                draft.body,
                draft.target_rank.as_str(),
                BroadcastStatus::Sent.as_str(),
                i64::try_from(recipients).unwrap_or(i64::MAX),
                stamp,
                created_by
            ],
        )?;
        tracing::info!(broadcast_id = %id, recipients, "broadcast sent");
        Ok(conn.query_row(
            &format!("SELECT {} FROM broadcasts WHERE id = ?1", rows::BROADCAST_COLUMNS),
            params![id],
            rows::broadcast,
        )?)
    }

    /// Newest first.
    pub fn broadcasts(&self) -> Result<Vec<Broadcast>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM broadcasts ORDER BY sent_at DESC, id",
            rows::BROADCAST_COLUMNS
        ))?;
        let out = stmt
            .query_map([], rows::broadcast)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    /// Sent broadcasts whose target includes `rank`.
    pub fn broadcasts_for(&self, rank: MemberRank) -> Result<Vec<Broadcast>, StoreError> {
        Ok(self
            .broadcasts()?
            .into_iter()
            .filter(|b| b.status == BroadcastStatus::Sent && b.target_rank.reaches(rank))
            .collect())
    }
}
