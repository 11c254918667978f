// SPDX-License-Identifier: Apache-2.0

use super::{complete_condition_in, init_member_rows, load_profile, new_id, MembershipStore};
use crate::rows;
use crate::{StoreError, StoreErrorCode};
use junkan_core::random_bytes;
use junkan_model::{
    format_ts, invite_code_from_bytes, normalize_invite_code, InviteCode, InviteSlots,
    InviteVerification, ReferralStats, UnlockCondition, UnlockConditionState, UserStatus,
    INVITE_CODE_LEN,
};
use rusqlite::{params, Connection, OptionalExtension};

const CODE_MINT_ATTEMPTS: usize = 8;

fn slots_in(conn: &Connection, user_id: &str) -> Result<InviteSlots, StoreError> {
    let slots = conn
        .query_row(
            "SELECT initial_slots, bonus_slots, used_slots FROM invite_slots WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(InviteSlots {
                    initial_slots: rows::count_u32(row, 0)?,
                    bonus_slots: rows::count_u32(row, 1)?,
                    used_slots: rows::count_u32(row, 2)?,
                })
            },
        )
        .optional()?;
    Ok(slots.unwrap_or_default())
}

fn find_code(conn: &Connection, code: &str) -> Result<Option<InviteCode>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM invite_codes WHERE code = ?1",
                rows::INVITE_COLUMNS
            ),
            params![normalize_invite_code(code)],
            rows::invite_code,
        )
        .optional()?)
}

impl MembershipStore {
    /// Mints a fresh code for an active member and consumes one slot.
    pub fn generate_invite_code(&self, user_id: &str) -> Result<InviteCode, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let profile = load_profile(&tx, user_id)?;
        if profile.status != UserStatus::Active {
            return Err(StoreError::new(
                StoreErrorCode::Forbidden,
                "only active members can issue invite codes",
            ));
        }
        init_member_rows(&tx, user_id)?;
        if slots_in(&tx, user_id)?.remaining() == 0 {
            return Err(StoreError::new(
                StoreErrorCode::Forbidden,
                "no invite slots left",
            ));
        }

        let id = new_id();
        let mut minted = None;
        for _ in 0..CODE_MINT_ATTEMPTS {
            let code = random_invite_code();
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO invite_codes (
                   id, code, created_by, used_by, is_used, click_count, expires_at, created_at
                 ) VALUES (?1, ?2, ?3, NULL, 0, 0, NULL, ?4)",
                params![id, code, user_id, format_ts(now)],
            )?;
            if inserted == 1 {
                minted = Some(code);
                break;
            }
        }
        if minted.is_none() {
            return Err(StoreError::new(
                StoreErrorCode::Internal,
                "could not mint a unique invite code",
            ));
        }
        tx.execute(
            "UPDATE invite_slots SET used_slots = used_slots + 1 WHERE user_id = ?1",
            params![user_id],
        )?;
        let invite = tx.query_row(
            &format!("SELECT {} FROM invite_codes WHERE id = ?1", rows::INVITE_COLUMNS),
            params![id],
            rows::invite_code,
        )?;
        tx.commit()?;
        tracing::info!(user_id, code_id = %invite.id, "invite code minted");
        Ok(invite)
    }

    /// Case-insensitive. Valid means present, unused, unexpired and issued
    /// by an existing member.
    pub fn verify_invite_code(&self, code: &str) -> Result<InviteVerification, StoreError> {
        let now = self.now();
        let conn = self.conn()?;
        let Some(invite) = find_code(&conn, code)? else {
            return Ok(InviteVerification::invalid());
        };
        if !invite.is_redeemable(now) {
            return Ok(InviteVerification::invalid());
        }
        let referrer_name: Option<String> = conn
            .query_row(
                "SELECT display_name FROM profiles WHERE id = ?1",
                params![invite.created_by],
                |row| row.get(0),
            )
            .optional()?;
        Ok(match referrer_name {
            Some(name) => InviteVerification {
                valid: true,
                referrer_name: Some(name),
            },
            None => InviteVerification::invalid(),
        })
    }

    /// Counts a landing on the invite link as an unregistered referral.
    pub fn record_invite_click(&self, code: &str) -> Result<(), StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let invite = find_code(&tx, code)?.ok_or_else(|| StoreError::not_found("invite code"))?;
        tx.execute(
            "UPDATE invite_codes SET click_count = click_count + 1 WHERE id = ?1",
            params![invite.id],
        )?;
        tx.execute(
            "INSERT INTO referrals (
               id, referrer_id, referred_id, invite_code_id, clicked_at, registered_at
             ) VALUES (?1, ?2, NULL, ?3, ?4, NULL)",
            params![new_id(), invite.created_by, invite.id, format_ts(now)],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Newest unused code of the member, if any.
    pub fn my_invite_code(&self, user_id: &str) -> Result<Option<InviteCode>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM invite_codes WHERE created_by = ?1 AND is_used = 0
                     ORDER BY created_at DESC LIMIT 1",
                    rows::INVITE_COLUMNS
                ),
                params![user_id],
                rows::invite_code,
            )
            .optional()?)
    }

    pub fn referral_stats(&self, user_id: &str) -> Result<ReferralStats, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM referrals WHERE referrer_id = ?1",
            rows::REFERRAL_COLUMNS
        ))?;
        let referrals = stmt
            .query_map(params![user_id], rows::referral)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReferralStats::from_referrals(&referrals))
    }

    pub fn invite_slots(&self, user_id: &str) -> Result<InviteSlots, StoreError> {
        let conn = self.conn()?;
        slots_in(&conn, user_id)
    }

    pub fn unlock_conditions(&self, user_id: &str) -> Result<Vec<UnlockConditionState>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT completed_at FROM unlock_conditions WHERE user_id = ?1 AND condition_key = ?2",
        )?;
        let mut out = Vec::with_capacity(UnlockCondition::ALL.len());
        for condition in UnlockCondition::ALL {
            let completed_at = stmt
                .query_row(params![user_id, condition.as_str()], |row| rows::opt_ts(row, 0))
                .optional()?
                .flatten();
            out.push(UnlockConditionState {
                key: *condition,
                label: condition.label().to_string(),
                done: completed_at.is_some(),
                completed_at,
            });
        }
        Ok(out)
    }

    /// Idempotent; returns whether this call completed the condition.
    pub fn complete_condition(
        &self,
        user_id: &str,
        condition: UnlockCondition,
    ) -> Result<bool, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let completed = complete_condition_in(&tx, user_id, condition, now)?;
        tx.commit()?;
        Ok(completed)
    }

    /// Logs a share and fulfils `first_share`.
    pub fn record_share(&self, user_id: &str, content_id: &str) -> Result<bool, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM contents WHERE id = ?1)",
            params![content_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::not_found("content"));
        }
        tx.execute(
            "INSERT INTO shares (id, user_id, content_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![new_id(), user_id, content_id, format_ts(now)],
        )?;
        let completed = complete_condition_in(&tx, user_id, UnlockCondition::FirstShare, now)?;
        tx.commit()?;
        Ok(completed)
    }
}

fn random_invite_code() -> String {
    invite_code_from_bytes(&random_bytes(INVITE_CODE_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_code_position_draws_from_the_whole_alphabet() {
        let mut seen = vec![BTreeSet::new(); INVITE_CODE_LEN];
        for _ in 0..2000 {
            let code = random_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            for (i, c) in code.chars().enumerate() {
                seen[i].insert(c);
            }
        }
        for (i, symbols) in seen.iter().enumerate() {
            assert_eq!(symbols.len(), 32, "position {i}: {symbols:?}");
        }
    }
}
