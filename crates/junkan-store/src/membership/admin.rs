use super::{load_profile, MembershipStore};
use crate::rows;
use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use junkan_model::{
    format_ts, Achiever, DashboardStats, MemberRank, Profile, ProfileSnapshot, RewardWithStats,
    UserRole, UserStatus,
};
use rusqlite::params;
use serde::Serialize;

/// Member row for the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUser {
    #[serde(flatten)]
    pub profile: Profile,
    /// Sum of click counts over the member's invite codes.
    pub clicks: u64,
    pub registrations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardsOverview {
    pub rewards: Vec<RewardWithStats>,
    pub achievers: Vec<Achiever>,
}

impl MembershipStore {
    pub fn admin_users(&self) -> Result<Vec<AdminUser>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {},
               (SELECT COALESCE(SUM(ic.click_count), 0) FROM invite_codes ic
                WHERE ic.created_by = p.id),
               (SELECT COUNT(*) FROM referrals r
                WHERE r.referrer_id = p.id AND r.registered_at IS NOT NULL)
             FROM {} ORDER BY p.created_at DESC",
            rows::PROFILE_COLUMNS,
            rows::PROFILE_FROM
        ))?;
        let users = stmt
            .query_map([], |row| {
                Ok(AdminUser {
                    profile: rows::profile(row)?,
                    clicks: rows::count(row, 18)?,
                    registrations: rows::count(row, 19)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn set_user_status(&self, user_id: &str, status: UserStatus) -> Result<Profile, StoreError> {
        let conn = self.conn()?;
        let profile = load_profile(&conn, user_id)?;
        if profile.role == UserRole::Admin && status != UserStatus::Active {
            return Err(StoreError::new(
                StoreErrorCode::Forbidden,
                "administrators cannot be deactivated",
            ));
        }
        conn.execute(
            "UPDATE profiles SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, status.as_str(), format_ts(self.now())],
        )?;
        tracing::info!(user_id, status = status.as_str(), "member status changed");
        load_profile(&conn, user_id)
    }

    pub fn set_user_rank(&self, user_id: &str, rank: MemberRank) -> Result<Profile, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE profiles SET member_rank = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, rank.as_str(), format_ts(self.now())],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("profile"));
        }
        tracing::info!(user_id, rank = rank.as_str(), "member rank changed");
        load_profile(&conn, user_id)
    }

    pub fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardStats, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, created_at, invited_by IS NOT NULL FROM profiles")?;
        let snapshots = stmt
            .query_map([], |row| {
                Ok(ProfileSnapshot {
                    status: rows::text_enum(row, 0, UserStatus::parse)?,
                    created_at: rows::ts(row, 1)?,
                    invited: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let content_count =
            conn.query_row("SELECT COUNT(*) FROM contents", [], |row| rows::count(row, 0))?;
        Ok(DashboardStats::compute(&snapshots, content_count, now))
    }
}
