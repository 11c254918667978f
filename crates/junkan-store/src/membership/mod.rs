// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed repository. Every public operation takes the connection
//! lock once; multi-row writes run inside a single transaction.

use crate::rows;
use crate::schema;
use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use junkan_core::{ClockPort, SystemClock, PASSWORD_ITERATIONS};
use junkan_model::{format_ts, Profile, UnlockCondition};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

mod accounts;
mod admin;
mod contents;
mod invites;
mod rewards;

pub use accounts::{Registration, CONFIRM_TOKEN_TTL_HOURS, RESET_TOKEN_TTL_HOURS};
pub use admin::{AdminUser, RewardsOverview};

pub struct MembershipStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn ClockPort>,
    password_iterations: u32,
}

impl MembershipStore {
    /// Opens (creating if needed) the database file and applies the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::configure(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
            password_iterations: PASSWORD_ITERATIONS,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    /// Lower work factors are for tests only.
    #[must_use]
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_iterations = iterations.max(1);
        self
    }

    pub fn migrate(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        schema::migrate(&conn)?;
        schema::schema_version(&conn)
    }

    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "connection lock poisoned"))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn hash(&self, password: &str) -> Result<String, StoreError> {
        junkan_core::hash_password_with_iterations(password, self.password_iterations)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn load_profile(conn: &Connection, user_id: &str) -> Result<Profile, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE p.id = ?1",
            rows::PROFILE_COLUMNS,
            rows::PROFILE_FROM
        ),
        params![user_id],
        rows::profile,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("profile"))
}

/// Seeds the per-member rows every profile carries.
fn init_member_rows(conn: &Connection, user_id: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO invite_slots (user_id, initial_slots, bonus_slots, used_slots)
         VALUES (?1, ?2, 0, 0)",
        params![user_id, i64::from(junkan_model::INITIAL_INVITE_SLOTS)],
    )?;
    let prefs = junkan_model::NotificationPreferences::default();
    conn.execute(
        "INSERT OR IGNORE INTO notification_preferences (
           user_id, email_new_content, email_newsletter, email_invite_update,
           line_new_content, line_reward, push_browser
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            prefs.email_new_content,
            prefs.email_newsletter,
            prefs.email_invite_update,
            prefs.line_new_content,
            prefs.line_reward,
            prefs.push_browser
        ],
    )?;
    for condition in UnlockCondition::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO unlock_conditions (user_id, condition_key, completed_at)
             VALUES (?1, ?2, NULL)",
            params![user_id, condition.as_str()],
        )?;
    }
    Ok(())
}

/// First completion stamps `completed_at` and grants one bonus slot.
fn complete_condition_in(
    conn: &Connection,
    user_id: &str,
    condition: UnlockCondition,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    init_member_rows(conn, user_id)?;
    let changed = conn.execute(
        "UPDATE unlock_conditions SET completed_at = ?3
         WHERE user_id = ?1 AND condition_key = ?2 AND completed_at IS NULL",
        params![user_id, condition.as_str(), format_ts(now)],
    )?;
    if changed == 0 {
        return Ok(false);
    }
    conn.execute(
        "UPDATE invite_slots SET bonus_slots = bonus_slots + 1 WHERE user_id = ?1",
        params![user_id],
    )?;
    tracing::info!(user_id, condition = condition.as_str(), "unlock condition completed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent_and_versioned() {
        let store = MembershipStore::open_in_memory().expect("open");
        assert_eq!(store.migrate().expect("migrate"), schema::SCHEMA_VERSION);
        assert_eq!(store.migrate().expect("migrate again"), schema::SCHEMA_VERSION);
        store.ping().expect("ping");
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/db/junkan.sqlite");
        let store = MembershipStore::open(&path).expect("open");
        store.ping().expect("ping");
        assert!(path.exists());
    }
}
