use super::{complete_condition_in, init_member_rows, load_profile, new_id, MembershipStore};
use crate::rows;
use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Duration, Utc};
use junkan_core::{mint_token, random_bytes, token_digest, verify_password};
use junkan_model::{
    format_ts, normalize_invite_code, LoginEntry, NotificationPreferences, Profile, ProfileUpdate,
    SignUp, UnlockCondition, UserRole, UserStatus,
};
use rusqlite::{params, Connection, OptionalExtension};

pub const CONFIRM_TOKEN_TTL_HOURS: i64 = 24;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

const PURPOSE_CONFIRM: &str = "confirm_email";
const PURPOSE_RESET: &str = "password_reset";

#[derive(Debug, Clone)]
pub struct Registration {
    pub profile: Profile,
    /// Plaintext; only its digest is stored.
    pub confirmation_token: String,
}

fn member_id() -> String {
    format!("JK-{}", hex::encode_upper(random_bytes(4)))
}

fn insert_token(
    conn: &Connection,
    user_id: &str,
    purpose: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let token = mint_token();
    conn.execute(
        "INSERT INTO auth_tokens (digest, user_id, purpose, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            token_digest(&token),
            user_id,
            purpose,
            format_ts(now + ttl),
            format_ts(now)
        ],
    )?;
    Ok(token)
}

/// Deletes the token and returns its owner when it is unexpired.
fn consume_token(
    conn: &Connection,
    token: &str,
    purpose: &str,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let digest = token_digest(token);
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT user_id, expires_at FROM auth_tokens WHERE digest = ?1 AND purpose = ?2",
            params![digest, purpose],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let invalid = || StoreError::new(StoreErrorCode::Validation, "link is invalid or has expired");
    let (user_id, expires_at) = row.ok_or_else(invalid)?;
    conn.execute("DELETE FROM auth_tokens WHERE digest = ?1", params![digest])?;
    if expires_at <= format_ts(now) {
        return Err(invalid());
    }
    Ok(user_id)
}

fn password_hash_for(conn: &Connection, email: &str) -> Result<Option<(String, String)>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, password_hash FROM accounts WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

impl MembershipStore {
    /// Creates a pending member from a validated sign-up. The invite code
    /// is re-checked and consumed inside the same transaction.
    pub fn register_member(&self, signup: &SignUp) -> Result<Registration, StoreError> {
        let password_hash = self.hash(&signup.password)?;
        let now = self.now();
        let stamp = format_ts(now);
        let code = normalize_invite_code(&signup.ref_code);

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let invite = tx
            .query_row(
                &format!(
                    "SELECT {} FROM invite_codes WHERE code = ?1",
                    rows::INVITE_COLUMNS
                ),
                params![code],
                rows::invite_code,
            )
            .optional()?
            .filter(|invite| invite.is_redeemable(now))
            .ok_or_else(|| {
                StoreError::new(StoreErrorCode::InvalidInvite, "invite code is invalid")
            })?;
        let referrer_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE id = ?1)",
            params![invite.created_by],
            |row| row.get(0),
        )?;
        if !referrer_exists {
            return Err(StoreError::new(
                StoreErrorCode::InvalidInvite,
                "invite code is invalid",
            ));
        }
        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
            params![signup.email],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StoreError::new(
                StoreErrorCode::Conflict,
                "email address is already registered",
            ));
        }

        let user_id = new_id();
        tx.execute(
            "INSERT INTO accounts (id, email, password_hash, email_confirmed_at, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![user_id, signup.email, password_hash, stamp],
        )?;
        tx.execute(
            "INSERT INTO profiles (
               id, member_id, display_name, email, member_rank, role, status,
               screening_answer, invited_by, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, 'standard', 'member', 'pending', ?5, ?6, ?7, ?7)",
            params![
                user_id,
                member_id(),
                signup.display_name,
                signup.email,
                signup.screening_answer,
                invite.created_by,
                stamp
            ],
        )?;
        init_member_rows(&tx, &user_id)?;

        let open_click: Option<String> = tx
            .query_row(
                "SELECT id FROM referrals
                 WHERE invite_code_id = ?1 AND registered_at IS NULL
                 ORDER BY clicked_at DESC LIMIT 1",
                params![invite.id],
                |row| row.get(0),
            )
            .optional()?;
        match open_click {
            Some(referral_id) => {
                tx.execute(
                    "UPDATE referrals SET referred_id = ?2, registered_at = ?3 WHERE id = ?1",
                    params![referral_id, user_id, stamp],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO referrals (
                       id, referrer_id, referred_id, invite_code_id, clicked_at, registered_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![new_id(), invite.created_by, user_id, invite.id, stamp],
                )?;
            }
        }
        tx.execute(
            "UPDATE invite_codes SET is_used = 1, used_by = ?2 WHERE id = ?1",
            params![invite.id, user_id],
        )?;
        let confirmation_token = insert_token(
            &tx,
            &user_id,
            PURPOSE_CONFIRM,
            Duration::hours(CONFIRM_TOKEN_TTL_HOURS),
            now,
        )?;
        let profile = load_profile(&tx, &user_id)?;
        tx.commit()?;
        tracing::info!(user_id = %profile.id, member_id = %profile.member_id, "member registered");
        Ok(Registration {
            profile,
            confirmation_token,
        })
    }

    /// Bootstraps an active, confirmed administrator.
    pub fn create_admin(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Profile, StoreError> {
        let password_hash = self.hash(password)?;
        let stamp = format_ts(self.now());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let user_id = new_id();
        tx.execute(
            "INSERT INTO accounts (id, email, password_hash, email_confirmed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![user_id, email, password_hash, stamp],
        )
        .map_err(|e| match StoreError::from(e) {
            err if err.code == StoreErrorCode::Conflict => StoreError::new(
                StoreErrorCode::Conflict,
                "email address is already registered",
            ),
            err => err,
        })?;
        tx.execute(
            "INSERT INTO profiles (
               id, member_id, display_name, email, member_rank, role, status,
               created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, 'diamond', ?5, ?6, ?7, ?7)",
            params![
                user_id,
                member_id(),
                display_name,
                email,
                UserRole::Admin.as_str(),
                UserStatus::Active.as_str(),
                stamp
            ],
        )?;
        init_member_rows(&tx, &user_id)?;
        let profile = load_profile(&tx, &user_id)?;
        tx.commit()?;
        Ok(profile)
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<Profile, StoreError> {
        let conn = self.conn()?;
        let invalid = || {
            StoreError::new(
                StoreErrorCode::InvalidCredentials,
                "email or password is incorrect",
            )
        };
        let (user_id, hash) = password_hash_for(&conn, email)?.ok_or_else(invalid)?;
        if !verify_password(password, &hash) {
            return Err(invalid());
        }
        load_profile(&conn, &user_id)
    }

    /// Single use; expires after [`CONFIRM_TOKEN_TTL_HOURS`].
    pub fn confirm_email(&self, token: &str) -> Result<Profile, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let user_id = consume_token(&tx, token, PURPOSE_CONFIRM, now);
        let user_id = match user_id {
            Ok(id) => id,
            Err(e) => {
                tx.commit()?;
                return Err(e);
            }
        };
        tx.execute(
            "UPDATE accounts SET email_confirmed_at = COALESCE(email_confirmed_at, ?2)
             WHERE id = ?1",
            params![user_id, format_ts(now)],
        )?;
        let profile = load_profile(&tx, &user_id)?;
        tx.commit()?;
        Ok(profile)
    }

    /// Returns a new confirmation token for an account that has not
    /// confirmed yet.
    pub fn resend_confirmation(&self, email: &str) -> Result<String, StoreError> {
        let now = self.now();
        let conn = self.conn()?;
        let row: Option<(String, bool)> = conn
            .query_row(
                "SELECT id, email_confirmed_at IS NOT NULL FROM accounts WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (user_id, confirmed) = row.ok_or_else(|| StoreError::not_found("account"))?;
        if confirmed {
            return Err(StoreError::new(
                StoreErrorCode::Conflict,
                "email address is already confirmed",
            ));
        }
        insert_token(
            &conn,
            &user_id,
            PURPOSE_CONFIRM,
            Duration::hours(CONFIRM_TOKEN_TTL_HOURS),
            now,
        )
    }

    /// Fails with `NotFound` when no profile carries the address.
    pub fn request_password_reset(&self, email: &str) -> Result<String, StoreError> {
        let now = self.now();
        let conn = self.conn()?;
        let user_id: Option<String> = conn
            .query_row(
                "SELECT id FROM profiles WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        let user_id = user_id.ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::NotFound,
                "no member is registered with this email address",
            )
        })?;
        insert_token(
            &conn,
            &user_id,
            PURPOSE_RESET,
            Duration::hours(RESET_TOKEN_TTL_HOURS),
            now,
        )
    }

    /// Consumes the reset token and revokes every session of the account.
    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<(), StoreError> {
        let password_hash = self.hash(new_password)?;
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let user_id = match consume_token(&tx, token, PURPOSE_RESET, now) {
            Ok(id) => id,
            Err(e) => {
                tx.commit()?;
                return Err(e);
            }
        };
        tx.execute(
            "UPDATE accounts SET password_hash = ?2 WHERE id = ?1",
            params![user_id, password_hash],
        )?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        tx.commit()?;
        tracing::info!(user_id = %user_id, "password reset");
        Ok(())
    }

    pub fn change_password(
        &self,
        user_id: &str,
        current: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        let password_hash = self.hash(new_password)?;
        let conn = self.conn()?;
        let current_hash: String = conn
            .query_row(
                "SELECT password_hash FROM accounts WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("account"))?;
        if !verify_password(current, &current_hash) {
            return Err(StoreError::new(
                StoreErrorCode::InvalidCredentials,
                "current password is incorrect",
            ));
        }
        conn.execute(
            "UPDATE accounts SET password_hash = ?2 WHERE id = ?1",
            params![user_id, password_hash],
        )?;
        Ok(())
    }

    /// Returns the plaintext session token.
    pub fn create_session(&self, user_id: &str, ttl: Duration) -> Result<String, StoreError> {
        let now = self.now();
        let token = mint_token();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (digest, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                token_digest(&token),
                user_id,
                format_ts(now + ttl),
                format_ts(now)
            ],
        )?;
        Ok(token)
    }

    pub fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Profile>, StoreError> {
        let conn = self.conn()?;
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE digest = ?1 AND expires_at > ?2",
                params![token_digest(token), format_ts(now)],
                |row| row.get(0),
            )
            .optional()?;
        match user_id {
            Some(id) => load_profile(&conn, &id).map(Some),
            None => Ok(None),
        }
    }

    pub fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM sessions WHERE digest = ?1",
            params![token_digest(token)],
        )?;
        Ok(())
    }

    pub fn submit_screening_answer(&self, user_id: &str, answer: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE profiles SET screening_answer = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, answer, format_ts(self.now())],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("profile"));
        }
        Ok(())
    }

    pub fn record_login(
        &self,
        user_id: &str,
        device: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO login_history (id, user_id, device, ip_address, logged_in_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![new_id(), user_id, device, ip_address, format_ts(self.now())],
        )?;
        Ok(())
    }

    pub fn login_history(&self, user_id: &str, limit: usize) -> Result<Vec<LoginEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, device, ip_address, logged_in_at FROM login_history
             WHERE user_id = ?1 ORDER BY logged_in_at DESC LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![user_id, limit], rows::login_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn profile(&self, user_id: &str) -> Result<Profile, StoreError> {
        let conn = self.conn()?;
        load_profile(&conn, user_id)
    }

    pub fn profile_by_email(&self, email: &str) -> Result<Profile, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE p.email = ?1",
                rows::PROFILE_COLUMNS,
                rows::PROFILE_FROM
            ),
            params![email],
            rows::profile,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("profile"))
    }

    /// A profile that becomes complete fulfils `profile_completed`.
    pub fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE profiles SET display_name = ?2, phone = ?3, bio = ?4, location = ?5,
               company = ?6, position = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                user_id,
                update.display_name,
                update.phone,
                update.bio,
                update.location,
                update.company,
                update.position,
                format_ts(now)
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("profile"));
        }
        let profile = load_profile(&tx, user_id)?;
        if profile.is_complete() {
            complete_condition_in(&tx, user_id, UnlockCondition::ProfileCompleted, now)?;
        }
        tx.commit()?;
        Ok(profile)
    }

    pub fn notification_preferences(
        &self,
        user_id: &str,
    ) -> Result<NotificationPreferences, StoreError> {
        let conn = self.conn()?;
        let prefs = conn
            .query_row(
                "SELECT email_new_content, email_newsletter, email_invite_update,
                        line_new_content, line_reward, push_browser
                 FROM notification_preferences WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(NotificationPreferences {
                        email_new_content: row.get(0)?,
                        email_newsletter: row.get(1)?,
                        email_invite_update: row.get(2)?,
                        line_new_content: row.get(3)?,
                        line_reward: row.get(4)?,
                        push_browser: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(prefs.unwrap_or_default())
    }

    pub fn update_notification_preferences(
        &self,
        user_id: &str,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notification_preferences (
               user_id, email_new_content, email_newsletter, email_invite_update,
               line_new_content, line_reward, push_browser
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
               email_new_content = excluded.email_new_content,
               email_newsletter = excluded.email_newsletter,
               email_invite_update = excluded.email_invite_update,
               line_new_content = excluded.line_new_content,
               line_reward = excluded.line_reward,
               push_browser = excluded.push_browser",
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
        Ok(*prefs)
    }

    /// Stores the message and fulfils `feedback_sent`.
    pub fn submit_feedback(&self, user_id: &str, message: &str) -> Result<bool, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO feedback (id, user_id, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![new_id(), user_id, message, format_ts(now)],
        )?;
        let completed = complete_condition_in(&tx, user_id, UnlockCondition::FeedbackSent, now)?;
        tx.commit()?;
        Ok(completed)
    }
}
