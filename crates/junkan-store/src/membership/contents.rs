use super::{complete_condition_in, new_id, MembershipStore};
use crate::rows;
use crate::{StoreError, StoreErrorCode};
use chrono::{DateTime, Utc};
use junkan_model::{
    format_ts, Content, ContentDraft, ContentFilter, InteractionState, InteractionType,
    UnlockCondition,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;

const VIEWS_FOR_UNLOCK: i64 = 3;

/// `?1` binds the current timestamp.
const LIVE_CLAUSE: &str =
    "(c.status = 'published' OR (c.status = 'scheduled' AND c.publish_date <= ?1))";

/// Stays well under SQLite's bound-parameter limit.
const TAG_LOOKUP_CHUNK: usize = 500;

fn attach_tags(conn: &Connection, contents: &mut [Content]) -> Result<(), StoreError> {
    for chunk in contents.chunks_mut(TAG_LOOKUP_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT ct.content_id, t.name FROM content_tags ct
             JOIN tags t ON t.id = ct.tag_id
             WHERE ct.content_id IN ({placeholders})
             ORDER BY ct.content_id, ct.position"
        ))?;
        let mut by_content: HashMap<String, Vec<String>> = HashMap::new();
        let pairs = stmt.query_map(
            params_from_iter(chunk.iter().map(|c| c.id.as_str())),
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;
        for pair in pairs {
            let (content_id, tag) = pair?;
            by_content.entry(content_id).or_default().push(tag);
        }
        for content in chunk.iter_mut() {
            content.tags = by_content.remove(&content.id).unwrap_or_default();
        }
    }
    Ok(())
}

fn write_tags(conn: &Connection, content_id: &str, tags: &[String]) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM content_tags WHERE content_id = ?1",
        params![content_id],
    )?;
    for (position, tag) in tags.iter().enumerate() {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])?;
        let tag_id: i64 =
            conn.query_row("SELECT id FROM tags WHERE name = ?1", params![tag], |row| {
                row.get(0)
            })?;
        conn.execute(
            "INSERT OR IGNORE INTO content_tags (content_id, tag_id, position) VALUES (?1, ?2, ?3)",
            params![content_id, tag_id, i64::try_from(position).unwrap_or(i64::MAX)],
        )?;
    }
    Ok(())
}

fn load_content(conn: &Connection, id: &str) -> Result<Content, StoreError> {
    let content = conn
        .query_row(
            &format!("SELECT {} FROM contents c WHERE c.id = ?1", rows::CONTENT_COLUMNS),
            params![id],
            rows::content,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("content"))?;
    let mut one = [content];
    attach_tags(conn, &mut one)?;
    let [content] = one;
    Ok(content)
}

fn query_contents(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Content>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut contents = stmt
        .query_map(params, rows::content)?
        .collect::<Result<Vec<_>, _>>()?;
    attach_tags(conn, &mut contents)?;
    Ok(contents)
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl MembershipStore {
    pub fn create_content(
        &self,
        author_id: Option<&str>,
        draft: &ContentDraft,
    ) -> Result<Content, StoreError> {
        let now = format_ts(self.now());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = new_id();
        tx.execute(
            "INSERT INTO contents (
               id, content_type, title, description, body, status, publish_date, author_id,
               author_name, author_bio, thumbnail_url, url, duration, views, likes, premium,
               required_rank, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, 0, ?14, ?15, ?16, ?16)",
            params![
                id,
                draft.content_type.as_str(),
                draft.title,
                draft.description,
                draft.body,
                draft.status.as_str(),
                draft.publish_date.map(format_ts),
                author_id,
                draft.author_name,
                draft.author_bio,
                draft.thumbnail_url,
                draft.url,
                draft.duration,
                draft.premium,
                draft.required_rank.as_str(),
                now
            ],
        )?;
        write_tags(&tx, &id, &draft.tags)?;
        let content = load_content(&tx, &id)?;
        tx.commit()?;
        tracing::info!(content_id = %content.id, status = content.status.as_str(), "content created");
        Ok(content)
    }

    pub fn update_content(&self, id: &str, draft: &ContentDraft) -> Result<Content, StoreError> {
        let now = format_ts(self.now());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE contents SET content_type = ?2, title = ?3, description = ?4, body = ?5,
               status = ?6, publish_date = ?7, author_name = ?8, author_bio = ?9,
               thumbnail_url = COALESCE(?10, thumbnail_url), url = ?11, duration = ?12,
               premium = ?13, required_rank = ?14, updated_at = ?15
             WHERE id = ?1",
            params![
                id,
                draft.content_type.as_str(),
                draft.title,
                draft.description,
                draft.body,
                draft.status.as_str(),
                draft.publish_date.map(format_ts),
                draft.author_name,
                draft.author_bio,
                draft.thumbnail_url,
                draft.url,
                draft.duration,
                draft.premium,
                draft.required_rank.as_str(),
                now
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("content"));
        }
        write_tags(&tx, id, &draft.tags)?;
        let content = load_content(&tx, id)?;
        tx.commit()?;
        Ok(content)
    }

    pub fn delete_content(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM contents WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("content"));
        }
        Ok(())
    }

    pub fn set_thumbnail(&self, id: &str, url: &str) -> Result<Content, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE contents SET thumbnail_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, url, format_ts(self.now())],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("content"));
        }
        load_content(&conn, id)
    }

    pub fn content(&self, id: &str) -> Result<Content, StoreError> {
        let conn = self.conn()?;
        load_content(&conn, id)
    }

    /// Admin listing, newest first.
    pub fn all_contents(&self, filter: &ContentFilter) -> Result<Vec<Content>, StoreError> {
        let conn = self.conn()?;
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);
        query_contents(
            &conn,
            &format!(
                "SELECT {} FROM contents c
                 WHERE (?1 IS NULL OR c.content_type = ?1)
                   AND (?2 IS NULL OR c.status = ?2)
                   AND (?3 IS NULL OR c.title LIKE ?3 ESCAPE '\\' OR c.author_name LIKE ?3 ESCAPE '\\')
                 ORDER BY c.created_at DESC LIMIT ?4",
                rows::CONTENT_COLUMNS
            ),
            params![
                filter.content_type.map(|t| t.as_str()),
                filter.status.map(|s| s.as_str()),
                search,
                sql_limit(filter.limit.max(1))
            ],
        )
    }

    /// Published plus scheduled items whose publish date has passed.
    pub fn live_contents(&self, now: DateTime<Utc>) -> Result<Vec<Content>, StoreError> {
        let conn = self.conn()?;
        query_contents(
            &conn,
            &format!(
                "SELECT {} FROM contents c WHERE {LIVE_CLAUSE}
                 ORDER BY COALESCE(c.publish_date, c.created_at) DESC, c.id",
                rows::CONTENT_COLUMNS
            ),
            params![format_ts(now)],
        )
    }

    /// Other live items of the same type, newest first.
    pub fn related_contents(
        &self,
        content: &Content,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Content>, StoreError> {
        let conn = self.conn()?;
        query_contents(
            &conn,
            &format!(
                "SELECT {} FROM contents c
                 WHERE {LIVE_CLAUSE} AND c.content_type = ?2 AND c.id <> ?3
                 ORDER BY COALESCE(c.publish_date, c.created_at) DESC LIMIT ?4",
                rows::CONTENT_COLUMNS
            ),
            params![
                format_ts(now),
                content.content_type.as_str(),
                content.id,
                sql_limit(limit)
            ],
        )
    }

    /// Live items ranked by likes plus bookmarks, then recency.
    pub fn recommended(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Content>, StoreError> {
        let conn = self.conn()?;
        query_contents(
            &conn,
            &format!(
                "SELECT {} FROM contents c WHERE {LIVE_CLAUSE}
                 ORDER BY (SELECT COUNT(*) FROM user_interactions ui
                           WHERE ui.content_id = c.id
                             AND ui.interaction_type IN ('like', 'bookmark')) DESC,
                          c.created_at DESC
                 LIMIT ?2",
                rows::CONTENT_COLUMNS
            ),
            params![format_ts(now), sql_limit(limit)],
        )
    }

    pub fn content_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM contents", [], |row| rows::count(row, 0))?)
    }

    /// Bumps the view counter; the first view per member is remembered and
    /// the third distinct one fulfils `content_views_3`.
    pub fn record_view(&self, user_id: &str, content_id: &str) -> Result<Content, StoreError> {
        let now = self.now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE contents SET views = views + 1 WHERE id = ?1",
            params![content_id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("content"));
        }
        tx.execute(
            "INSERT OR IGNORE INTO user_interactions (user_id, content_id, interaction_type, created_at)
             VALUES (?1, ?2, 'view', ?3)",
            params![user_id, content_id, format_ts(now)],
        )?;
        let viewed: i64 = tx.query_row(
            "SELECT COUNT(*) FROM user_interactions WHERE user_id = ?1 AND interaction_type = 'view'",
            params![user_id],
            |row| row.get(0),
        )?;
        if viewed >= VIEWS_FOR_UNLOCK {
            complete_condition_in(&tx, user_id, UnlockCondition::ContentViews3, now)?;
        }
        let content = load_content(&tx, content_id)?;
        tx.commit()?;
        Ok(content)
    }

    /// Flips a like or bookmark and returns the new state. `contents.likes`
    /// always equals the number of like rows.
    pub fn toggle_interaction(
        &self,
        user_id: &str,
        content_id: &str,
        kind: InteractionType,
    ) -> Result<bool, StoreError> {
        if kind == InteractionType::View {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "views cannot be toggled",
            ));
        }
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
        let removed = tx.execute(
            "DELETE FROM user_interactions
             WHERE user_id = ?1 AND content_id = ?2 AND interaction_type = ?3",
            params![user_id, content_id, kind.as_str()],
        )?;
        let active = removed == 0;
        if active {
            tx.execute(
                "INSERT INTO user_interactions (user_id, content_id, interaction_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, content_id, kind.as_str(), format_ts(now)],
            )?;
        }
        if kind == InteractionType::Like {
            tx.execute(
                "UPDATE contents SET likes = (
                   SELECT COUNT(*) FROM user_interactions
                   WHERE content_id = ?1 AND interaction_type = 'like'
                 ) WHERE id = ?1",
                params![content_id],
            )?;
        }
        tx.commit()?;
        Ok(active)
    }

    pub fn interaction_state(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<InteractionState, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT interaction_type FROM user_interactions WHERE user_id = ?1 AND content_id = ?2",
        )?;
        let kinds = stmt
            .query_map(params![user_id, content_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InteractionState {
            liked: kinds.iter().any(|k| k == InteractionType::Like.as_str()),
            bookmarked: kinds.iter().any(|k| k == InteractionType::Bookmark.as_str()),
        })
    }

    /// Contents the member liked or bookmarked, most recent interaction first.
    pub fn interacted_contents(
        &self,
        user_id: &str,
        kind: InteractionType,
    ) -> Result<Vec<Content>, StoreError> {
        let conn = self.conn()?;
        query_contents(
            &conn,
            &format!(
                "SELECT {} FROM user_interactions ui
                 JOIN contents c ON c.id = ui.content_id
                 WHERE ui.user_id = ?1 AND ui.interaction_type = ?2
                 ORDER BY ui.created_at DESC",
                rows::CONTENT_COLUMNS
            ),
            params![user_id, kind.as_str()],
        )
    }
}
