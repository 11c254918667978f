use crate::member::{MemberRank, RequiredRank, UserRole};
use crate::validation::{check_len, optional_text, FieldError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CONTENT_TAGS_MAX: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Article,
    Video,
    External,
}

wire_enum!(ContentType, "content type", {
    Article => "article",
    Video => "video",
    External => "external",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Scheduled,
    Published,
}

wire_enum!(ContentStatus, "content status", {
    Draft => "draft",
    Scheduled => "scheduled",
    Published => "published",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Like,
    Bookmark,
}

wire_enum!(InteractionType, "interaction type", {
    View => "view",
    Like => "like",
    Bookmark => "bookmark",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub status: ContentStatus,
    pub publish_date: Option<DateTime<Utc>>,
    pub author_id: Option<String>,
    pub author_name: String,
    pub author_bio: Option<String>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
    pub duration: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub premium: bool,
    pub required_rank: RequiredRank,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    /// Published, or scheduled with a publish date that has passed.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            ContentStatus::Published => true,
            ContentStatus::Scheduled => self.publish_date.is_some_and(|at| at <= now),
            ContentStatus::Draft => false,
        }
    }

    #[must_use]
    pub fn locked_for(&self, rank: MemberRank, role: UserRole) -> bool {
        role != UserRole::Admin && self.premium && !rank.satisfies(self.required_rank)
    }

    /// Copy safe to hand to a viewer who cannot open the body.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self.url = None;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub liked: bool,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentFilter {
    pub content_type: Option<ContentType>,
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentInput {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_bio: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub required_rank: Option<RequiredRank>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Validated content ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDraft {
    pub content_type: ContentType,
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub author_name: String,
    pub author_bio: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<String>,
    pub status: ContentStatus,
    pub publish_date: Option<DateTime<Utc>>,
    pub premium: bool,
    pub required_rank: RequiredRank,
    pub tags: Vec<String>,
}

impl ContentInput {
    /// Resolves the stored status: an explicit draft stays a draft, a
    /// future publish date schedules, anything else publishes now.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ContentDraft, ValidationError> {
        let mut errors = Vec::new();
        let title = self.title.trim().to_string();
        check_len(&mut errors, "title", &title, 1, 200);
        let author_name = self.author_name.trim().to_string();
        check_len(&mut errors, "author_name", &author_name, 1, 100);
        let url = optional_text(self.url);
        if self.content_type == ContentType::External {
            match &url {
                Some(u) if u.starts_with("http://") || u.starts_with("https://") => {}
                Some(_) => errors.push(FieldError::new(
                    "url",
                    "url must start with http:// or https://",
                )),
                None => errors.push(FieldError::new("url", "url is required for external content")),
            }
        }

        let mut tags: Vec<String> = Vec::new();
        for tag in self.tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.len() > CONTENT_TAGS_MAX {
            errors.push(FieldError::new(
                "tags",
                format!("at most {CONTENT_TAGS_MAX} tags are allowed"),
            ));
        }

        let (status, publish_date) = match (self.status, self.publish_date) {
            (Some(ContentStatus::Draft), at) => (ContentStatus::Draft, at),
            (Some(ContentStatus::Scheduled), None) => {
                errors.push(FieldError::new(
                    "publish_date",
                    "scheduled content needs a publish date",
                ));
                (ContentStatus::Scheduled, None)
            }
            (_, Some(at)) if at > now => (ContentStatus::Scheduled, Some(at)),
            (_, at) => (ContentStatus::Published, Some(at.unwrap_or(now))),
        };

        ValidationError::check(errors)?;
        let required_rank = if self.premium {
            self.required_rank.unwrap_or(RequiredRank::Rank(MemberRank::Gold))
        } else {
            RequiredRank::All
        };
        Ok(ContentDraft {
            content_type: self.content_type,
            title,
            description: optional_text(self.description),
            body: optional_text(self.body),
            author_name,
            author_bio: optional_text(self.author_bio),
            url,
            thumbnail_url: optional_text(self.thumbnail_url),
            duration: optional_text(self.duration),
            status,
            publish_date,
            premium: self.premium,
            required_rank,
            tags,
        })
    }
}
