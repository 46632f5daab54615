use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 10_000;
pub const SUMMARY_MAX_CHARS: usize = 300;
pub const TAGS_MAX_CHARS: usize = 200;

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(DomainError::Validation(format!(
                "Unknown article status '{other}'"
            ))),
        }
    }
}

/// Article entity - a short-form article owned by its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    pub author_name: String,
    /// Fencing token for optimistic concurrency. Starts at 1.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Create a new draft from already-sanitized fields.
    pub fn new(
        author_id: Uuid,
        author_name: String,
        fields: ArticleFields,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            content: fields.content,
            summary: fields.summary,
            tags: fields.tags,
            status: ArticleStatus::Draft,
            author_id,
            author_name,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Timestamp for the next successful edit; never earlier than or equal to
    /// the current `updated_at`.
    pub fn next_updated_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        }
    }

    /// The article as it looks after `changes` were written over `expected_version`.
    pub fn with_changes(mut self, changes: ArticleChanges, expected_version: i64) -> Self {
        self.title = changes.title;
        self.content = changes.content;
        self.summary = changes.summary;
        self.tags = changes.tags;
        self.updated_at = changes.updated_at;
        self.version = expected_version + 1;
        self
    }
}

/// Caller-supplied mutable fields of an article.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleFields {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub tags: Option<String>,
}

impl ArticleFields {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            summary: None,
            tags: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Required-field and length checks on the raw input.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.check_required()?;
        check_len("title", Some(&self.title), TITLE_MAX_CHARS)?;
        check_len("content", Some(&self.content), CONTENT_MAX_CHARS)?;
        check_len("summary", self.summary.as_deref(), SUMMARY_MAX_CHARS)?;
        check_len("tags", self.tags.as_deref(), TAGS_MAX_CHARS)?;
        Ok(())
    }

    /// Title and content must carry visible text. Also checked after
    /// sanitization, which may remove everything.
    pub fn check_required(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::Validation("title must not be blank".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(DomainError::Validation(
                "content must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    match value {
        Some(v) if v.chars().count() > max => Err(DomainError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Sanitized field values written by a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub updated_at: DateTime<Utc>,
}
