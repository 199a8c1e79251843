//! Articles and their write-side validation.
//!
//! The write view is flat (`title`, `content`, `category_id`); the author is
//! never part of it. Whoever creates the article becomes its author.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use weeb_core::id::deserialize_lenient_id;
use weeb_core::validation::{check_length, Length};
use weeb_core::{ArticleId, CategoryId, Entity, FieldErrors, UserId};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;
pub const CONTENT_MIN: usize = 10;

/// Stored article.
///
/// # Invariants
/// - `author` and `created_at` are fixed at creation.
/// - `title` and `content` are stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: UserId,
    pub category: CategoryId,
}

impl Entity for Article {
    type Id = ArticleId;

    fn id(&self) -> ArticleId {
        self.id
    }
}

/// Write view as received from clients.
///
/// Unknown keys (`author`, `author_id`, `created_at`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleWrite {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub category_id: Option<CategoryId>,
}

impl ArticleWrite {
    /// Field validation that needs no lookups.
    ///
    /// With `partial == false` every field must be present. Category existence
    /// is checked by the caller, which merges its result into the same error
    /// set.
    pub fn validate(self, partial: bool) -> Result<ArticleChanges, FieldErrors> {
        let mut errors = FieldErrors::new();

        if !partial && self.category_id.is_none() {
            errors.add("category_id", "category_id is required.");
        }

        let title = match self.title {
            Some(t) => Some(validate_title(&t, &mut errors)),
            None if !partial => {
                errors.add("title", "This field is required.");
                None
            }
            None => None,
        };
        let content = match self.content {
            Some(c) => Some(validate_content(&c, &mut errors)),
            None if !partial => {
                errors.add("content", "This field is required.");
                None
            }
            None => None,
        };

        if errors.is_empty() {
            Ok(ArticleChanges {
                title,
                content,
                category: self.category_id,
            })
        } else {
            Err(errors)
        }
    }
}

/// Validated, trimmed changes. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<CategoryId>,
}

impl ArticleChanges {
    /// Complete draft for insertion, if every field is set.
    pub fn into_draft(self, author: UserId) -> Option<ArticleDraft> {
        Some(ArticleDraft {
            title: self.title?,
            content: self.content?,
            author,
            category: self.category?,
        })
    }

    pub fn apply(self, article: &mut Article) {
        if let Some(title) = self.title {
            article.title = title;
        }
        if let Some(content) = self.content {
            article.content = content;
        }
        if let Some(category) = self.category {
            article.category = category;
        }
    }
}

/// Everything needed to insert an article; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub author: UserId,
    pub category: CategoryId,
}

impl ArticleDraft {
    pub fn into_article(self, id: ArticleId, created_at: DateTime<Utc>) -> Article {
        Article {
            id,
            title: self.title,
            content: self.content,
            created_at,
            author: self.author,
            category: self.category,
        }
    }
}

fn validate_title(title: &str, errors: &mut FieldErrors) -> String {
    let title = title.trim();
    match check_length(title, TITLE_MIN, Some(TITLE_MAX)) {
        Length::TooShort => errors.add("title", "Title must be at least 3 characters long."),
        Length::TooLong => errors.add("title", "Title cannot exceed 255 characters."),
        Length::Ok => {}
    }
    title.to_string()
}

fn validate_content(content: &str, errors: &mut FieldErrors) -> String {
    let content = content.trim();
    if check_length(content, CONTENT_MIN, None) == Length::TooShort {
        errors.add("content", "Content must be at least 10 characters long.");
    }
    content.to_string()
}
