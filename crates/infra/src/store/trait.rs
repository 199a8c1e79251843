use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use weeb_auth::{NewUser, User};
use weeb_blog::{Article, ArticleDraft, Category, NewCategory};
use weeb_core::{ArticleId, CategoryId, ReviewId, UserId};
use weeb_reviews::{NewReview, Review};

/// Storage operation error.
///
/// These are storage outcomes, not validation: the services turn them into
/// domain errors where the distinction matters to clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint was hit; the payload names the field.
    #[error("duplicate value for {0}")]
    Duplicate(String),

    /// A reference rule refused the write: a delete while other records
    /// still point at the target, or a write pointing at a missing record.
    #[error("record is still referenced: {0}")]
    Protected(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Account records. Emails are compared exactly; callers normalize first.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Duplicate("email")` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Replace every mutable column of an existing user.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    /// Also removes every article the user authored.
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create_category(&self, category: NewCategory) -> Result<Category, StoreError>;
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;
    /// Ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    /// `Protected` while any article references the category.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Assigns `id` and `created_at`.
    async fn create_article(&self, draft: ArticleDraft) -> Result<Article, StoreError>;
    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>, StoreError>;
    /// Newest first: `created_at` descending, then id descending.
    async fn list_articles(&self) -> Result<Vec<Article>, StoreError>;
    /// Persists title, content and category. Author and `created_at` never
    /// change. `NotFound` is the article; `Protected` is a missing category.
    async fn update_article(&self, article: &Article) -> Result<(), StoreError>;
    async fn delete_article(&self, id: ArticleId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, review: NewReview) -> Result<Review, StoreError>;
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError>;
    /// Newest first.
    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError>;
}

/// Revoked refresh tokens, keyed by `jti`.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// `true` when the token was not blacklisted before this call.
    async fn blacklist_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<bool, StoreError>;
    async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, StoreError>;
}
