//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique) | `Duplicate` | email already registered |
//! | `23503` (foreign key) | `Protected` | category still referenced, or a referenced row vanished mid-write |
//! | anything else | `Backend` | connection, syntax, pool closed |
//!
//! Referential rules live in the schema: articles cascade with their author
//! and restrict deletion of their category.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use weeb_auth::{NewUser, User};
use weeb_blog::{Article, ArticleDraft, Category, NewCategory};
use weeb_core::{ArticleId, CategoryId, ReviewId, UserId};
use weeb_reviews::{NewReview, Review};

use super::r#trait::{ArticleStore, CategoryStore, ReviewStore, StoreError, TokenBlacklist, UserStore};

const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, is_active, is_staff, groups, date_joined";
const ARTICLE_COLUMNS: &str = "id, title, content, created_at, author_id, category_id";
const REVIEW_COLUMNS: &str =
    "id, first_name, last_name, email, phone, message, predicted_satisfaction, created_at";

/// All stores over one connection pool.
///
/// `Send + Sync`; the pool handles connection sharing.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!("database schema ready");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let groups: Vec<String> = user.groups.into_iter().collect();
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, first_name, last_name, password_hash, is_active, is_staff, groups) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(&groups)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let groups: Vec<&str> = user.groups.iter().map(String::as_str).collect();
        let result = sqlx::query(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4, password_hash = $5, \
             is_active = $6, is_staff = $7, groups = $8 WHERE id = $1",
        )
        .bind(user.id.get())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(&groups)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        expect_one(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        expect_one(result.rows_affected())
    }
}

#[async_trait]
impl CategoryStore for PostgresStore {
    async fn create_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(&category.name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_category", e))?;
        category_from_row(&row)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        expect_one(result.rows_affected())
    }
}

#[async_trait]
impl ArticleStore for PostgresStore {
    #[instrument(skip(self, draft), fields(author = %draft.author, category = %draft.category), err)]
    async fn create_article(&self, draft: ArticleDraft) -> Result<Article, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO articles (title, content, author_id, category_id) \
             VALUES ($1, $2, $3, $4) RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.author.get())
        .bind(draft.category.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_article", e))?;
        article_from_row(&row)
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_article", e))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_articles", e))?;
        rows.iter().map(article_from_row).collect()
    }

    #[instrument(skip(self, article), fields(article_id = %article.id), err)]
    async fn update_article(&self, article: &Article) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE articles SET title = $2, content = $3, category_id = $4 WHERE id = $1")
            .bind(article.id.get())
            .bind(&article.title)
            .bind(&article.content)
            .bind(article.category.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_article", e))?;
        expect_one(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn delete_article(&self, id: ArticleId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_article", e))?;
        expect_one(result.rows_affected())
    }
}

#[async_trait]
impl ReviewStore for PostgresStore {
    async fn create_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO reviews (first_name, last_name, email, phone, message, predicted_satisfaction) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(&review.first_name)
        .bind(&review.last_name)
        .bind(&review.email)
        .bind(review.phone.as_deref())
        .bind(&review.message)
        .bind(review.predicted_satisfaction)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_review", e))?;
        review_from_row(&row)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_review", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reviews", e))?;
        rows.iter().map(review_from_row).collect()
    }
}

#[async_trait]
impl TokenBlacklist for PostgresStore {
    async fn blacklist_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= now()")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("prune_blacklist", e))?;

        let result = sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("blacklist_token", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS hit FROM token_blacklist WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_token_blacklisted", e))?;
        Ok(row.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let groups: Vec<String> = row.try_get("groups").map_err(decode_error)?;
    Ok(User {
        id: UserId::new(row.try_get("id").map_err(decode_error)?),
        email: row.try_get("email").map_err(decode_error)?,
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        is_staff: row.try_get("is_staff").map_err(decode_error)?,
        groups: groups.into_iter().collect(),
        date_joined: row.try_get("date_joined").map_err(decode_error)?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, StoreError> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
    })
}

fn article_from_row(row: &PgRow) -> Result<Article, StoreError> {
    Ok(Article {
        id: ArticleId::new(row.try_get("id").map_err(decode_error)?),
        title: row.try_get("title").map_err(decode_error)?,
        content: row.try_get("content").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        author: UserId::new(row.try_get("author_id").map_err(decode_error)?),
        category: CategoryId::new(row.try_get("category_id").map_err(decode_error)?),
    })
}

fn review_from_row(row: &PgRow) -> Result<Review, StoreError> {
    Ok(Review {
        id: ReviewId::new(row.try_get("id").map_err(decode_error)?),
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        message: row.try_get("message").map_err(decode_error)?,
        predicted_satisfaction: row.try_get("predicted_satisfaction").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::anyhow!("failed to decode row: {err}"))
}

fn expect_one(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => {
                    let field = match db_err.constraint() {
                        Some(c) if c.contains("email") => "email",
                        Some(c) => c,
                        None => "unknown",
                    };
                    StoreError::Duplicate(field.to_string())
                }
                Some("23503") => StoreError::Protected(msg),
                _ => StoreError::Backend(anyhow::anyhow!(msg)),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Backend(anyhow::anyhow!("sqlx error in {operation}: {other}")),
    }
}
