use std::collections::BTreeSet;

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use weeb_auth::{IdentitySnapshot, User};
use weeb_blog::{Article, Category};
use weeb_core::{ArticleId, UserId};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body of refresh and logout.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    pub features: Option<serde_json::Value>,
}

/// `axum::Json` whose rejections use the error envelope instead of a plain
/// text body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Public identity of an article's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorView,
    pub category: Category,
}

impl ArticleView {
    pub fn new(article: Article, author: &User, category: Category) -> Self {
        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            created_at: article.created_at,
            author: AuthorView::from(author),
            category,
        }
    }
}

/// Account as shown to its owner and to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub groups: BTreeSet<String>,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            is_staff: user.is_staff,
            groups: user.groups,
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: IdentitySnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use weeb_auth::NewUser;
    use weeb_core::CategoryId;

    fn user() -> User {
        NewUser {
            email: "writer@example.com".to_string(),
            first_name: "Wri".to_string(),
            last_name: "Ter".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            is_staff: false,
            groups: BTreeSet::new(),
        }
        .into_user(UserId::new(4), Utc::now())
    }

    #[test]
    fn article_view_nests_author_and_category() {
        let article = Article {
            id: ArticleId::new(1),
            title: "Hi!!".to_string(),
            content: "1234567890".to_string(),
            created_at: Utc::now(),
            author: UserId::new(4),
            category: CategoryId::new(2),
        };
        let category = Category {
            id: CategoryId::new(2),
            name: "News".to_string(),
        };
        let json = serde_json::to_value(ArticleView::new(article, &user(), category)).unwrap();
        assert_eq!(json["author"]["email"], "writer@example.com");
        assert_eq!(json["category"]["name"], "News");
        assert!(json["author"].get("password_hash").is_none());
    }

    #[test]
    fn user_view_has_no_password() {
        let json = serde_json::to_value(UserView::from(user())).unwrap();
        assert_eq!(json["is_active"], true);
        assert!(json.get("password_hash").is_none());
    }
}
