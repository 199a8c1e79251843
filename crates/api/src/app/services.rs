//! Service layer: every HTTP operation as one async method.
//!
//! Handlers parse input and shape envelopes; everything with a rule in it
//! happens here, against the injected stores, token codec and classifier.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use weeb_ai::SatisfactionClassifier;
use weeb_auth::{
    active_principal, authorize, require_authenticated, require_staff, verify_password, Action, Actor,
    AdminUserInput, AuthzError, Hs256Jwt, IdentitySnapshot, JwtValidator, PasswordPolicy, Registration,
    TokenKind, User, UserPatch,
};
use weeb_blog::{Article, ArticleChanges, ArticleWrite, Category, CategoryInput};
use weeb_core::validation::normalize_email;
use weeb_core::{ArticleId, CategoryId, DomainError, FieldErrors, ReviewId, UserId};
use weeb_infra::{ensure_superuser, StoreError, StoreSet};
use weeb_reviews::{Review, ReviewSubmission};

use crate::app::dto::{ArticleView, LoginRequest, LoginResponse, UserView};
use crate::app::errors::ApiError;
use crate::config::ApiConfig;

pub const ARTICLE_NOT_FOUND: &str = "No article found.";
pub const CATEGORY_NOT_FOUND: &str = "No category found.";
pub const USER_NOT_FOUND: &str = "No user found.";
pub const REVIEW_NOT_FOUND: &str = "No review found.";
pub const CATEGORY_MISSING: &str = "This category does not exist.";
pub const DUPLICATE_EMAIL: &str = "A user with this email already exists.";
pub const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";
pub const INACTIVE_ACCOUNT: &str =
    "This account is inactive. Please wait for an administrator to activate it.";
pub const INVALID_REFRESH: &str = "Token is invalid or expired";
pub const INVALID_LOGOUT: &str = "Invalid or expired token.";

#[derive(Clone)]
pub struct AppServices {
    stores: StoreSet,
    jwt: Arc<Hs256Jwt>,
    password_policy: PasswordPolicy,
    classifier: Option<Arc<dyn SatisfactionClassifier>>,
    environment: String,
}

impl AppServices {
    pub fn new(stores: StoreSet, jwt: Arc<Hs256Jwt>, classifier: Option<Arc<dyn SatisfactionClassifier>>) -> Self {
        Self {
            stores,
            jwt,
            password_policy: PasswordPolicy::default(),
            classifier,
            environment: "development".to_string(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Production wiring: stores per build features, bootstrap superuser,
    /// token codec and the classifier artifact.
    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let stores = build_stores(config).await?;

        if let Some(admin) = &config.admin {
            ensure_superuser(stores.users.as_ref(), &admin.email, &admin.password)
                .await
                .context("bootstrapping the superuser")?;
        }

        let jwt = Arc::new(Hs256Jwt::new(
            config.jwt_secret.as_bytes(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));
        let classifier = weeb_ai::load_classifier(&config.model_path);

        Ok(Self::new(stores, jwt, classifier).with_environment(config.environment.clone()))
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt.clone()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    // ─────────────────────────────────────────────────────────────────────
    // Articles
    // ─────────────────────────────────────────────────────────────────────

    /// Newest first. Empty is not an error here; the handler decides.
    pub async fn list_articles(&self) -> Result<Vec<ArticleView>, ApiError> {
        let articles = self.stores.articles.list_articles().await?;
        if articles.is_empty() {
            return Ok(Vec::new());
        }

        let users: HashMap<UserId, User> = self
            .stores
            .users
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let categories: HashMap<CategoryId, Category> = self
            .stores
            .categories
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        articles
            .into_iter()
            .map(|article| {
                let author = users.get(&article.author).ok_or_else(|| dangling(article.id, "author"))?;
                let category = categories
                    .get(&article.category)
                    .cloned()
                    .ok_or_else(|| dangling(article.id, "category"))?;
                Ok(ArticleView::new(article, author, category))
            })
            .collect()
    }

    pub async fn get_article(&self, id: ArticleId) -> Result<ArticleView, ApiError> {
        let article = self.load_article(id).await?;
        self.article_view(article).await
    }

    /// The author is always the caller; the payload cannot name one.
    pub async fn create_article(&self, actor: &Actor, write: ArticleWrite) -> Result<ArticleView, ApiError> {
        let grant = authorize(actor, Action::Create, None)?;
        let author = actor.user_id().ok_or(AuthzError::AuthenticationRequired)?;
        tracing::debug!(?grant, %author, "article create authorized");

        let draft = self
            .validate_article(write, false)
            .await?
            .into_draft(author)
            .ok_or_else(|| ApiError::Internal("complete article write produced no draft".to_string()))?;

        let article = match self.stores.articles.create_article(draft).await {
            Ok(article) => article,
            // Category removed between validation and insert.
            Err(StoreError::NotFound | StoreError::Protected(_)) => {
                return Err(DomainError::validation("category_id", CATEGORY_MISSING).into());
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(article_id = %article.id, %author, "article created");
        self.article_view(article).await
    }

    /// PUT (`partial == false`) and PATCH share this path.
    ///
    /// Checks run in a fixed order: authentication, activation, existence,
    /// ownership, then field validation.
    pub async fn update_article(
        &self,
        actor: &Actor,
        id: ArticleId,
        write: ArticleWrite,
        partial: bool,
    ) -> Result<ArticleView, ApiError> {
        active_principal(actor)?;
        let mut article = self.load_article(id).await?;
        let grant = authorize(actor, Action::Update, Some(article.author))?;
        tracing::debug!(?grant, article_id = %id, partial, "article update authorized");

        self.validate_article(write, partial).await?.apply(&mut article);
        match self.stores.articles.update_article(&article).await {
            Ok(()) => {}
            // Category removed between validation and the write.
            Err(StoreError::Protected(_)) => {
                return Err(DomainError::validation("category_id", CATEGORY_MISSING).into());
            }
            Err(StoreError::NotFound) => return Err(ApiError::not_found(ARTICLE_NOT_FOUND)),
            Err(e) => return Err(e.into()),
        }
        self.article_view(article).await
    }

    /// Returns the deleted article's title.
    pub async fn delete_article(&self, actor: &Actor, id: ArticleId) -> Result<String, ApiError> {
        active_principal(actor)?;
        let article = self.load_article(id).await?;
        let grant = authorize(actor, Action::Delete, Some(article.author))?;
        tracing::debug!(?grant, article_id = %id, "article delete authorized");

        match self.stores.articles.delete_article(id).await {
            Ok(()) => Ok(article.title),
            Err(StoreError::NotFound) => Err(ApiError::not_found(ARTICLE_NOT_FOUND)),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_article(&self, id: ArticleId) -> Result<Article, ApiError> {
        self.stores
            .articles
            .get_article(id)
            .await?
            .ok_or_else(|| ApiError::not_found(ARTICLE_NOT_FOUND))
    }

    async fn article_view(&self, article: Article) -> Result<ArticleView, ApiError> {
        let author = self
            .stores
            .users
            .get_user(article.author)
            .await?
            .ok_or_else(|| dangling(article.id, "author"))?;
        let category = self
            .stores
            .categories
            .get_category(article.category)
            .await?
            .ok_or_else(|| dangling(article.id, "category"))?;
        Ok(ArticleView::new(article, &author, category))
    }

    /// Field rules plus category existence, reported together.
    async fn validate_article(&self, write: ArticleWrite, partial: bool) -> Result<ArticleChanges, ApiError> {
        let missing_category = match write.category_id {
            Some(id) => self.stores.categories.get_category(id).await?.is_none(),
            None => false,
        };

        match write.validate(partial) {
            Ok(changes) if !missing_category => Ok(changes),
            Ok(_) => Err(DomainError::validation("category_id", CATEGORY_MISSING).into()),
            Err(mut errors) => {
                if missing_category {
                    errors.add("category_id", CATEGORY_MISSING);
                }
                Err(DomainError::from(errors).into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Ok(self.stores.categories.list_categories().await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, ApiError> {
        self.stores
            .categories
            .get_category(id)
            .await?
            .ok_or_else(|| ApiError::not_found(CATEGORY_NOT_FOUND))
    }

    pub async fn create_category(&self, actor: &Actor, input: CategoryInput) -> Result<Category, ApiError> {
        require_staff(actor)?;
        let category = self.stores.categories.create_category(input.validate()?).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Refused while any article still points at the category.
    pub async fn delete_category(&self, actor: &Actor, id: CategoryId) -> Result<Category, ApiError> {
        require_staff(actor)?;
        let category = self.get_category(id).await?;
        match self.stores.categories.delete_category(id).await {
            Ok(()) => Ok(category),
            Err(StoreError::Protected(detail)) => {
                tracing::debug!(category_id = %id, %detail, "category delete refused");
                Err(DomainError::protected(format!(
                    "Cannot delete category \"{}\": it is referenced by existing articles.",
                    category.name
                ))
                .into())
            }
            Err(StoreError::NotFound) => Err(ApiError::not_found(CATEGORY_NOT_FOUND)),
            Err(e) => Err(e.into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────

    /// Self-registration. The account starts inactive.
    pub async fn register(&self, registration: Registration) -> Result<UserView, ApiError> {
        let policy = self.password_policy.clone();
        let new_user = off_runtime(move || registration.into_new_user(&policy)).await??;
        let user = self.insert_user(new_user).await?;
        tracing::info!(user_id = %user.id, "user registered; pending activation");
        Ok(user.into())
    }

    /// A known but inactive account is told it is inactive, whatever the
    /// password; every other failure gets the same generic credentials
    /// message.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        let email = normalize_email(&request.email);
        let mut errors = FieldErrors::new();
        if email.is_empty() {
            errors.add("email", "This field is required.");
        }
        if request.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.finish()?;

        let invalid = || ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string());
        let user = self
            .stores
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;
        if !user.is_active {
            return Err(ApiError::BadRequest(INACTIVE_ACCOUNT.to_string()));
        }
        let hash = user.password_hash.clone();
        let password = request.password;
        if !off_runtime(move || verify_password(&hash, &password)).await? {
            return Err(invalid());
        }

        let snapshot = IdentitySnapshot::from(&user);
        let pair = self.jwt.issue_pair(snapshot.clone(), Utc::now())?;
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(LoginResponse {
            access: pair.access,
            refresh: pair.refresh,
            user: snapshot,
        })
    }

    /// New access token carrying the refresh token's identity snapshot.
    pub async fn refresh(&self, refresh: Option<String>) -> Result<String, ApiError> {
        let token = refresh
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DomainError::validation("refresh", "This field is required."))?;

        let now = Utc::now();
        let claims = self
            .jwt
            .validate(token.trim(), TokenKind::Refresh, now)
            .map_err(|_| ApiError::Unauthenticated(INVALID_REFRESH.to_string()))?;
        if self.stores.blacklist.is_token_blacklisted(claims.jti).await? {
            return Err(ApiError::Unauthenticated("Token is blacklisted".to_string()));
        }
        Ok(self.jwt.access_from_refresh(&claims, now)?)
    }

    /// Blacklist one of the caller's own refresh tokens. Any unusable token,
    /// including another account's, is a 400.
    pub async fn logout(&self, actor: &Actor, refresh: Option<String>) -> Result<(), ApiError> {
        let principal = require_authenticated(actor)?;
        let invalid = || ApiError::BadRequest(INVALID_LOGOUT.to_string());

        let token = refresh.filter(|t| !t.trim().is_empty()).ok_or_else(invalid)?;
        let claims = self
            .jwt
            .validate(token.trim(), TokenKind::Refresh, Utc::now())
            .map_err(|_| invalid())?;
        if claims.sub != principal.user_id {
            tracing::warn!(user_id = %principal.user_id, owner = %claims.sub, "logout with another account's token refused");
            return Err(invalid());
        }
        if !self.stores.blacklist.blacklist_token(claims.jti, claims.expires_at()).await? {
            return Err(invalid());
        }
        tracing::info!(user_id = %principal.user_id, jti = %claims.jti, "refresh token blacklisted");
        Ok(())
    }

    /// The caller's live account record.
    pub async fn me(&self, actor: &Actor) -> Result<UserView, ApiError> {
        let principal = require_authenticated(actor)?;
        self.stores
            .users
            .get_user(principal.user_id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ApiError::Unauthenticated("User not found".to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // User administration (staff)
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<UserView>, ApiError> {
        require_staff(actor)?;
        Ok(self
            .stores
            .users
            .list_users()
            .await?
            .into_iter()
            .map(UserView::from)
            .collect())
    }

    pub async fn get_user(&self, actor: &Actor, id: UserId) -> Result<UserView, ApiError> {
        require_staff(actor)?;
        match self.load_user(id).await {
            Ok(user) => Ok(user.into()),
            Err(ApiError::NotFound(message)) => Err(ApiError::NoResults(message)),
            Err(e) => Err(e),
        }
    }

    pub async fn create_user(&self, actor: &Actor, input: AdminUserInput) -> Result<UserView, ApiError> {
        require_staff(actor)?;
        let policy = self.password_policy.clone();
        let new_user = off_runtime(move || input.into_new_user(&policy)).await??;
        let user = self.insert_user(new_user).await?;
        tracing::info!(user_id = %user.id, active = user.is_active, staff = user.is_staff, "user created by staff");
        Ok(user.into())
    }

    pub async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        patch: UserPatch,
        partial: bool,
    ) -> Result<UserView, ApiError> {
        require_staff(actor)?;
        let user = self.load_user(id).await?;
        let policy = self.password_policy.clone();
        let (user, applied) = off_runtime(move || {
            let mut user = user;
            let applied = patch.apply(&mut user, partial, &policy);
            (user, applied)
        })
        .await?;
        applied?;

        match self.stores.users.update_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(DomainError::validation("email", DUPLICATE_EMAIL).into()),
            Err(StoreError::NotFound) => return Err(ApiError::not_found(USER_NOT_FOUND)),
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = %id, active = user.is_active, staff = user.is_staff, "user updated");
        Ok(user.into())
    }

    /// Removes the account and every article it authored.
    pub async fn delete_user(&self, actor: &Actor, id: UserId) -> Result<UserView, ApiError> {
        require_staff(actor)?;
        let user = self.load_user(id).await?;
        match self.stores.users.delete_user(id).await {
            Ok(()) => {
                tracing::info!(user_id = %id, "user deleted");
                Ok(user.into())
            }
            Err(StoreError::NotFound) => Err(ApiError::not_found(USER_NOT_FOUND)),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_user(&self, id: UserId) -> Result<User, ApiError> {
        self.stores
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))
    }

    async fn insert_user(&self, new_user: weeb_auth::NewUser) -> Result<User, ApiError> {
        match self.stores.users.create_user(new_user).await {
            Ok(user) => Ok(user),
            Err(StoreError::Duplicate(_)) => Err(DomainError::validation("email", DUPLICATE_EMAIL).into()),
            Err(e) => Err(e.into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reviews
    // ─────────────────────────────────────────────────────────────────────

    /// Save a contact-form review, attaching a prediction when possible.
    ///
    /// Prediction problems never fail the submission.
    pub async fn submit_review(&self, submission: ReviewSubmission) -> Result<Review, ApiError> {
        let new_review = submission.validate()?;
        let prediction = self.predict_satisfaction(&new_review.message);
        let review = self
            .stores
            .reviews
            .create_review(new_review.with_prediction(prediction))
            .await?;
        tracing::info!(review_id = %review.id, prediction = ?review.predicted_satisfaction, "review saved");
        Ok(review)
    }

    pub async fn list_reviews(&self, actor: &Actor) -> Result<Vec<Review>, ApiError> {
        require_staff(actor)?;
        Ok(self.stores.reviews.list_reviews().await?)
    }

    pub async fn get_review(&self, actor: &Actor, id: ReviewId) -> Result<Review, ApiError> {
        require_staff(actor)?;
        self.stores
            .reviews
            .get_review(id)
            .await?
            .ok_or_else(|| ApiError::not_found(REVIEW_NOT_FOUND))
    }

    /// Raw classifier access. Errors are plain strings for the `{"error"}`
    /// body.
    pub fn predict(&self, features: Option<serde_json::Value>) -> Result<i64, String> {
        let text = match features {
            Some(serde_json::Value::String(text)) => text,
            Some(_) => return Err("'features' must be a string.".to_string()),
            None => return Err("Missing 'features' field.".to_string()),
        };
        let classifier = self.classifier.as_ref().ok_or_else(|| "Model not loaded.".to_string())?;
        classifier.predict(&text).map_err(|e| e.to_string())
    }

    fn predict_satisfaction(&self, message: &str) -> Option<i64> {
        if message.trim().is_empty() {
            return None;
        }
        let Some(classifier) = &self.classifier else {
            tracing::warn!("no satisfaction model loaded; saving review without prediction");
            return None;
        };
        match classifier.predict(message) {
            Ok(label) => Some(label),
            Err(error) => {
                tracing::warn!(%error, "satisfaction prediction failed; saving review without prediction");
                None
            }
        }
    }
}

fn dangling(article: ArticleId, what: &str) -> ApiError {
    ApiError::Internal(format!("article {article} references a missing {what}"))
}

#[cfg(feature = "postgres")]
async fn build_stores(config: &ApiConfig) -> anyhow::Result<StoreSet> {
    match &config.database_url {
        Some(url) => {
            let store = weeb_infra::PostgresStore::connect(url)
                .await
                .context("connecting to DATABASE_URL")?;
            tracing::info!("using postgres stores");
            Ok(StoreSet::from_backend(Arc::new(store)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Ok(StoreSet::in_memory())
        }
    }
}

/// Argon2 hashing and verification run on the blocking pool.
async fn off_runtime<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("password task failed: {e}")))
}

#[cfg(not(feature = "postgres"))]
async fn build_stores(config: &ApiConfig) -> anyhow::Result<StoreSet> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but postgres support is not compiled in; using in-memory stores");
    }
    Ok(StoreSet::in_memory())
}
