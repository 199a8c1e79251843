use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use weeb_auth::{NewUser, User};
use weeb_blog::{Article, ArticleDraft, Category, NewCategory};
use weeb_core::{ArticleId, CategoryId, ReviewId, UserId};
use weeb_reviews::{NewReview, Review};

use super::r#trait::{ArticleStore, CategoryStore, ReviewStore, StoreError, TokenBlacklist, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    articles: BTreeMap<ArticleId, Article>,
    reviews: BTreeMap<ReviewId, Review>,
    blacklist: HashMap<Uuid, DateTime<Utc>>,
    last_id: i64,
}

impl Tables {
    /// Ids are unique across tables; that's fine for surrogate keys.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory backend for tests/dev. Everything lives behind one lock so that
/// cross-table rules are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        let id = UserId::new(t.next_id());
        let user = user.into_user(id, Utc::now());
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if t.users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        t.users.remove(&id).ok_or(StoreError::NotFound)?;
        t.articles.retain(|_, a| a.author != id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for InMemoryStore {
    async fn create_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut t = self.write()?;
        let id = CategoryId::new(t.next_id());
        let category = category.into_category(id);
        t.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let category = t.categories.get(&id).ok_or(StoreError::NotFound)?;
        let references = t.articles.values().filter(|a| a.category == id).count();
        if references > 0 {
            return Err(StoreError::Protected(format!(
                "category {:?} is used by {references} article(s)",
                category.name
            )));
        }
        t.categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn create_article(&self, draft: ArticleDraft) -> Result<Article, StoreError> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&draft.category) {
            return Err(missing_category(draft.category));
        }
        if !t.users.contains_key(&draft.author) {
            return Err(StoreError::NotFound);
        }
        let id = ArticleId::new(t.next_id());
        let article = draft.into_article(id, Utc::now());
        t.articles.insert(id, article.clone());
        Ok(article)
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>, StoreError> {
        Ok(self.read()?.articles.get(&id).cloned())
    }

    async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        let mut articles: Vec<Article> = self.read()?.articles.values().cloned().collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn update_article(&self, article: &Article) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&article.category) {
            return Err(missing_category(article.category));
        }
        let stored = t.articles.get_mut(&article.id).ok_or(StoreError::NotFound)?;
        stored.title = article.title.clone();
        stored.content = article.content.clone();
        stored.category = article.category;
        Ok(())
    }

    async fn delete_article(&self, id: ArticleId) -> Result<(), StoreError> {
        self.write()?.articles.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn create_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut t = self.write()?;
        let id = ReviewId::new(t.next_id());
        let review = review.into_review(id, Utc::now());
        t.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let mut reviews: Vec<Review> = self.read()?.reviews.values().cloned().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryStore {
    async fn blacklist_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        // Expired entries can never be presented again.
        let now = Utc::now();
        t.blacklist.retain(|_, exp| *exp > now);
        Ok(t.blacklist.insert(jti, expires_at).is_none())
    }

    async fn is_token_blacklisted(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(self.read()?.blacklist.contains_key(&jti))
    }
}

/// Same outcome a foreign-key violation gives on Postgres.
fn missing_category(id: CategoryId) -> StoreError {
    StoreError::Protected(format!("category {id} does not exist"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            is_active: true,
            is_staff: false,
            groups: BTreeSet::new(),
        }
    }

    async fn seeded() -> (InMemoryStore, User, Category) {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let category = store
            .create_category(NewCategory { name: "Anime".to_string() })
            .await
            .unwrap();
        (store, user, category)
    }

    fn draft(author: &User, category: &Category, title: &str) -> ArticleDraft {
        ArticleDraft {
            title: title.to_string(),
            content: "Some long enough content".to_string(),
            author: author.id,
            category: category.id,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let (store, _, _) = seeded().await;
        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(field) if field == "email"));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn articles_list_newest_first() {
        let (store, user, category) = seeded().await;
        let first = store.create_article(draft(&user, &category, "First")).await.unwrap();
        let second = store.create_article(draft(&user, &category, "Second")).await.unwrap();

        let ids: Vec<ArticleId> = store.list_articles().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn referenced_category_is_protected() {
        let (store, user, category) = seeded().await;
        let article = store.create_article(draft(&user, &category, "Title")).await.unwrap();

        assert!(matches!(
            store.delete_category(category.id).await,
            Err(StoreError::Protected(_))
        ));
        assert!(store.get_category(category.id).await.unwrap().is_some());

        store.delete_article(article.id).await.unwrap();
        store.delete_category(category.id).await.unwrap();
        assert!(store.get_category(category.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_author_cascades_to_articles() {
        let (store, user, category) = seeded().await;
        let other = store.create_user(new_user("b@example.com")).await.unwrap();
        store.create_article(draft(&user, &category, "Mine")).await.unwrap();
        let kept = store.create_article(draft(&other, &category, "Theirs")).await.unwrap();

        store.delete_user(user.id).await.unwrap();
        let remaining = store.list_articles().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept.id);
    }

    #[tokio::test]
    async fn update_keeps_author_and_timestamp() {
        let (store, user, category) = seeded().await;
        let article = store.create_article(draft(&user, &category, "Before")).await.unwrap();

        let mut changed = article.clone();
        changed.title = "After".to_string();
        changed.author = UserId::new(999);
        store.update_article(&changed).await.unwrap();

        let stored = store.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "After");
        assert_eq!(stored.author, user.id);
        assert_eq!(stored.created_at, article.created_at);
    }

    #[tokio::test]
    async fn dangling_category_is_a_reference_error() {
        let (store, user, category) = seeded().await;
        let article = store.create_article(draft(&user, &category, "Title")).await.unwrap();

        let mut moved = article.clone();
        moved.category = CategoryId::new(999);
        assert!(matches!(store.update_article(&moved).await, Err(StoreError::Protected(_))));

        let mut gone = article.clone();
        gone.id = ArticleId::new(999);
        assert!(matches!(store.update_article(&gone).await, Err(StoreError::NotFound)));

        let mut orphan = draft(&user, &category, "Orphan");
        orphan.category = CategoryId::new(999);
        assert!(matches!(store.create_article(orphan).await, Err(StoreError::Protected(_))));
    }

    #[tokio::test]
    async fn blacklist_reports_first_insert_only() {
        let store = InMemoryStore::new();
        let jti = Uuid::new_v4();
        let exp = Utc::now() + chrono::Duration::days(1);

        assert!(!store.is_token_blacklisted(jti).await.unwrap());
        assert!(store.blacklist_token(jti, exp).await.unwrap());
        assert!(!store.blacklist_token(jti, exp).await.unwrap());
        assert!(store.is_token_blacklisted(jti).await.unwrap());
    }
}
