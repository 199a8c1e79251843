use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use weeb_ai::{ClassifierError, SatisfactionClassifier};
use weeb_api::app::{build_app, services::AppServices};
use weeb_auth::{hash_password, Hs256Jwt, NewUser, User, MODERATORS_GROUP};
use weeb_blog::NewCategory;
use weeb_infra::StoreSet;

const SECRET: &str = "black-box-secret";
const PASSWORD: &str = "TestPass123!";

struct TestServer {
    base_url: String,
    stores: StoreSet,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(classifier: Option<Arc<dyn SatisfactionClassifier>>) -> Self {
        let stores = StoreSet::in_memory();
        let jwt = Arc::new(Hs256Jwt::new(
            SECRET.as_bytes(),
            ChronoDuration::minutes(60),
            ChronoDuration::days(7),
        ));
        let services = Arc::new(AppServices::new(stores.clone(), jwt, classifier).with_environment("test"));

        // Same router as prod, on an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            stores,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn seed_user(&self, email: &str, active: bool, staff: bool, groups: &[&str]) -> User {
        self.stores
            .users
            .create_user(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                is_active: active,
                is_staff: staff,
                groups: groups.iter().map(|g| g.to_string()).collect::<BTreeSet<_>>(),
            })
            .await
            .unwrap()
    }

    async fn seed_category(&self, name: &str) -> i64 {
        self.stores
            .categories
            .create_category(NewCategory { name: name.to_string() })
            .await
            .unwrap()
            .id
            .get()
    }

    async fn login(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login/"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["access"].as_str().unwrap().to_string()
    }

    async fn post_article(&self, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut req = self.client.post(self.url("/articles/")).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Fixed(i64);

impl SatisfactionClassifier for Fixed {
    fn predict(&self, text: &str) -> Result<i64, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::InvalidInput("empty text".to_string()));
        }
        Ok(self.0)
    }
}

fn article_body(category: i64) -> Value {
    json!({
        "title": "Hi!!",
        "content": "1234567890",
        "category_id": category.to_string(),
    })
}

#[tokio::test]
async fn health_and_public_reads() {
    let server = TestServer::spawn(None).await;

    let health: Value = server
        .client
        .get(server.url("/health/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({ "status": "ok", "service": "weeb_api", "environment": "test" }));

    let res = server.client.get(server.url("/articles/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "results": "No articles found." }));

    let res = server.client.get(server.url("/categories/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.get(server.url("/articles/abc/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized() {
    let server = TestServer::spawn(None).await;
    let category = server.seed_category("Anime").await;

    let res = server.post_article(None, article_body(category)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.client.delete(server.url("/articles/1/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_tokens_are_rejected_on_every_route() {
    let server = TestServer::spawn(None).await;

    let now = Utc::now();
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({ "token_type": "access", "sub": 1, "iat": now.timestamp(), "exp": (now + ChronoDuration::minutes(5)).timestamp() }),
        &EncodingKey::from_secret(b"wrong-secret"),
    )
    .unwrap();

    for token in [forged.as_str(), "garbage"] {
        let res = server
            .client
            .get(server.url("/categories/"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn inactive_user_cannot_create() {
    let server = TestServer::spawn(None).await;
    let category = server.seed_category("Anime").await;
    server.seed_user("pending@example.com", false, false, &[]).await;

    // Inactive accounts cannot log in, so mint a token directly.
    let user = server
        .stores
        .users
        .find_user_by_email("pending@example.com")
        .await
        .unwrap()
        .unwrap();
    let jwt = Hs256Jwt::new(SECRET.as_bytes(), ChronoDuration::minutes(5), ChronoDuration::days(1));
    let token = jwt.issue_pair((&user).into(), Utc::now()).unwrap().access;

    let res = server.post_article(Some(&token), article_body(category)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_article_sets_author_from_caller() {
    let server = TestServer::spawn(None).await;
    let category = server.seed_category("Anime").await;
    let author = server.seed_user("author@example.com", true, false, &[]).await;
    let token = server.login("author@example.com").await;

    let mut body = article_body(category);
    body["author_id"] = json!(999);
    let res = server.post_article(Some(&token), body).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["success"], json!(true));
    assert_eq!(created["message"], json!("Article created successfully."));
    assert_eq!(created["results"]["title"], json!("Hi!!"));
    assert_eq!(created["results"]["author"]["id"], json!(author.id.get()));
    assert_eq!(created["results"]["category"]["name"], json!("Anime"));

    let list: Value = server
        .client
        .get(server.url("/articles/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], json!(1));

    let res = server.post_article(Some(&token), json!({ "title": "Hi!!", "content": "1234567890" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["errors"]["category_id"][0], json!("category_id is required."));

    let res = server.post_article(Some(&token), article_body(category + 100)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_author_moderator_or_staff_may_edit() {
    let server = TestServer::spawn(None).await;
    let category = server.seed_category("Anime").await;
    server.seed_user("author@example.com", true, false, &[]).await;
    server.seed_user("other@example.com", true, false, &[]).await;
    server.seed_user("mod@example.com", true, false, &[MODERATORS_GROUP]).await;
    server.seed_user("staff@example.com", true, true, &[]).await;

    let author = server.login("author@example.com").await;
    let created: Value = server
        .post_article(Some(&author), article_body(category))
        .await
        .json()
        .await
        .unwrap();
    let id = created["results"]["id"].as_i64().unwrap();
    let url = server.url(&format!("/articles/{id}/"));

    let other = server.login("other@example.com").await;
    for res in [
        server.client.patch(&url).bearer_auth(&other).json(&json!({ "title": "Nope" })).send().await.unwrap(),
        server.client.delete(&url).bearer_auth(&other).send().await.unwrap(),
    ] {
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    for (email, title) in [
        ("author@example.com", "By author"),
        ("mod@example.com", "By moderator"),
        ("staff@example.com", "By staff"),
    ] {
        let token = server.login(email).await;
        let res = server
            .client
            .patch(&url)
            .bearer_auth(&token)
            .json(&json!({ "title": title }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["results"]["title"], json!(title));
        assert_eq!(body["results"]["content"], json!("1234567890"));
    }

    let res = server
        .client
        .put(&url)
        .bearer_auth(&author)
        .json(&json!({ "title": "Only title" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.client.delete(&url).bearer_auth(&author).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], json!("Article \"By staff\" deleted successfully."));

    let res = server.client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_creates_inactive_account() {
    let server = TestServer::spawn(None).await;

    let mut body = json!({
        "email": "New@Example.com",
        "first_name": "New",
        "last_name": "Person",
        "password": PASSWORD,
        "password_confirm": "Different123!",
    });
    let res = server.client.post(server.url("/auth/register/")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    body["password_confirm"] = json!(PASSWORD);
    body["is_active"] = json!(true);
    body["is_staff"] = json!(true);
    let res = server.client.post(server.url("/auth/register/")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["user"]["email"], json!("new@example.com"));
    assert_eq!(created["user"]["is_active"], json!(false));
    assert_eq!(created["user"]["is_staff"], json!(false));

    let res = server.client.post(server.url("/auth/register/")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/auth/login/"))
        .json(&json!({ "email": "new@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert!(err["message"].as_str().unwrap().contains("inactive"));

    // Inactivity wins over a wrong password.
    let res = server
        .client
        .post(server.url("/auth/login/"))
        .json(&json!({ "email": "new@example.com", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert!(err["message"].as_str().unwrap().contains("inactive"));
}

#[tokio::test]
async fn token_lifecycle() {
    let server = TestServer::spawn(None).await;
    server.seed_user("reader@example.com", true, false, &[]).await;

    let res = server
        .client
        .post(server.url("/auth/login/"))
        .json(&json!({ "email": "reader@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let login: Value = server
        .client
        .post(server.url("/auth/login/"))
        .json(&json!({ "email": "reader@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let access = login["access"].as_str().unwrap();
    let refresh = login["refresh"].as_str().unwrap();
    assert_eq!(login["user"]["email"], json!("reader@example.com"));

    let me: Value = server
        .client
        .get(server.url("/auth/me/"))
        .bearer_auth(access)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["user"]["is_active"], json!(true));

    // A refresh token is not an access token.
    let res = server.client.get(server.url("/auth/me/")).bearer_auth(refresh).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/auth/token/refresh/"))
        .json(&json!({ "refresh": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let logout = |token: &str| {
        server
            .client
            .post(server.url("/auth/logout/"))
            .bearer_auth(access)
            .json(&json!({ "refresh": token }))
            .send()
    };
    assert_eq!(logout(refresh).await.unwrap().status(), StatusCode::OK);
    assert_eq!(logout(refresh).await.unwrap().status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/auth/token/refresh/"))
        .json(&json!({ "refresh": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn referenced_category_cannot_be_deleted() {
    let server = TestServer::spawn(None).await;
    let category = server.seed_category("Anime").await;
    server.seed_user("staff@example.com", true, true, &[]).await;
    let staff = server.login("staff@example.com").await;

    server.post_article(Some(&staff), article_body(category)).await;

    let res = server
        .client
        .delete(server.url(&format!("/admin/categories/{category}/")))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("Anime"));
    assert!(server.stores.categories.get_category(category.to_string().parse().unwrap()).await.unwrap().is_some());
}

#[tokio::test]
async fn user_administration_is_staff_only() {
    let server = TestServer::spawn(None).await;
    let pending = server.seed_user("pending@example.com", false, false, &[]).await;
    server.seed_user("reader@example.com", true, false, &[]).await;
    server.seed_user("staff@example.com", true, true, &[]).await;

    let reader = server.login("reader@example.com").await;
    let res = server.client.get(server.url("/users/")).bearer_auth(&reader).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let staff = server.login("staff@example.com").await;
    let list: Value = server
        .client
        .get(server.url("/users/"))
        .bearer_auth(&staff)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], json!(3));

    let res = server
        .client
        .patch(server.url(&format!("/users/{}/", pending.id)))
        .bearer_auth(&staff)
        .json(&json!({ "is_active": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    server.login("pending@example.com").await;

    let res = server.client.get(server.url("/users/999/")).bearer_auth(&staff).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "results": "No user found." }));
}

#[tokio::test]
async fn reviews_with_and_without_a_model() {
    let with_model = TestServer::spawn(Some(Arc::new(Fixed(4)))).await;
    let review = json!({
        "first_name": "Jo",
        "last_name": "Doe",
        "email": "jo@example.com",
        "message": "Great service, thanks!",
        "predicted_satisfaction": 1,
    });

    let res = with_model.client.post(with_model.url("/review/")).json(&review).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], json!("Review saved successfully."));
    assert_eq!(body["results"]["predicted_satisfaction"], json!(4));

    let res = with_model
        .client
        .post(with_model.url("/predict/"))
        .json(&json!({ "features": "love it" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "prediction": 4 }));

    let res = with_model.client.post(with_model.url("/predict/")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.json::<Value>().await.unwrap()["error"].is_string());

    let without = TestServer::spawn(None).await;
    let res = without.client.post(without.url("/review/")).json(&review).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert!(body["results"]["predicted_satisfaction"].is_null());

    let res = without
        .client
        .post(without.url("/predict/"))
        .json(&json!({ "features": "love it" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = without.client.get(without.url("/review/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
