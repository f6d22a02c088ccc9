use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use moviedb_api::{
    api::{create_router, AppState},
    config::AdminBootstrap,
    services::users,
};

const SECRET: &str = "integration-test-secret";
const BCRYPT_COST: u32 = 4;

struct TestApp {
    server: TestServer,
    state: AppState,
}

fn create_test_app() -> TestApp {
    let state = AppState::in_memory(SECRET, BCRYPT_COST);
    let app = create_router(state.clone());
    TestApp {
        server: TestServer::new(app).unwrap(),
        state,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

impl TestApp {
    async fn register(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "password123"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        let admin = AdminBootstrap {
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            password: "supersecret".to_string(),
        };
        users::ensure_admin_account(&*self.state.store, &admin, BCRYPT_COST)
            .await
            .unwrap();
        let response = self
            .server
            .post("/api/v1/auth/login")
            .json(&json!({ "login": "root", "password": "supersecret" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_movie(&self, admin: &str, title: &str, genres: &[&str]) -> String {
        let response = self
            .server
            .post("/api/v1/movies")
            .add_header(AUTHORIZATION, bearer(admin))
            .json(&json!({ "title": title, "genres": genres }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_str().unwrap().to_string()
    }

    async fn review(&self, token: &str, movie_id: &str, rating: i64) -> axum_test::TestResponse {
        self.server
            .post(&format!("/api/v1/movies/{}/reviews", movie_id))
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({ "rating": rating }))
            .await
    }

    async fn movie(&self, movie_id: &str) -> Value {
        let response = self.server.get(&format!("/api/v1/movies/{}", movie_id)).await;
        response.assert_status_ok();
        response.json()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_assigned() {
    let app = create_test_app();

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc-123"),
        )
        .await;
    assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");

    let response = app.server.get("/api/v1/movies").await;
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = create_test_app();
    let token = app.register("cinephile").await;

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let me: Value = response.json();
    assert_eq!(me["username"], "cinephile");
    assert_eq!(me["role"], "user");
    assert!(me.get("passwordHash").is_none());

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "login": "cinephile@example.com", "password": "password123" }))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "login": "cinephile", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = create_test_app();

    let response = app.server.get("/api/v1/users/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert!(body["error"].is_string());

    let response = app
        .server
        .get("/api/v1/users/me")
        .add_header(AUTHORIZATION, bearer("not-a-jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_username_is_bad_request() {
    let app = create_test_app();
    app.register("cinephile").await;
    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": "Cinephile",
            "email": "other@example.com",
            "password": "password123"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/v1/auth/register")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_admins_manage_movies() {
    let app = create_test_app();
    let token = app.register("cinephile").await;

    let response = app
        .server
        .post("/api/v1/movies")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "title": "Heat" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let admin = app.admin().await;
    let id = app.create_movie(&admin, "Heat", &["crime"]).await;
    let movie = app.movie(&id).await;
    assert_eq!(movie["averageRating"], 0.0);
    assert_eq!(movie["totalRatings"], 0);

    let response = app
        .server
        .delete(&format!("/api/v1/movies/{}", id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
    let response = app.server.get(&format!("/api/v1/movies/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_aggregate_follows_reviews() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Inception", &["sci-fi"]).await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let response = app.review(&alice, &movie_id, 5).await;
    response.assert_status(StatusCode::CREATED);
    let alice_review: Value = response.json();
    let movie = app.movie(&movie_id).await;
    assert_eq!(movie["averageRating"], 5.0);
    assert_eq!(movie["totalRatings"], 1);

    app.review(&bob, &movie_id, 3)
        .await
        .assert_status(StatusCode::CREATED);
    let movie = app.movie(&movie_id).await;
    assert_eq!(movie["averageRating"], 4.0);
    assert_eq!(movie["totalRatings"], 2);

    let response = app
        .server
        .delete(&format!("/api/v1/reviews/{}", alice_review["id"].as_str().unwrap()))
        .add_header(AUTHORIZATION, bearer(&alice))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
    let movie = app.movie(&movie_id).await;
    assert_eq!(movie["averageRating"], 3.0);
    assert_eq!(movie["totalRatings"], 1);
}

#[tokio::test]
async fn test_second_review_of_same_movie_rejected() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Inception", &["sci-fi"]).await;
    let alice = app.register("alice").await;

    app.review(&alice, &movie_id, 4)
        .await
        .assert_status(StatusCode::CREATED);
    app.review(&alice, &movie_id, 1)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .get(&format!("/api/v1/movies/{}/reviews", movie_id))
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["rating"], 4);
    assert_eq!(app.movie(&movie_id).await["averageRating"], 4.0);
}

#[tokio::test]
async fn test_out_of_range_rating_rejected() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Inception", &[]).await;
    let alice = app.register("alice").await;
    app.review(&alice, &movie_id, 6)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_author_or_admin_edits_review() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Inception", &["sci-fi"]).await;
    let alice = app.register("alice").await;
    let mallory = app.register("mallory").await;

    let review: Value = app.review(&alice, &movie_id, 5).await.json();
    let path = format!("/api/v1/reviews/{}", review["id"].as_str().unwrap());

    let response = app
        .server
        .patch(&path)
        .add_header(AUTHORIZATION, bearer(&mallory))
        .json(&json!({ "rating": 1 }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let response = app
        .server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&mallory))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let unchanged: Value = app.server.get(&path).await.json();
    assert_eq!(unchanged["rating"], 5);
    assert_eq!(app.movie(&movie_id).await["averageRating"], 5.0);

    let response = app
        .server
        .patch(&path)
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "rating": 2 }))
        .await;
    response.assert_status_ok();
    assert_eq!(app.movie(&movie_id).await["averageRating"], 2.0);
}

#[tokio::test]
async fn test_wishlist_is_idempotent() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Heat", &["crime"]).await;
    let token = app.register("cinephile").await;
    let path = format!("/api/v1/users/me/wishlist/{}", movie_id);

    for _ in 0..2 {
        let response = app
            .server
            .post(&path)
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status_ok();
        let user: Value = response.json();
        assert_eq!(user["wishlist"].as_array().unwrap().len(), 1);
    }

    let response = app
        .server
        .get("/api/v1/users/me/wishlist")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let movies: Vec<Value> = response.json();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["title"], "Heat");

    for _ in 0..2 {
        let response = app
            .server
            .delete(&path)
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status_ok();
        let user: Value = response.json();
        assert!(user["wishlist"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_recommendations_follow_preferences() {
    let app = create_test_app();
    let admin = app.admin().await;
    let mut action = Vec::new();
    for i in 0..12 {
        action.push(app.create_movie(&admin, &format!("Action {}", i), &["Action"]).await);
    }
    let drama = app.create_movie(&admin, "Drama", &["drama"]).await;
    let token = app.register("cinephile").await;

    let response = app
        .server
        .get("/api/v1/recommendations")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let empty: Vec<Value> = response.json();
    assert!(empty.is_empty());

    let response = app
        .server
        .put("/api/v1/users/me/preferences")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "favoriteGenres": ["action"] }))
        .await;
    response.assert_status_ok();
    app.review(&token, &action[0], 4)
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .get("/api/v1/recommendations")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let recommended: Vec<Value> = response.json();
    assert_eq!(recommended.len(), 10);
    assert!(recommended.iter().all(|m| m["id"] != action[0].as_str()));
    assert!(recommended.iter().all(|m| m["id"] != drama.as_str()));
}

#[tokio::test]
async fn test_movie_listing_is_paged() {
    let app = create_test_app();
    let admin = app.admin().await;
    for title in ["Alien", "Brazil", "Casablanca"] {
        app.create_movie(&admin, title, &["classic"]).await;
    }

    let response = app.server.get("/api/v1/movies?page=2&limit=2").await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["page"], 2);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["total"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["data"][0]["title"], "Casablanca");

    let response = app
        .server
        .get("/api/v1/movies?page=1000000000000000000&limit=20")
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["total"], 3);
    assert!(page["data"].as_array().unwrap().is_empty());

    let response = app.server.get("/api/v1/movies?sort=popularity").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_and_top_rated() {
    let app = create_test_app();
    let admin = app.admin().await;
    let matrix = app.create_movie(&admin, "The Matrix", &["sci-fi"]).await;
    app.create_movie(&admin, "Heat", &["crime"]).await;
    let token = app.register("cinephile").await;
    app.review(&token, &matrix, 5).await;

    let page: Value = app.server.get("/api/v1/search?q=matrix").await.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["id"], matrix.as_str());

    app.server
        .get("/api/v1/search?q=")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let page: Value = app.server.get("/api/v1/movies/top-rated").await.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["id"], matrix.as_str());
}

#[tokio::test]
async fn test_contributed_trivia_is_owned() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Alien", &["horror"]).await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let response = app
        .server
        .post(&format!("/api/v1/movies/{}/trivia", movie_id))
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "text": "The chestburster scene was a surprise to the cast." }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let trivia: Value = response.json();
    let path = format!(
        "/api/v1/movies/{}/trivia/{}",
        movie_id,
        trivia["id"].as_str().unwrap()
    );

    let response = app
        .server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&bob))
        .json(&json!({ "text": "Edited by someone else" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "text": "Edited", "isSpoiler": true }))
        .await;
    response.assert_status_ok();
    let fetched: Value = app.server.get(&path).await.json();
    assert_eq!(fetched["text"], "Edited");
    assert_eq!(fetched["isSpoiler"], true);

    let response = app
        .server
        .post(&format!("/api/v1/movies/{}/cast", movie_id))
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "name": "Sigourney Weaver" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_follow_and_visibility() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Heat", &["crime"]).await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let response = app
        .server
        .post("/api/v1/lists")
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "name": "Heists" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let list: Value = response.json();
    let list_id = list["id"].as_str().unwrap().to_string();

    let movie_path = format!("/api/v1/lists/{}/movies/{}", list_id, movie_id);
    app.server
        .post(&movie_path)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    for _ in 0..2 {
        let updated: Value = app
            .server
            .post(&movie_path)
            .add_header(AUTHORIZATION, bearer(&alice))
            .await
            .json();
        assert_eq!(updated["movies"].as_array().unwrap().len(), 1);
    }

    let follow = format!("/api/v1/lists/{}/follow", list_id);
    let first: Value = app
        .server
        .post(&follow)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .json();
    assert_eq!(first["status"], "added");
    assert_eq!(first["followerCount"], 1);
    let second: Value = app
        .server
        .post(&follow)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .json();
    assert_eq!(second["status"], "removed");
    assert_eq!(second["followerCount"], 0);

    let response = app
        .server
        .patch(&format!("/api/v1/lists/{}", list_id))
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "isPublic": false }))
        .await;
    response.assert_status_ok();

    let list_path = format!("/api/v1/lists/{}", list_id);
    app.server
        .get(&list_path)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&list_path)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .get(&list_path)
        .add_header(AUTHORIZATION, bearer(&alice))
        .await
        .assert_status_ok();

    let public: Value = app.server.get("/api/v1/lists").await.json();
    assert_eq!(public["total"], 0);
}

#[tokio::test]
async fn test_discussion_with_comments() {
    let app = create_test_app();
    let admin = app.admin().await;
    let movie_id = app.create_movie(&admin, "Inception", &["sci-fi"]).await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let response = app
        .server
        .post("/api/v1/discussions")
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({
            "title": "Ending explained",
            "body": "Does the top fall?",
            "movieId": movie_id
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let discussion: Value = response.json();
    let id = discussion["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/api/v1/discussions/{}/comments", id))
        .add_header(AUTHORIZATION, bearer(&bob))
        .json(&json!({ "body": "It wobbles." }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let discussion: Value = response.json();
    let comment_id = discussion["comments"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/api/v1/discussions/{}/comments", id))
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "body": "Exactly.", "parentId": comment_id }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let comment_path = format!("/api/v1/discussions/{}/comments/{}", id, comment_id);
    app.server
        .patch(&comment_path)
        .add_header(AUTHORIZATION, bearer(&alice))
        .json(&json!({ "body": "Hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let response = app
        .server
        .delete(&comment_path)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await;
    response.assert_status_ok();
    let discussion: Value = response.json();
    assert!(discussion["comments"].as_array().unwrap().is_empty());

    let page: Value = app
        .server
        .get(&format!("/api/v1/discussions?movieId={}", movie_id))
        .await
        .json();
    assert_eq!(page["total"], 1);

    app.server
        .patch(&format!("/api/v1/discussions/{}", id))
        .add_header(AUTHORIZATION, bearer(&bob))
        .json(&json!({ "title": "Mine now" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_changes_roles() {
    let app = create_test_app();
    let admin = app.admin().await;
    let token = app.register("cinephile").await;
    let me: Value = app
        .server
        .get("/api/v1/users/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    let role_path = format!("/api/v1/admin/users/{}/role", me["id"].as_str().unwrap());

    app.server
        .put(&role_path)
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "role": "admin" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .put(&role_path)
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "role": "admin" }))
        .await
        .assert_status_ok();

    // The role is reloaded per request, so the same token now passes admin checks
    let page: Value = app
        .server
        .get("/api/v1/admin/users")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(page["total"], 2);
}
