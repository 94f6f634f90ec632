#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    test,
};
use inkpost_server::{AppState, InMemoryStore, Settings};
use serde_json::{json, Value};

pub fn test_state() -> AppState {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = InMemoryStore::new();
    AppState::with_stores(config, Arc::new(store.clone()), Arc::new(store))
        .expect("Failed to build test state")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Registers an account and logs it in, returning the issued token.
pub async fn signup<S, B>(app: &S, username: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let email = format!("{}@example.com", username);

    let resp = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": username, "email": email, "password": "password123" }))
        .send_request(app)
        .await;
    assert_eq!(resp.status(), 201, "register {}", username);

    let resp = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "password123" }))
        .send_request(app)
        .await;
    assert_eq!(resp.status(), 200, "login {}", username);

    let body: Value = test::read_body_json(resp).await;
    body["data"]["token"].as_str().expect("token in login response").to_owned()
}

/// Creates a post as the token's owner and returns its id.
pub async fn create_post<S, B>(app: &S, token: &str, title: &str, content: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::TestRequest::post()
        .uri("/api/blogs")
        .insert_header(bearer(token))
        .set_json(json!({ "title": title, "content": content }))
        .send_request(app)
        .await;
    assert_eq!(resp.status(), 201, "create post");

    let body: Value = test::read_body_json(resp).await;
    body["data"]["id"].as_str().expect("post id").to_owned()
}
