// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response},
};
use foodsave::config::Config;
use foodsave::db::Db;
use foodsave::models::Role;
use foodsave::routes::create_router;
use foodsave::services::auth::{AuthPayload, RegisterRequest};
use foodsave::services::Mailer;
use foodsave::AppState;
use std::sync::Arc;

pub const TEST_PASSWORD: &str = "Passw0rd!";

/// Create a test app on the in-memory database with a memory mailer.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let mailer = Mailer::memory(&config.mail.from, &config.frontend_url);
    let state = Arc::new(AppState::new(config, Db::in_memory(), mailer));
    (create_router(state.clone()), state)
}

/// Registration body for `name` (`{name}@example.com`, username `name`).
#[allow(dead_code)]
pub fn registration(name: &str, role: Role) -> RegisterRequest {
    RegisterRequest {
        email: format!("{}@example.com", name),
        password: TEST_PASSWORD.to_string(),
        username: name.to_string(),
        full_name: format!("{} Tester", name),
        phone_number: "01012345678".to_string(),
        user_type: Some(role),
    }
}

/// Register directly through the service, skipping the HTTP rate limiters.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, name: &str, role: Role) -> AuthPayload {
    state
        .auth
        .register(registration(name, role))
        .await
        .expect("seed registration")
}

/// Seed an admin. Self-registration cannot pick the role, so promote in storage.
#[allow(dead_code)]
pub async fn seed_admin(state: &AppState, name: &str) -> AuthPayload {
    let payload = seed_user(state, name, Role::Volunteer).await;
    let mut user = state
        .db
        .get_user(&payload.user.id)
        .await
        .unwrap()
        .expect("seeded admin exists");
    user.user_type = Role::Admin;
    state.db.update_user(&user).await.unwrap();

    let pair = state.tokens.issue_pair(&user.id, Role::Admin).unwrap();
    AuthPayload {
        user: foodsave::models::UserResponse::from(&user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }
}

/// JSON request, optionally authenticated, from client address `ip`.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    ip: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
