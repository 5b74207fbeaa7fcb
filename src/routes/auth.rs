// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session routes under `/api/auth`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    middleware,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use std::sync::Arc;

use super::ApiResponse;
use crate::error::Result;
use crate::middleware::{auth::AuthUser, rate_limit};
use crate::models::UserResponse;
use crate::services::auth::{
    AccessTokenPayload, AuthPayload, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
    RefreshRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
};
use crate::services::RateLimitPolicy;
use crate::AppState;

/// Routes reachable without a session. Credential endpoints carry their own limiters.
pub fn public_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/auth/register",
            post(register).layer(middleware::from_fn_with_state(
                (state.clone(), RateLimitPolicy::REGISTER),
                rate_limit,
            )),
        )
        .route(
            "/api/auth/login",
            post(login).layer(middleware::from_fn_with_state(
                (state.clone(), RateLimitPolicy::LOGIN),
                rate_limit,
            )),
        )
        .route("/api/auth/refresh", post(refresh))
        .route(
            "/api/auth/forgot-password",
            post(forgot_password).layer(middleware::from_fn_with_state(
                (state.clone(), RateLimitPolicy::PASSWORD_RESET),
                rate_limit,
            )),
        )
        .route("/api/auth/reset-password/{token}", post(reset_password))
        .route("/api/auth/verify-email/{token}", get(verify_email))
}

/// Routes requiring a session (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/update-profile", put(update_profile))
        .route("/api/auth/change-password", put(change_password))
        .route("/api/auth/delete-account", delete(delete_account))
}

// ─── Sessions ────────────────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthPayload>>> {
    let Json(request) = payload?;
    let session = state.auth.register(request).await?;
    Ok(ApiResponse::with_message(
        "Registration successful. Please check your email to verify your account.",
        session,
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthPayload>>> {
    let Json(request) = payload?;
    let session = state.auth.login(request).await?;
    Ok(ApiResponse::with_message("Login successful", session))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AccessTokenPayload>>> {
    let Json(request) = payload?;
    let token = state.auth.refresh(&request.refresh_token).await?;
    Ok(ApiResponse::data(token))
}

/// Tokens are stateless; the client discards them.
async fn logout(Extension(user): Extension<AuthUser>) -> Json<ApiResponse<()>> {
    tracing::info!(user_id = %user.user_id, "User logged out");
    ApiResponse::message("Logged out")
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct UserEnvelope {
    user: UserResponse,
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserEnvelope>>> {
    let current = state.auth.current_user(&user.user_id).await?;
    Ok(ApiResponse::data(UserEnvelope {
        user: UserResponse::from(&current),
    }))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserEnvelope>>> {
    let Json(request) = payload?;
    let updated = state.auth.update_profile(&user.user_id, request).await?;
    Ok(ApiResponse::with_message(
        "Profile updated",
        UserEnvelope { user: updated },
    ))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let Json(request) = payload?;
    state.auth.change_password(&user.user_id, request).await?;
    Ok(ApiResponse::message("Password changed"))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<()>>> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");
    state.auth.delete_account(&user.user_id).await?;
    Ok(ApiResponse::message("Account deleted"))
}

// ─── Email links ─────────────────────────────────────────────

/// Always succeeds so the response does not reveal whether the email is registered.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let Json(request) = payload?;
    state.auth.forgot_password(request).await?;
    Ok(ApiResponse::message(
        "If that email is registered, a password reset link has been sent",
    ))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let Json(request) = payload?;
    state.auth.reset_password(&token, request).await?;
    Ok(ApiResponse::message("Password has been reset"))
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.auth.verify_email(&token).await?;
    Ok(ApiResponse::message("Email verified"))
}
