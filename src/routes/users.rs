// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User administration routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::UserResponse;
use crate::routes::{ApiResponse, ListParams, Page};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Auth middleware is applied in routes/mod.rs; admin checks are per method.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/users",
            get(list_users).route_layer(middleware::from_fn(require_admin)),
        )
        .route(
            "/api/users/{id}",
            get(get_user).merge(
                axum::routing::put(update_user)
                    .delete(delete_user)
                    .route_layer(middleware::from_fn(require_admin)),
            ),
        )
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<UserResponse>>>> {
    let Query(params) = params?;
    params.check()?;

    let users: Vec<UserResponse> = state
        .db
        .list_users()
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();
    Ok(ApiResponse::data(Page::slice(
        users,
        params.page,
        params.per_page,
    )))
}

/// Self or admin.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    if auth_user.user_id != user_id && !auth_user.is_admin() {
        return Err(AppError::Forbidden(
            "You can only view your own account".to_string(),
        ));
    }
    let user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
    Ok(ApiResponse::data(UserResponse::from(&user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateRequest {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<AdminUpdateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let Json(request) = payload?;
    let mut user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    if user.id == auth_user.user_id && request.is_active == Some(false) {
        return Err(AppError::BadRequest(
            "Admins cannot deactivate their own account".to_string(),
        ));
    }

    if let Some(is_active) = request.is_active {
        user.is_active = is_active;
    }
    if let Some(is_verified) = request.is_verified {
        user.is_verified = is_verified;
    }
    user.updated_at = chrono::Utc::now();
    state.db.update_user(&user).await?;

    tracing::info!(
        admin_id = %auth_user.user_id,
        user_id = %user.id,
        is_active = user.is_active,
        is_verified = user.is_verified,
        "User updated by admin"
    );
    Ok(ApiResponse::with_message(
        "User updated",
        UserResponse::from(&user),
    ))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    let user = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    state.auth.delete_user_cascade(&user).await?;
    tracing::info!(admin_id = %auth_user.user_id, user_id = %user_id, "User deleted by admin");
    Ok(ApiResponse::message("User deleted"))
}
