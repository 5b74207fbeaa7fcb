// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business and food bank profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::profile::{BusinessType, OrganizationType};
use crate::models::{Business, Capability, FoodBank};
use crate::routes::ApiResponse;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/businesses", get(list_businesses))
        .route("/api/businesses/{id}", get(get_business))
        .route("/api/food-banks", get(list_food_banks))
        .route("/api/food-banks/{id}", get(get_food_bank))
}

/// Auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/businesses/me", put(upsert_business))
        .route("/api/food-banks/me", put(upsert_food_bank))
}

// ─── Businesses ──────────────────────────────────────────────

async fn list_businesses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Business>>>> {
    Ok(ApiResponse::data(state.db.list_businesses().await?))
}

async fn get_business(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Business>>> {
    let business = state
        .db
        .get_business(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Business {} not found", user_id)))?;
    Ok(ApiResponse::data(business))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Business name is required"))]
    pub business_name: String,
    pub business_type: BusinessType,
    #[validate(length(max = 50))]
    pub business_registration_number: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Address is required"))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 20))]
    pub contact_number: Option<String>,
}

/// Create or replace the caller's business profile. Counters and verification survive.
async fn upsert_business(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<BusinessProfileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Business>>> {
    user.require(Capability::PostDonations)?;
    let Json(request) = payload?;
    request.validate()?;

    let existing = state.db.get_business(&user.user_id).await?;
    let business = Business {
        user_id: user.user_id.clone(),
        business_name: request.business_name.trim().to_string(),
        business_type: request.business_type,
        business_registration_number: request.business_registration_number,
        description: request.description,
        address: request.address.trim().to_string(),
        latitude: request.latitude,
        longitude: request.longitude,
        contact_number: request.contact_number,
        total_donations: existing.as_ref().map_or(0, |b| b.total_donations),
        is_verified: existing.as_ref().is_some_and(|b| b.is_verified),
        updated_at: Utc::now(),
    };
    state.db.upsert_business(&business).await?;

    tracing::info!(user_id = %user.user_id, created = existing.is_none(), "Business profile saved");
    Ok(ApiResponse::with_message("Business profile saved", business))
}

// ─── Food banks ──────────────────────────────────────────────

async fn list_food_banks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FoodBank>>>> {
    Ok(ApiResponse::data(state.db.list_food_banks().await?))
}

async fn get_food_bank(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<FoodBank>>> {
    let food_bank = state
        .db
        .get_food_bank(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Food bank {} not found", user_id)))?;
    Ok(ApiResponse::data(food_bank))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FoodBankProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Organization name is required"))]
    pub organization_name: String,
    pub organization_type: OrganizationType,
    #[validate(length(max = 50))]
    pub registration_number: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Address is required"))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 20))]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub current_need: u32,
    #[serde(default)]
    pub beneficiary_count: u32,
    #[serde(default)]
    pub transportation_available: bool,
}

async fn upsert_food_bank(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<FoodBankProfileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FoodBank>>> {
    user.require(Capability::ReceiveDonations)?;
    let Json(request) = payload?;
    request.validate()?;

    let existing = state.db.get_food_bank(&user.user_id).await?;
    let food_bank = FoodBank {
        user_id: user.user_id.clone(),
        organization_name: request.organization_name.trim().to_string(),
        organization_type: request.organization_type,
        registration_number: request.registration_number,
        description: request.description,
        address: request.address.trim().to_string(),
        latitude: request.latitude,
        longitude: request.longitude,
        contact_number: request.contact_number,
        capacity: request.capacity,
        current_need: request.current_need,
        beneficiary_count: request.beneficiary_count,
        transportation_available: request.transportation_available,
        total_received: existing.as_ref().map_or(0, |f| f.total_received),
        is_verified: existing.as_ref().is_some_and(|f| f.is_verified),
        updated_at: Utc::now(),
    };
    state.db.upsert_food_bank(&food_bank).await?;

    tracing::info!(user_id = %user.user_id, created = existing.is_none(), "Food bank profile saved");
    Ok(ApiResponse::with_message("Food bank profile saved", food_bank))
}
