// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation listing routes.

use crate::db::DonationFilter;
use crate::error::{AppError, FieldError, Result};
use crate::middleware::{auth::AuthUser, rate_limit};
use crate::models::{
    Capability, Donation, DonationStatus, FoodType, QuantityUnit, StorageRequirement,
};
use crate::routes::{ApiResponse, Page, MAX_PER_PAGE};
use crate::services::auth::validate_all;
use crate::services::RateLimitPolicy;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidateUrl};

/// Most images a single donation may carry.
const MAX_IMAGES: usize = 10;

pub fn public_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/donations",
            get(list_donations).layer(middleware::from_fn_with_state(
                (state.clone(), RateLimitPolicy::SEARCH),
                rate_limit,
            )),
        )
        .route("/api/donations/{id}", get(get_donation))
}

/// Auth middleware is applied in routes/mod.rs.
pub fn protected_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/donations",
            post(create_donation).layer(middleware::from_fn_with_state(
                (state.clone(), RateLimitPolicy::DONATION),
                rate_limit,
            )),
        )
        .route(
            "/api/donations/{id}",
            put(update_donation).delete(delete_donation),
        )
        .route(
            "/api/donations/{id}/images",
            post(add_images).layer(middleware::from_fn_with_state(
                (state.clone(), RateLimitPolicy::UPLOAD),
                rate_limit,
            )),
        )
}

// ─── Queries ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationQuery {
    status: Option<DonationStatus>,
    food_type: Option<FoodType>,
    business_id: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

async fn list_donations(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<DonationQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<Donation>>>> {
    let Query(params) = params?;
    crate::routes::ListParams {
        page: params.page,
        per_page: params.per_page,
    }
    .check()?;

    tracing::debug!(
        status = ?params.status,
        food_type = ?params.food_type,
        page = params.page,
        per_page = params.per_page,
        "Listing donations"
    );

    let donations = state
        .db
        .list_donations(DonationFilter {
            status: params.status,
            food_type: params.food_type,
            business_id: params.business_id,
        })
        .await?;

    Ok(ApiResponse::data(Page::slice(
        donations,
        params.page,
        params.per_page.min(MAX_PER_PAGE),
    )))
}

async fn get_donation(
    State(state): State<Arc<AppState>>,
    Path(donation_id): Path<String>,
) -> Result<Json<ApiResponse<Donation>>> {
    let donation = load(&state, &donation_id).await?;
    Ok(ApiResponse::data(donation))
}

async fn load(state: &AppState, donation_id: &str) -> Result<Donation> {
    state
        .db
        .get_donation(donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donation {} not found", donation_id)))
}

// ─── Mutations ───────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub food_type: FoodType,
    #[serde(default)]
    pub food_categories: Vec<String>,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: u32,
    #[serde(default)]
    pub unit: QuantityUnit,
    pub expiry_time: DateTime<Utc>,
    pub pickup_start_time: DateTime<Utc>,
    pub pickup_end_time: DateTime<Utc>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub storage_requirements: StorageRequirement,
    #[serde(default)]
    pub transportation_required: bool,
    #[validate(length(max = 1000))]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub is_halal: bool,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
}

/// Time-ordering rules shared by create and update.
fn schedule_problems(
    expiry: DateTime<Utc>,
    pickup_start: DateTime<Utc>,
    pickup_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<FieldError> {
    let mut problems = Vec::new();
    if pickup_start >= pickup_end {
        problems.push(FieldError::new(
            "pickupEndTime",
            "Pickup end must be after pickup start",
        ));
    }
    if expiry <= now {
        problems.push(FieldError::new(
            "expiryTime",
            "Expiry time must be in the future",
        ));
    }
    problems
}

async fn create_donation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateDonationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Donation>>> {
    user.require(Capability::PostDonations)?;
    let Json(request) = payload?;

    let now = Utc::now();
    validate_all(
        &request,
        schedule_problems(
            request.expiry_time,
            request.pickup_start_time,
            request.pickup_end_time,
            now,
        ),
    )?;

    let donation = Donation {
        id: state.tokens.new_id()?,
        business_id: user.user_id.clone(),
        title: request.title.trim().to_string(),
        description: request.description,
        food_type: request.food_type,
        food_categories: request.food_categories,
        quantity: request.quantity,
        unit: request.unit,
        expiry_time: request.expiry_time,
        pickup_start_time: request.pickup_start_time,
        pickup_end_time: request.pickup_end_time,
        status: DonationStatus::Available,
        images: Vec::new(),
        allergens: request.allergens,
        storage_requirements: request.storage_requirements,
        transportation_required: request.transportation_required,
        special_instructions: request.special_instructions,
        is_halal: request.is_halal,
        is_vegetarian: request.is_vegetarian,
        is_vegan: request.is_vegan,
        matched_food_bank_id: None,
        created_at: now,
        updated_at: now,
    };
    state.db.create_donation(&donation).await?;

    // Profile counter is informational; the donation already exists
    if let Ok(Some(mut business)) = state.db.get_business(&user.user_id).await {
        business.total_donations += 1;
        business.updated_at = now;
        if let Err(e) = state.db.upsert_business(&business).await {
            tracing::warn!(user_id = %user.user_id, error = %e, "Failed to bump donation count");
        }
    }

    tracing::info!(donation_id = %donation.id, business_id = %donation.business_id, "Donation created");
    Ok(ApiResponse::with_message("Donation created", donation))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDonationRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub food_type: Option<FoodType>,
    pub food_categories: Option<Vec<String>>,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: Option<u32>,
    pub unit: Option<QuantityUnit>,
    pub expiry_time: Option<DateTime<Utc>>,
    pub pickup_start_time: Option<DateTime<Utc>>,
    pub pickup_end_time: Option<DateTime<Utc>>,
    pub allergens: Option<Vec<String>>,
    pub storage_requirements: Option<StorageRequirement>,
    pub transportation_required: Option<bool>,
    #[validate(length(max = 1000))]
    pub special_instructions: Option<String>,
    pub is_halal: Option<bool>,
    pub is_vegetarian: Option<bool>,
    pub is_vegan: Option<bool>,
}

async fn update_donation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(donation_id): Path<String>,
    payload: std::result::Result<Json<UpdateDonationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Donation>>> {
    let Json(request) = payload?;
    let mut donation = load(&state, &donation_id).await?;
    user.require_owner_or_admin(&donation.business_id)?;

    if donation.status != DonationStatus::Available {
        return Err(AppError::Conflict(format!(
            "Donation is {} and can no longer be edited",
            donation.status.as_str()
        )));
    }

    let now = Utc::now();
    let expiry = request.expiry_time.unwrap_or(donation.expiry_time);
    let pickup_start = request.pickup_start_time.unwrap_or(donation.pickup_start_time);
    let pickup_end = request.pickup_end_time.unwrap_or(donation.pickup_end_time);
    validate_all(
        &request,
        schedule_problems(expiry, pickup_start, pickup_end, now),
    )?;

    if let Some(title) = request.title {
        donation.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        donation.description = Some(description);
    }
    if let Some(food_type) = request.food_type {
        donation.food_type = food_type;
    }
    if let Some(food_categories) = request.food_categories {
        donation.food_categories = food_categories;
    }
    if let Some(quantity) = request.quantity {
        donation.quantity = quantity;
    }
    if let Some(unit) = request.unit {
        donation.unit = unit;
    }
    if let Some(allergens) = request.allergens {
        donation.allergens = allergens;
    }
    if let Some(storage) = request.storage_requirements {
        donation.storage_requirements = storage;
    }
    if let Some(transport) = request.transportation_required {
        donation.transportation_required = transport;
    }
    if let Some(instructions) = request.special_instructions {
        donation.special_instructions = Some(instructions);
    }
    if let Some(is_halal) = request.is_halal {
        donation.is_halal = is_halal;
    }
    if let Some(is_vegetarian) = request.is_vegetarian {
        donation.is_vegetarian = is_vegetarian;
    }
    if let Some(is_vegan) = request.is_vegan {
        donation.is_vegan = is_vegan;
    }
    donation.expiry_time = expiry;
    donation.pickup_start_time = pickup_start;
    donation.pickup_end_time = pickup_end;
    donation.updated_at = now;

    state.db.update_donation(&donation).await?;
    Ok(ApiResponse::with_message("Donation updated", donation))
}

async fn delete_donation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(donation_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    let donation = load(&state, &donation_id).await?;
    user.require_owner_or_admin(&donation.business_id)?;

    state.db.delete_donation(&donation.id).await?;
    tracing::info!(donation_id = %donation.id, user_id = %user.user_id, "Donation deleted");
    Ok(ApiResponse::message("Donation deleted"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddImagesRequest {
    pub urls: Vec<String>,
}

/// Attach already-uploaded image URLs to a donation.
async fn add_images(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(donation_id): Path<String>,
    payload: std::result::Result<Json<AddImagesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Donation>>> {
    let Json(request) = payload?;
    let mut donation = load(&state, &donation_id).await?;
    if donation.business_id != user.user_id {
        return Err(AppError::Forbidden(
            "Only the donating business can add images".to_string(),
        ));
    }

    if request.urls.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "urls",
            "At least one image URL is required",
        )]));
    }
    let invalid: Vec<FieldError> = request
        .urls
        .iter()
        .enumerate()
        .filter(|(_, url)| !url.validate_url())
        .map(|(i, _)| FieldError::new(format!("urls[{}]", i), "Must be a valid URL"))
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::Validation(invalid));
    }
    if donation.images.len() + request.urls.len() > MAX_IMAGES {
        return Err(AppError::BadRequest(format!(
            "A donation can have at most {} images",
            MAX_IMAGES
        )));
    }

    donation.images.extend(request.urls);
    donation.updated_at = Utc::now();
    state.db.update_donation(&donation).await?;
    Ok(ApiResponse::with_message("Images added", donation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_schedule_problems() {
        let now = Utc::now();
        let ok = schedule_problems(
            now + Duration::hours(5),
            now + Duration::hours(1),
            now + Duration::hours(2),
            now,
        );
        assert!(ok.is_empty());

        let bad = schedule_problems(
            now - Duration::hours(1),
            now + Duration::hours(2),
            now + Duration::hours(1),
            now,
        );
        let fields: Vec<&str> = bad.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["pickupEndTime", "expiryTime"]);
    }
}
