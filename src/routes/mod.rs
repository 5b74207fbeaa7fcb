// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod donations;
pub mod profiles;
pub mod users;

use crate::middleware::{auth::require_auth, rate_limit};
use crate::services::RateLimitPolicy;
use crate::error::{AppError, Result};
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Success envelope shared by every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}

/// One page of a list, with totals for the client's pager.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
}

impl<T: Serialize> Page<T> {
    /// Slice `all` to the 1-indexed `page`.
    pub fn slice(all: Vec<T>, page: u32, per_page: u32) -> Self {
        let total = all.len();
        let start = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
        let items = all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Self {
            items,
            page,
            per_page,
            total,
        }
    }
}

/// Largest page a list endpoint will return.
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&perPage=` for list endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl ListParams {
    pub fn check(&self) -> Result<()> {
        if self.page < 1 {
            return Err(AppError::BadRequest("page must be >= 1".to_string()));
        }
        if self.per_page < 1 || self.per_page > MAX_PER_PAGE {
            return Err(AppError::BadRequest(format!(
                "perPage must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Credentialed CORS is open to the frontend, plus loopback hosts outside production.
fn is_allowed_origin(origin: &str, frontend_url: &str, production: bool) -> bool {
    if origin == frontend_url {
        return true;
    }
    if production {
        return false;
    }
    let Ok(uri) = origin.parse::<axum::http::Uri>() else {
        return false;
    };
    uri.scheme_str() == Some("http") && matches!(uri.host(), Some("localhost" | "127.0.0.1"))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let production = state.config.environment.is_production();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| is_allowed_origin(origin, &frontend_url, production))
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(auth::public_routes(&state))
        .merge(donations::public_routes(&state))
        .merge(profiles::public_routes());

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(users::routes())
        .merge(donations::protected_routes(&state))
        .merge(profiles::protected_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Everything under /api shares the general limiter
    let api_routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            (state.clone(), RateLimitPolicy::API),
            rate_limit,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_bounds() {
        let ok = ListParams {
            page: 1,
            per_page: MAX_PER_PAGE,
        };
        assert!(ok.check().is_ok());
        assert!(ListParams {
            page: 0,
            per_page: 20
        }
        .check()
        .is_err());
        assert!(ListParams {
            page: 1,
            per_page: MAX_PER_PAGE + 1
        }
        .check()
        .is_err());
    }

    #[test]
    fn test_allowed_origins() {
        let frontend = "https://foodsave.example";
        assert!(is_allowed_origin(frontend, frontend, true));
        assert!(is_allowed_origin("http://localhost:3000", frontend, false));
        assert!(is_allowed_origin("http://127.0.0.1:5173", frontend, false));
        assert!(is_allowed_origin("http://localhost", frontend, false));

        // Lookalike hosts and other schemes
        assert!(!is_allowed_origin("http://localhost.attacker.example", frontend, false));
        assert!(!is_allowed_origin("http://127.0.0.1.attacker.example", frontend, false));
        assert!(!is_allowed_origin("https://localhost:3000", frontend, false));
        assert!(!is_allowed_origin("null", frontend, false));

        // Loopback is a development convenience only
        assert!(!is_allowed_origin("http://localhost:3000", frontend, true));
    }

    #[test]
    fn test_page_slice() {
        let page = Page::slice((1..=45).collect::<Vec<u32>>(), 3, 20);
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(page.total, 45);

        let empty = Page::slice((1..=5).collect::<Vec<u32>>(), 4, 20);
        assert!(empty.items.is_empty());
    }
}
