// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::models::{Capability, Role};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    /// Fail with 403 unless the role holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.grants(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with 403 unless this is `owner_id` or an admin.
    pub fn require_owner_or_admin(&self, owner_id: &str) -> Result<(), AppError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only modify your own resources".to_string(),
            ))
        }
    }
}

/// Token from an `Authorization: Bearer ...` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Identity behind a valid access token in `headers`, without failing.
pub fn try_identify(state: &AppState, headers: &HeaderMap) -> Option<AuthUser> {
    let token = bearer_token(headers)?;
    let claims = state.tokens.verify_access(token).ok()?;
    Some(AuthUser {
        user_id: claims.sub,
        role: claims.role,
    })
}

/// Middleware that requires valid JWT authentication.
///
/// Refresh tokens are rejected here; only access tokens authenticate requests.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;
    let claims = state.tokens.verify_access(token)?;

    let auth_user = AuthUser {
        user_id: claims.sub,
        role: claims.role,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware that admits only admins. Must run after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::Unauthorized)?;
    auth_user.require(Capability::ManageUsers)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_owner_or_admin() {
        let owner = AuthUser {
            user_id: "u1".to_string(),
            role: Role::Business,
        };
        let admin = AuthUser {
            user_id: "root".to_string(),
            role: Role::Admin,
        };
        assert!(owner.require_owner_or_admin("u1").is_ok());
        assert!(owner.require_owner_or_admin("u2").is_err());
        assert!(admin.require_owner_or_admin("u2").is_ok());
        assert!(owner.require(Capability::PostDonations).is_ok());
        assert!(matches!(
            owner.require(Capability::ManageUsers),
            Err(AppError::Forbidden(_))
        ));
    }
}
