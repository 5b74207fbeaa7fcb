// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-route rate limiting.
//!
//! Requests carrying a valid access token are counted per user, all others
//! per client IP. Admins are never limited.

use crate::middleware::auth::try_identify;
use crate::models::Capability;
use crate::services::{ClientKey, RateLimitPolicy};
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Client address, honoring `X-Forwarded-For` only behind a trusted proxy.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing one [`RateLimitPolicy`].
///
/// Install with `from_fn_with_state((state, RateLimitPolicy::LOGIN), rate_limit)`.
pub async fn rate_limit(
    State((state, policy)): State<(Arc<AppState>, RateLimitPolicy)>,
    request: Request,
    next: Next,
) -> Result<Response, crate::error::AppError> {
    let identity = try_identify(&state, request.headers());

    let client = match identity {
        Some(user) if user.role.grants(Capability::BypassRateLimits) => {
            return Ok(next.run(request).await);
        }
        Some(user) => ClientKey::User(user.user_id),
        None => {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            ClientKey::Ip(client_ip(
                request.headers(),
                peer,
                state.config.trust_proxy,
            ))
        }
    };

    let hit = state.rate_limiter.hit(&policy, &client)?;
    let response = next.run(request).await;

    if policy.skip_successful && response.status().is_success() {
        state.rate_limiter.undo(&hit);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_sources() {
        let peer: SocketAddr = "10.1.2.3:4567".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.9");
        assert_eq!(client_ip(&headers, Some(peer), false), "10.1.2.3");
        assert_eq!(client_ip(&HeaderMap::new(), None, true), "unknown");
    }
}
