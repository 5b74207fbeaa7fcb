// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod mailer;
pub mod password;
pub mod rate_limit;
pub mod tokens;

pub use auth::AuthService;
pub use mailer::Mailer;
pub use rate_limit::{ClientKey, RateLimitPolicy, RateLimiter};
pub use tokens::{Claims, TokenService, TokenType};
