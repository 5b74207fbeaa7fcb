// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FoodSave: connects businesses holding surplus food with food banks and
//! the volunteers who carry it.
//!
//! This crate provides the backend API (accounts, sessions, rate limiting,
//! donations) and a client library that keeps a signed-in session alive
//! against it.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use services::{AuthService, Mailer, RateLimiter, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub mailer: Arc<Mailer>,
    pub tokens: Arc<TokenService>,
    pub auth: AuthService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wire the services together around an open database.
    pub fn new(config: Config, db: Db, mailer: Mailer) -> Self {
        let mailer = Arc::new(mailer);
        let tokens = Arc::new(TokenService::new(&config));
        let auth = AuthService::new(db.clone(), tokens.clone(), mailer.clone());
        Self {
            config,
            db,
            mailer,
            tokens,
            auth,
            rate_limiter: RateLimiter::new(),
        }
    }
}
