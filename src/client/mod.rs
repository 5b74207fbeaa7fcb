// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client library for the FoodSave API.
//!
//! Keeps a signed-in session alive across restarts:
//! - [`SessionStore`] holds the user and tokens, persisted through a [`SessionStorage`]
//! - [`ApiClient`] performs account actions and transparently refreshes an
//!   expired access token once before giving up on a request
//! - [`Notice`]s tell the UI when to show an error or send the user to login

pub mod api;
pub mod session;
pub mod storage;

pub use api::ApiClient;
pub use session::{PersistedSession, SessionState, SessionStore, STORAGE_KEY};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

use crate::error::FieldError;

/// Errors surfaced by [`ApiClient`] and the session store.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{message}")]
    Http {
        status: reqwest::StatusCode,
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Cannot reach the server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// HTTP status of a server-side failure.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Out-of-band events for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The session is gone; show the login view.
    SessionExpired,
    /// A request failed with something the user should see.
    Error(String),
}

/// Shown when a request never got a response.
pub const UNREACHABLE_MESSAGE: &str = "Cannot reach the server. Please check your network.";
