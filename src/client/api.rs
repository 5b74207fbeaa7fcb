// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the FoodSave API with session-aware retry.
//!
//! Handles:
//! - Bearer token injection from the [`SessionStore`]
//! - One refresh-and-retry when a request comes back 401
//! - Clearing the session when the retry is rejected too
//! - [`Notice`]s for failures the UI should surface

use super::session::SessionStore;
use super::{ClientError, Notice, UNREACHABLE_MESSAGE};
use crate::error::FieldError;
use crate::models::UserResponse;
use crate::services::auth::{
    AccessTokenPayload, AuthPayload, LoginRequest, RefreshRequest, RegisterRequest,
    UpdateProfileRequest,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const NOTICE_CAPACITY: usize = 16;
const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong while processing the request.";

/// Success body: `{success, message?, data?}`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Failure body: `{success, error, message, errors?}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    user: UserResponse,
}

/// API client bound to one [`SessionStore`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    /// Serializes actions so refresh-then-retry never interleaves
    actions: Mutex<()>,
    notices: broadcast::Sender<Notice>,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            actions: Mutex::new(()),
            notices,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Receive notices emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    // ─── Session actions ─────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<UserResponse, ClientError> {
        let _guard = self.actions.lock().await;
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.sign_in("/api/auth/login", &body).await
    }

    pub async fn register(&self, registration: &RegisterRequest) -> Result<UserResponse, ClientError> {
        let _guard = self.actions.lock().await;
        self.sign_in("/api/auth/register", registration).await
    }

    /// Forget the session locally. Tokens are stateless, so the server is not told.
    pub async fn logout(&self) {
        let _guard = self.actions.lock().await;
        self.session.clear();
    }

    /// Save profile changes on the server and adopt the returned profile.
    pub async fn update_user(&self, changes: &UpdateProfileRequest) -> Result<UserResponse, ClientError> {
        let _guard = self.actions.lock().await;
        self.session.set_loading(true);
        let result = self
            .call::<_, CurrentUser>(Method::PUT, "/api/auth/update-profile", Some(changes))
            .await
            .and_then(|envelope| envelope.data.ok_or_else(|| missing_data(StatusCode::OK)));
        self.session.set_loading(false);

        match result {
            Ok(current) => {
                self.session.set_user(current.user.clone());
                Ok(current.user)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Exchange the refresh token for a new access token. Any failure signs out.
    pub async fn refresh_access_token(&self) -> Result<String, ClientError> {
        let _guard = self.actions.lock().await;
        self.refresh().await
    }

    /// Confirm the stored session with the server.
    ///
    /// A 401 gets one refresh attempt; if that fails the session is marked
    /// unauthenticated. Returns whether the session is live.
    pub async fn check_auth(&self) -> Result<bool, ClientError> {
        let _guard = self.actions.lock().await;
        let Some(token) = self.session.access_token() else {
            self.session.set_unauthenticated();
            return Ok(false);
        };

        self.session.set_loading(true);
        let response = match self
            .send::<()>(Method::GET, "/api/auth/me", None, Some(&token))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.session.set_loading(false);
                return Err(self.report(e));
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            let refreshed = self.refresh().await.is_ok();
            if refreshed {
                self.session.set_loading(false);
            } else {
                self.session.set_unauthenticated();
            }
            return Ok(refreshed);
        }

        let status = response.status();
        let result = into_envelope::<CurrentUser>(response)
            .await
            .and_then(|envelope| envelope.data.ok_or_else(|| missing_data(status)));
        self.session.set_loading(false);
        match result {
            Ok(current) => {
                self.session.set_user(current.user);
                Ok(true)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    // ─── Requests ────────────────────────────────────────────

    /// Send an authenticated request through the refresh-and-retry interceptor.
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiEnvelope<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _guard = self.actions.lock().await;
        self.call(method, path, body).await.map_err(|e| self.report(e))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>, ClientError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiEnvelope<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.session.access_token();
        let response = self
            .send(method.clone(), path, body, token.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return into_envelope(response).await;
        }

        let fresh = self
            .refresh()
            .await
            .map_err(|_| ClientError::SessionExpired)?;

        // The retried request is never retried again
        let retried = self.send(method, path, body, Some(&fresh)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(path, "Request rejected after token refresh, signing out");
            self.session.clear();
            return Err(ClientError::SessionExpired);
        }
        into_envelope(retried).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Caller must hold the action lock.
    async fn sign_in<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<UserResponse, ClientError> {
        self.session.set_loading(true);
        let result = match self.send(Method::POST, path, Some(body), None).await {
            Ok(response) => {
                let status = response.status();
                into_envelope::<AuthPayload>(response)
                    .await
                    .and_then(|envelope| envelope.data.ok_or_else(|| missing_data(status)))
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => {
                self.session.sign_in(
                    payload.user.clone(),
                    payload.access_token,
                    payload.refresh_token,
                );
                Ok(payload.user)
            }
            Err(e) => {
                self.session.set_loading(false);
                Err(self.report(e))
            }
        }
    }

    /// Caller must hold the action lock.
    async fn refresh(&self) -> Result<String, ClientError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            self.session.clear();
            return Err(ClientError::SessionExpired);
        };

        let body = RefreshRequest { refresh_token };
        let result = match self
            .send(Method::POST, "/api/auth/refresh", Some(&body), None)
            .await
        {
            Ok(response) => {
                let status = response.status();
                into_envelope::<AccessTokenPayload>(response)
                    .await
                    .and_then(|envelope| envelope.data.ok_or_else(|| missing_data(status)))
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => {
                self.session.set_access_token(payload.access_token.clone());
                Ok(payload.access_token)
            }
            Err(e) => {
                tracing::info!(error = %e, "Token refresh failed, signing out");
                self.session.clear();
                Err(e)
            }
        }
    }

    /// Emit the notice for `error` and hand it back.
    fn report(&self, error: ClientError) -> ClientError {
        let notice = match &error {
            ClientError::SessionExpired => Some(Notice::SessionExpired),
            ClientError::Network(_) => Some(Notice::Error(UNREACHABLE_MESSAGE.to_string())),
            // Field errors belong to the form that sent them
            ClientError::Http { status, .. } if *status == StatusCode::BAD_REQUEST => None,
            ClientError::Http { message, .. } => Some(Notice::Error(message.clone())),
            ClientError::Storage(message) => Some(Notice::Error(message.clone())),
        };
        if let Some(notice) = notice {
            // No subscribers is fine
            let _ = self.notices.send(notice);
        }
        error
    }
}

async fn into_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiEnvelope<T>, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let (message, errors) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => (
            parsed
                .message
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
            parsed.errors,
        ),
        Err(_) => (FALLBACK_ERROR_MESSAGE.to_string(), Vec::new()),
    };
    Err(ClientError::Http {
        status,
        message,
        errors,
    })
}

fn missing_data(status: StatusCode) -> ClientError {
    ClientError::Http {
        status,
        message: "Response carried no data".to_string(),
        errors: Vec::new(),
    }
}
