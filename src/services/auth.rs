// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: registration, login, token refresh, profile and
//! password management, email verification and password reset.
//!
//! Passwords are hashed here, before anything reaches the database layer.

use crate::db::Db;
use crate::error::{AppError, FieldError};
use crate::models::{Role, User, UserResponse};
use crate::services::mailer::Mailer;
use crate::services::password::{
    hash_password, password_policy_violations, validate_password_policy, verify_dummy,
    verify_password,
};
use crate::services::tokens::TokenService;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// How long an email verification link stays valid.
const VERIFICATION_TTL_HOURS: i64 = 24;
/// How long a password reset link stays valid.
const RESET_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Please enter your name"))]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub user_type: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your password"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Please enter your name"))]
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(url(message = "Profile image must be a URL"))]
    pub profile_image: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub preferences: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter your current password"))]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Returned by refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenPayload {
    pub access_token: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn username_problems(username: &str) -> Option<FieldError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        None
    } else {
        Some(FieldError::new(
            "username",
            "Username may only contain letters, numbers and underscores",
        ))
    }
}

fn phone_problems(phone: &str) -> Option<FieldError> {
    let len = phone.chars().count();
    if (10..=15).contains(&len) && phone.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(FieldError::new(
            "phoneNumber",
            "Please enter a valid phone number",
        ))
    }
}

/// Run derive validation plus `extra` checks, reporting all of them at once.
pub fn validate_all<T: Validate>(request: &T, mut extra: Vec<FieldError>) -> Result<(), AppError> {
    if let Err(e) = request.validate() {
        if let AppError::Validation(fields) = AppError::from(e) {
            extra.extend(fields);
        }
    }
    if extra.is_empty() {
        Ok(())
    } else {
        extra.sort_by(|a, b| a.field.cmp(&b.field));
        Err(AppError::Validation(extra))
    }
}

pub struct AuthService {
    db: Db,
    tokens: Arc<TokenService>,
    mailer: Arc<Mailer>,
}

impl AuthService {
    pub fn new(db: Db, tokens: Arc<TokenService>, mailer: Arc<Mailer>) -> Self {
        Self { db, tokens, mailer }
    }

    /// Create an account and sign it in.
    pub async fn register(&self, mut request: RegisterRequest) -> Result<AuthPayload, AppError> {
        request.email = normalize_email(&request.email);
        let mut extra = password_policy_violations("password", &request.password);
        extra.extend(username_problems(&request.username));
        extra.extend(phone_problems(&request.phone_number));
        let role = match request.user_type {
            Some(role) if role.is_self_assignable() => Some(role),
            _ => {
                extra.push(FieldError::new("userType", "Please select a valid user type"));
                None
            }
        };
        validate_all(&request, extra)?;
        let role = role.ok_or_else(|| AppError::BadRequest("Invalid user type".to_string()))?;

        // Hash before the record exists anywhere
        let password_hash = hash_password(&request.password).await?;
        let (verification_token, verification_digest) = self.tokens.generate_one_time()?;

        let now = Utc::now();
        let user = User {
            id: self.tokens.new_id()?,
            email: request.email,
            password_hash,
            username: request.username.trim().to_string(),
            full_name: request.full_name.trim().to_string(),
            phone_number: request.phone_number,
            user_type: role,
            is_verified: false,
            is_active: true,
            verification_token_hash: Some(verification_digest),
            verification_expires_at: Some(now + Duration::hours(VERIFICATION_TTL_HOURS)),
            reset_token_hash: None,
            reset_expires_at: None,
            profile_image: None,
            address: None,
            latitude: None,
            longitude: None,
            preferences: serde_json::json!({}),
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        };

        self.db.create_user(&user).await?;
        tracing::info!(user_id = %user.id, role = role.as_str(), "User registered");

        if let Err(e) = self
            .mailer
            .send_verification_email(&user.email, &user.full_name, &verification_token)
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send verification email");
        }

        self.sign_in(&user)
    }

    /// Check credentials and issue a session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, mut request: LoginRequest) -> Result<AuthPayload, AppError> {
        request.email = normalize_email(&request.email);
        validate_all(&request, Vec::new())?;

        let mut user = match self.db.find_user_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                verify_dummy(&request.password).await;
                return Err(AppError::InvalidCredentials);
            }
        };

        if !verify_password(&request.password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        let now = Utc::now();
        user.last_login = Some(now);
        user.updated_at = now;
        self.db.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        self.sign_in(&user)
    }

    fn sign_in(&self, user: &User) -> Result<AuthPayload, AppError> {
        let pair = self.tokens.issue_pair(&user.id, user.user_type)?;
        Ok(AuthPayload {
            user: UserResponse::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Fails closed: any problem with the token or the account is `InvalidToken`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokenPayload, AppError> {
        if refresh_token.is_empty() {
            return Err(AppError::InvalidToken);
        }
        let claims = self.tokens.verify_refresh(refresh_token)?;

        let user = match self.db.get_user(&claims.sub).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::info!(user_id = %claims.sub, "Refresh for missing or inactive user");
                return Err(AppError::InvalidToken);
            }
        };

        Ok(AccessTokenPayload {
            access_token: self.tokens.issue_access(&user.id, user.user_type)?,
        })
    }

    /// Load the signed-in user, treating a vanished or disabled account as signed out.
    pub async fn current_user(&self, user_id: &str) -> Result<User, AppError> {
        match self.db.get_user(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized),
        }
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, AppError> {
        let extra = request
            .phone_number
            .as_deref()
            .and_then(phone_problems)
            .into_iter()
            .collect();
        validate_all(&request, extra)?;

        let mut user = self.current_user(user_id).await?;
        if let Some(full_name) = request.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(phone_number) = request.phone_number {
            user.phone_number = phone_number;
        }
        if let Some(address) = request.address {
            user.address = Some(address);
        }
        if let Some(profile_image) = request.profile_image {
            user.profile_image = Some(profile_image);
        }
        if let Some(latitude) = request.latitude {
            user.latitude = Some(latitude);
        }
        if let Some(longitude) = request.longitude {
            user.longitude = Some(longitude);
        }
        if let Some(preferences) = request.preferences {
            user.preferences = preferences;
        }
        user.updated_at = Utc::now();

        self.db.update_user(&user).await?;
        Ok(UserResponse::from(&user))
    }

    /// Replace the password after checking the current one.
    ///
    /// A wrong current password is a 400, not a 401, so the client keeps its session.
    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        validate_all(
            &request,
            password_policy_violations("newPassword", &request.new_password),
        )?;

        let mut user = self.current_user(user_id).await?;
        if !verify_password(&request.current_password, &user.password_hash).await? {
            return Err(AppError::Validation(vec![FieldError::new(
                "currentPassword",
                "Current password is incorrect",
            )]));
        }

        user.password_hash = hash_password(&request.new_password).await?;
        user.reset_token_hash = None;
        user.reset_expires_at = None;
        user.updated_at = Utc::now();
        self.db.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Remove an account along with its profile and, for businesses, its donations.
    pub async fn delete_account(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.current_user(user_id).await?;
        self.delete_user_cascade(&user).await
    }

    pub async fn delete_user_cascade(&self, user: &User) -> Result<(), AppError> {
        if user.user_type == Role::Business {
            let deleted = self.db.delete_donations_for_business(&user.id).await?;
            tracing::info!(user_id = %user.id, deleted, "Deleted donations for removed business");
        }
        self.db.delete_profiles(&user.id).await?;
        self.db.delete_user(user).await?;
        tracing::info!(user_id = %user.id, "Account deleted");
        Ok(())
    }

    /// Send a reset link if the account exists. Never reveals whether it does.
    pub async fn forgot_password(
        &self,
        mut request: ForgotPasswordRequest,
    ) -> Result<(), AppError> {
        request.email = normalize_email(&request.email);
        validate_all(&request, Vec::new())?;

        let mut user = match self.db.find_user_by_email(&request.email).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::info!("Password reset requested for unknown or inactive account");
                return Ok(());
            }
        };

        let (token, digest) = self.tokens.generate_one_time()?;
        let now = Utc::now();
        user.reset_token_hash = Some(digest);
        user.reset_expires_at = Some(now + Duration::hours(RESET_TTL_HOURS));
        user.updated_at = now;
        self.db.update_user(&user).await?;

        if let Err(e) = self
            .mailer
            .send_password_reset_email(&user.email, &user.full_name, &token)
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        request: ResetPasswordRequest,
    ) -> Result<(), AppError> {
        validate_password_policy("password", &request.password)?;

        let digest = self.tokens.digest_one_time(token)?;
        let now = Utc::now();
        let mut user = match self.db.find_user_by_reset_hash(&digest).await? {
            Some(user) if user.reset_expires_at.is_some_and(|at| at > now) => user,
            _ => {
                return Err(AppError::BadRequest(
                    "Invalid or expired reset token".to_string(),
                ))
            }
        };

        user.password_hash = hash_password(&request.password).await?;
        user.reset_token_hash = None;
        user.reset_expires_at = None;
        user.updated_at = now;
        self.db.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), AppError> {
        let digest = self.tokens.digest_one_time(token)?;
        let now = Utc::now();
        let mut user = match self.db.find_user_by_verification_hash(&digest).await? {
            Some(user) if user.verification_expires_at.is_some_and(|at| at > now) => user,
            _ => {
                return Err(AppError::BadRequest(
                    "Invalid or expired verification token".to_string(),
                ))
            }
        };

        user.is_verified = true;
        user.verification_token_hash = None;
        user.verification_expires_at = None;
        user.updated_at = now;
        self.db.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn service() -> (AuthService, Arc<Mailer>) {
        let config = Config::test_default();
        let mailer = Arc::new(Mailer::memory(&config.mail.from, &config.frontend_url));
        let tokens = Arc::new(TokenService::new(&config));
        (
            AuthService::new(Db::in_memory(), tokens, mailer.clone()),
            mailer,
        )
    }

    fn register_request(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "Aa1!aaaa".to_string(),
            username: username.to_string(),
            full_name: "Kim".to_string(),
            phone_number: "01011112222".to_string(),
            user_type: Some(Role::Volunteer),
        }
    }

    fn token_from_link(text: &str, path: &str) -> String {
        let start = text.find(path).unwrap() + path.len();
        text[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_register_normalizes_and_sends_verification() {
        let (auth, mailer) = service();
        let payload = auth
            .register(register_request(" A@B.com ", "abc"))
            .await
            .unwrap();

        assert_eq!(payload.user.email, "a@b.com");
        assert!(!payload.user.is_verified);
        assert!(!payload.access_token.is_empty());

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        let token = token_from_link(&outbox[0].text, "/verify-email/");
        auth.verify_email(&token).await.unwrap();

        let user = auth.current_user(&payload.user.id).await.unwrap();
        assert!(user.is_verified);
        assert!(user.verification_token_hash.is_none());

        // Link is single-use
        assert!(matches!(
            auth.verify_email(&token).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_admin_and_bad_fields() {
        let (auth, _) = service();
        let mut request = register_request("a@b.com", "a b");
        request.user_type = Some(Role::Admin);
        request.phone_number = "123".to_string();

        match auth.register(request).await.unwrap_err() {
            AppError::Validation(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["phoneNumber", "userType", "username"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_requires_existing_active_user() {
        let (auth, _) = service();
        let payload = auth
            .register(register_request("a@b.com", "abc"))
            .await
            .unwrap();

        let refreshed = auth.refresh(&payload.refresh_token).await.unwrap();
        assert!(!refreshed.access_token.is_empty());

        // Access token is not accepted as a refresh token
        assert!(matches!(
            auth.refresh(&payload.access_token).await,
            Err(AppError::InvalidToken)
        ));

        auth.delete_account(&payload.user.id).await.unwrap();
        assert!(matches!(
            auth.refresh(&payload.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (auth, mailer) = service();
        auth.register(register_request("a@b.com", "abc"))
            .await
            .unwrap();

        // Unknown email is silently accepted and sends nothing
        auth.forgot_password(ForgotPasswordRequest {
            email: "nobody@b.com".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(mailer.outbox().len(), 1);

        auth.forgot_password(ForgotPasswordRequest {
            email: "a@b.com".to_string(),
        })
        .await
        .unwrap();
        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 2);
        let token = token_from_link(&outbox[1].text, "/reset-password/");

        auth.reset_password(
            &token,
            ResetPasswordRequest {
                password: "Bb2@bbbb".to_string(),
            },
        )
        .await
        .unwrap();

        let old = auth
            .login(LoginRequest {
                email: "a@b.com".to_string(),
                password: "Aa1!aaaa".to_string(),
            })
            .await;
        assert!(matches!(old, Err(AppError::InvalidCredentials)));

        auth.login(LoginRequest {
            email: "a@b.com".to_string(),
            password: "Bb2@bbbb".to_string(),
        })
        .await
        .unwrap();

        assert!(auth
            .reset_password(
                &token,
                ResetPasswordRequest {
                    password: "Cc3#cccc".to_string()
                }
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_change_password_wrong_current_is_bad_request() {
        let (auth, _) = service();
        let payload = auth
            .register(register_request("a@b.com", "abc"))
            .await
            .unwrap();

        let err = auth
            .change_password(
                &payload.user.id,
                ChangePasswordRequest {
                    current_password: "Wrong1!x".to_string(),
                    new_password: "Bb2@bbbb".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        auth.change_password(
            &payload.user.id,
            ChangePasswordRequest {
                current_password: "Aa1!aaaa".to_string(),
                new_password: "Bb2@bbbb".to_string(),
            },
        )
        .await
        .unwrap();
    }
}
