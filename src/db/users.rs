// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User records and their uniqueness claims.

use super::{collections, Db};
use crate::error::AppError;
use crate::models::User;
use serde::{Deserialize, Serialize};

/// Create-only document reserving an email or username for one user.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityClaim {
    user_id: String,
}

// Document IDs may not contain '/', which an email local part can.
fn email_key(email: &str) -> String {
    urlencoding::encode(email).into_owned()
}

fn username_key(username: &str) -> String {
    username.to_ascii_lowercase()
}

impl Db {
    /// Store a new user, reserving its email and username.
    ///
    /// Fails with `Conflict` if either is already taken; nothing is written
    /// in that case.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let claim = IdentityClaim {
            user_id: user.id.clone(),
        };

        if !self
            .insert_doc(collections::USER_EMAILS, &email_key(&user.email), &claim)
            .await?
        {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let username = username_key(&user.username);
        let username_claimed = match self
            .insert_doc(collections::USERNAMES, &username, &claim)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                self.release_claim(collections::USER_EMAILS, &email_key(&user.email)).await;
                return Err(e);
            }
        };
        if !username_claimed {
            self.release_claim(collections::USER_EMAILS, &email_key(&user.email)).await;
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        if let Err(e) = self.set_doc(collections::USERS, &user.id, user).await {
            self.release_claim(collections::USER_EMAILS, &email_key(&user.email)).await;
            self.release_claim(collections::USERNAMES, &username).await;
            return Err(e);
        }

        tracing::debug!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn release_claim(&self, collection: &str, id: &str) {
        if let Err(e) = self.delete_doc(collection, id).await {
            tracing::error!(collection, error = %e, "Failed to release identity claim");
        }
    }

    /// Get a user by id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, user_id).await
    }

    /// Look up a user by normalized email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let claim: Option<IdentityClaim> = self.get_doc(collections::USER_EMAILS, &email_key(email)).await?;
        match claim {
            Some(claim) => self.get_user(&claim.user_id).await,
            None => Ok(None),
        }
    }

    /// Look up the user holding a verification-token digest.
    pub async fn find_user_by_verification_hash(
        &self,
        digest: &str,
    ) -> Result<Option<User>, AppError> {
        self.find_user_by_field("verificationTokenHash", digest).await
    }

    /// Look up the user holding a password-reset-token digest.
    pub async fn find_user_by_reset_hash(&self, digest: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("resetTokenHash", digest).await
    }

    async fn find_user_by_field(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<Option<User>, AppError> {
        let mut users: Vec<User> = self
            .query_docs(collections::USERS, vec![(field, value.to_string())])
            .await?;
        if users.len() > 1 {
            tracing::warn!(field, count = users.len(), "Token digest matched several users");
        }
        Ok(users.pop())
    }

    /// Overwrite a user record. Email and username are not re-claimed.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id, user).await
    }

    /// All users, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.query_docs(collections::USERS, Vec::new()).await?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Delete a user record and free its email and username.
    pub async fn delete_user(&self, user: &User) -> Result<(), AppError> {
        self.delete_doc(collections::USERS, &user.id).await?;
        self.delete_doc(collections::USER_EMAILS, &email_key(&user.email))
            .await?;
        self.delete_doc(collections::USERNAMES, &username_key(&user.username))
            .await?;
        tracing::debug!(user_id = %user.id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn user(id: &str, email: &str, username: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            username: username.to_string(),
            full_name: "Test User".to_string(),
            phone_number: "01011112222".to_string(),
            user_type: Role::Volunteer,
            is_verified: false,
            is_active: true,
            verification_token_hash: Some(format!("digest-{}", id)),
            verification_expires_at: None,
            reset_token_hash: None,
            reset_expires_at: None,
            profile_image: None,
            address: None,
            latitude: None,
            longitude: None,
            preferences: serde_json::json!({}),
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_without_side_effects() {
        let db = Db::in_memory();
        db.create_user(&user("1", "a@b.com", "first")).await.unwrap();

        let err = db
            .create_user(&user("2", "a@b.com", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(db.get_user("2").await.unwrap().is_none());

        // The username of the rejected attempt stays free
        db.create_user(&user("3", "c@d.com", "second")).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_username_releases_email_claim() {
        let db = Db::in_memory();
        db.create_user(&user("1", "a@b.com", "taken")).await.unwrap();

        let err = db
            .create_user(&user("2", "new@b.com", "TAKEN"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Email from the failed attempt can be used again
        db.create_user(&user("3", "new@b.com", "other")).await.unwrap();
    }

    #[tokio::test]
    async fn test_lookup_and_delete() {
        let db = Db::in_memory();
        let u = user("1", "a@b.com", "abc");
        db.create_user(&u).await.unwrap();

        let by_email = db.find_user_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, "1");
        let by_token = db
            .find_user_by_verification_hash("digest-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_token.id, "1");

        db.delete_user(&u).await.unwrap();
        assert!(db.find_user_by_email("a@b.com").await.unwrap().is_none());
        db.create_user(&user("2", "a@b.com", "abc")).await.unwrap();
    }
}
