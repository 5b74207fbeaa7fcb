// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-in session state.
//!
//! Every transition is synchronous and writes the persisted subset
//! (user, tokens, authenticated flag) to storage under [`STORAGE_KEY`].
//! The loading flag is transient and never persisted.

use super::storage::SessionStorage;
use super::ClientError;
use crate::models::UserResponse;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Storage key holding the persisted session blob.
pub const STORAGE_KEY: &str = "auth-storage";

/// Full in-memory session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<UserResponse>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

/// The part of [`SessionState`] that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub user: Option<UserResponse>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            user: state.user.clone(),
            access_token: state.access_token.clone(),
            refresh_token: state.refresh_token.clone(),
            is_authenticated: state.is_authenticated,
        }
    }
}

/// Session container shared between the UI and [`super::ApiClient`].
pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Box<dyn SessionStorage>,
}

impl SessionStore {
    /// Rehydrate from `storage`. A corrupt blob is discarded and the session starts empty.
    pub fn load(storage: Box<dyn SessionStorage>) -> Result<Self, ClientError> {
        let state = match storage.get(STORAGE_KEY)? {
            Some(raw) => match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(saved) => SessionState {
                    user: saved.user,
                    access_token: saved.access_token,
                    refresh_token: saved.refresh_token,
                    is_authenticated: saved.is_authenticated,
                    is_loading: false,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable persisted session");
                    storage.remove(STORAGE_KEY)?;
                    SessionState::default()
                }
            },
            None => SessionState::default(),
        };

        Ok(Self {
            state: RwLock::new(state),
            storage,
        })
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserResponse> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    // ─── Transitions ─────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.write().is_loading = loading;
    }

    /// A login or registration succeeded.
    pub fn sign_in(&self, user: UserResponse, access_token: String, refresh_token: String) {
        self.update(|s| {
            s.user = Some(user);
            s.access_token = Some(access_token);
            s.refresh_token = Some(refresh_token);
            s.is_authenticated = true;
            s.is_loading = false;
        });
    }

    pub fn set_access_token(&self, access_token: String) {
        self.update(|s| s.access_token = Some(access_token));
    }

    /// Replace the profile and mark the session live.
    pub fn set_user(&self, user: UserResponse) {
        self.update(|s| {
            s.user = Some(user);
            s.is_authenticated = true;
        });
    }

    /// Shallow-merge `patch` (camelCase keys) into the stored profile.
    ///
    /// Does nothing when there is no user.
    pub fn merge_user(&self, patch: &serde_json::Value) -> Result<(), ClientError> {
        let Some(current) = self.user() else {
            return Ok(());
        };
        let mut merged = serde_json::to_value(&current)
            .map_err(|e| ClientError::Storage(format!("serialize user: {}", e)))?;
        if let (Some(target), Some(fields)) = (merged.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        let user: UserResponse = serde_json::from_value(merged)
            .map_err(|e| ClientError::Storage(format!("invalid user patch: {}", e)))?;
        self.update(|s| s.user = Some(user));
        Ok(())
    }

    pub fn set_unauthenticated(&self) {
        self.update(|s| {
            s.is_authenticated = false;
            s.is_loading = false;
        });
    }

    /// Drop the user and both tokens.
    pub fn clear(&self) {
        self.update(|s| *s = SessionState::default());
    }

    fn update(&self, mutate: impl FnOnce(&mut SessionState)) {
        let persisted = {
            let mut state = self.write();
            mutate(&mut state);
            PersistedSession::from(&*state)
        };
        self.persist(&persisted);
    }

    /// Storage failures are logged; the in-memory session stays authoritative.
    fn persist(&self, persisted: &PersistedSession) {
        let result = serde_json::to_string(persisted)
            .map_err(|e| ClientError::Storage(e.to_string()))
            .and_then(|raw| self.storage.set(STORAGE_KEY, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;
    use crate::models::Role;
    use chrono::Utc;
    use std::sync::Arc;

    /// Storage handle the test can keep reading after handing it to a store.
    #[derive(Clone, Default)]
    struct Shared(Arc<MemoryStorage>);

    impl SessionStorage for Shared {
        fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), ClientError> {
            self.0.remove(key)
        }
    }

    fn user() -> UserResponse {
        UserResponse {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            username: "alice".to_string(),
            full_name: "Alice Example".to_string(),
            phone_number: "01012345678".to_string(),
            user_type: Role::Business,
            is_verified: false,
            is_active: true,
            profile_image: None,
            address: None,
            latitude: None,
            longitude: None,
            preferences: serde_json::json!({}),
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_in_persists_only_durable_fields() {
        let storage = Shared::default();
        let store = SessionStore::load(Box::new(storage.clone())).unwrap();

        store.set_loading(true);
        store.sign_in(user(), "access".into(), "refresh".into());

        let raw = storage.get(STORAGE_KEY).unwrap().expect("persisted");
        let blob: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(blob["accessToken"], "access");
        assert_eq!(blob["refreshToken"], "refresh");
        assert_eq!(blob["isAuthenticated"], true);
        assert_eq!(blob["user"]["username"], "alice");
        assert!(blob.get("isLoading").is_none());
        assert!(!store.is_loading());
    }

    #[test]
    fn test_rehydrate_after_restart() {
        let storage = Shared::default();
        {
            let store = SessionStore::load(Box::new(storage.clone())).unwrap();
            store.sign_in(user(), "access".into(), "refresh".into());
        }

        let store = SessionStore::load(Box::new(storage)).unwrap();
        let state = store.snapshot();
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(state.user.unwrap().id, "u1");
    }

    #[test]
    fn test_clear_resets_everything() {
        let storage = Shared::default();
        let store = SessionStore::load(Box::new(storage.clone())).unwrap();
        store.sign_in(user(), "access".into(), "refresh".into());
        store.clear();

        assert_eq!(store.snapshot(), SessionState::default());
        let blob: PersistedSession =
            serde_json::from_str(&storage.get(STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(blob, PersistedSession::default());
    }

    #[test]
    fn test_merge_user_is_shallow() {
        let store = SessionStore::load(Box::new(MemoryStorage::new())).unwrap();
        store.sign_in(user(), "access".into(), "refresh".into());

        store
            .merge_user(&serde_json::json!({"fullName": "Alice Updated", "address": "Seoul"}))
            .unwrap();
        let merged = store.user().unwrap();
        assert_eq!(merged.full_name, "Alice Updated");
        assert_eq!(merged.address.as_deref(), Some("Seoul"));
        assert_eq!(merged.username, "alice");

        assert!(store
            .merge_user(&serde_json::json!({"userType": "wizard"}))
            .is_err());
    }

    #[test]
    fn test_corrupt_blob_is_discarded() {
        let storage = Shared::default();
        storage.set(STORAGE_KEY, "not json").unwrap();

        let store = SessionStore::load(Box::new(storage.clone())).unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(STORAGE_KEY).unwrap(), None);
    }
}
