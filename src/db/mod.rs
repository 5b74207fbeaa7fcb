// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory fallback).

pub mod donations;
pub mod firestore;
pub mod memory;
pub mod profiles;
pub mod users;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use memory::MemoryStore;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub use donations::DonationFilter;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Create-only claim per normalized email (keyed by email)
    pub const USER_EMAILS: &str = "user_emails";
    /// Create-only claim per lowercased username
    pub const USERNAMES: &str = "usernames";
    pub const BUSINESSES: &str = "businesses";
    pub const FOOD_BANKS: &str = "food_banks";
    pub const DONATIONS: &str = "donations";
}

#[derive(Clone)]
enum Backend {
    Firestore(::firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Database handle shared by every request.
#[derive(Clone)]
pub struct Db {
    backend: Backend,
}

impl Db {
    /// Open the configured backend.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        match config {
            DatabaseConfig::Firestore { project_id } => Ok(Self {
                backend: Backend::Firestore(firestore::connect(project_id).await?),
            }),
            DatabaseConfig::Memory => {
                tracing::warn!("Using in-memory database; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    /// Create an empty process-local database.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => firestore::get(client, collection, id).await,
            Backend::Memory(store) => store.get(collection, id),
        }
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => firestore::set(client, collection, id, doc).await,
            Backend::Memory(store) => store.set(collection, id, doc),
        }
    }

    async fn insert_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<bool, AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => firestore::insert(client, collection, id, doc).await,
            Backend::Memory(store) => store.insert(collection, id, doc),
        }
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => firestore::delete(client, collection, id).await,
            Backend::Memory(store) => {
                store.delete(collection, id);
                Ok(())
            }
        }
    }

    async fn query_docs<T>(
        &self,
        collection: &str,
        filters: Vec<(&'static str, String)>,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => firestore::query(client, collection, filters).await,
            Backend::Memory(store) => store.query(collection, &filters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        body: String,
    }

    #[tokio::test]
    async fn test_documents_round_trip_through_facade() {
        let db = Db::in_memory();
        let note = Note {
            body: "first".to_string(),
        };

        assert!(db.insert_doc("notes", "n1", &note).await.unwrap());
        assert!(!db.insert_doc("notes", "n1", &note).await.unwrap());

        let updated = Note {
            body: "second".to_string(),
        };
        db.set_doc("notes", "n1", &updated).await.unwrap();
        let loaded: Option<Note> = db.get_doc("notes", "n1").await.unwrap();
        assert_eq!(loaded, Some(updated));

        db.delete_doc("notes", "n1").await.unwrap();
        let gone: Option<Note> = db.get_doc("notes", "n1").await.unwrap();
        assert!(gone.is_none());
    }
}
