//! Process-local document store used for tests and `DATABASE_BACKEND=memory`.
//!
//! Documents are kept as JSON values so the same serde mapping applies as
//! with Firestore.

use crate::error::AppError;
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

#[derive(Default)]
pub struct MemoryStore {
    /// Keyed by (collection, document id)
    docs: DashMap<(String, String), Value>,
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

fn to_value<T: Serialize>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(format!("Encode failed: {}", e)))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Database(format!("Decode failed: {}", e)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        // Clone out of the shard before decoding so the lock is released.
        let value = self.docs.get(&key(collection, id)).map(|v| v.clone());
        value.map(from_value).transpose()
    }

    pub fn set<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError> {
        self.docs.insert(key(collection, id), to_value(doc)?);
        Ok(())
    }

    pub fn insert<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<bool, AppError> {
        let value = to_value(doc)?;
        match self.docs.entry(key(collection, id)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    pub fn delete(&self, collection: &str, id: &str) {
        self.docs.remove(&key(collection, id));
    }

    pub fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[(&'static str, String)],
    ) -> Result<Vec<T>, AppError> {
        let matching: Vec<Value> = self
            .docs
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| {
                filters.iter().all(|(field, expected)| {
                    entry.value().get(*field).and_then(Value::as_str) == Some(expected.as_str())
                })
            })
            .map(|entry| entry.value().clone())
            .collect();

        matching.into_iter().map(from_value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        owner: String,
        n: u32,
    }

    #[test]
    fn test_insert_is_create_only() {
        let store = MemoryStore::new();
        let doc = Doc {
            owner: "a".into(),
            n: 1,
        };
        assert!(store.insert("c", "1", &doc).unwrap());
        assert!(!store.insert("c", "1", &doc).unwrap());
        // Same id in another collection is independent
        assert!(store.insert("other", "1", &doc).unwrap());
    }

    #[test]
    fn test_query_filters_by_collection_and_field() {
        let store = MemoryStore::new();
        store.set("c", "1", &Doc { owner: "a".into(), n: 1 }).unwrap();
        store.set("c", "2", &Doc { owner: "b".into(), n: 2 }).unwrap();
        store.set("d", "3", &Doc { owner: "a".into(), n: 3 }).unwrap();

        let found: Vec<Doc> = store.query("c", &[("owner", "a".to_string())]).unwrap();
        assert_eq!(found, vec![Doc { owner: "a".into(), n: 1 }]);

        let all: Vec<Doc> = store.query("c", &[]).unwrap();
        assert_eq!(all.len(), 2);

        store.delete("c", "1");
        assert!(store.get::<Doc>("c", "1").unwrap().is_none());
    }
}
