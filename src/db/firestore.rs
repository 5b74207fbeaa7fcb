// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with untyped document primitives.
//!
//! The typed operations in `users`, `profiles` and `donations` are built on
//! the handful of calls here.

use crate::error::AppError;
use serde::{de::DeserializeOwned, Serialize};

/// Connect to Firestore.
///
/// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
pub async fn connect(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
    // If the emulator environment variable is set, use unauthenticated connection
    // to avoid local credential warnings and leakage.
    if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
        return connect_emulator(project_id).await;
    }

    let client = firestore::FirestoreDb::new(project_id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

    tracing::info!(project = project_id, "Connected to Firestore");
    Ok(client)
}

/// Connect to the emulator with a dummy bearer token.
async fn connect_emulator(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
    tracing::info!("Using unauthenticated connection for Firestore Emulator");

    let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
        Ok(gcloud_sdk::Token {
            token_type: "Bearer".to_string(),
            token: gcloud_sdk::SecretValue::new(
                "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                    .to_string()
                    .into(),
            ),
            expiry: chrono::Utc::now() + chrono::Duration::hours(1),
        })
    });

    let options = firestore::FirestoreDbOptions::new(project_id.to_string());

    let client = firestore::FirestoreDb::with_options_token_source(
        options,
        gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
    )
    .await
    .map_err(|e| AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e)))?;

    tracing::info!(
        project = project_id,
        "Connected to Firestore (Emulator/Unauthenticated)"
    );
    Ok(client)
}

pub(super) async fn get<T>(
    client: &firestore::FirestoreDb,
    collection: &str,
    id: &str,
) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned + Send,
{
    client
        .fluent()
        .select()
        .by_id_in(collection)
        .obj()
        .one(id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

pub(super) async fn set<T>(
    client: &firestore::FirestoreDb,
    collection: &str,
    id: &str,
    doc: &T,
) -> Result<(), AppError>
where
    T: Serialize + DeserializeOwned + Sync + Send,
{
    let _: () = client
        .fluent()
        .update()
        .in_col(collection)
        .document_id(id)
        .object(doc)
        .execute()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Create-only write. Returns `false` if the document already exists.
pub(super) async fn insert<T>(
    client: &firestore::FirestoreDb,
    collection: &str,
    id: &str,
    doc: &T,
) -> Result<bool, AppError>
where
    T: Serialize + DeserializeOwned + Sync + Send,
{
    let result: Result<(), _> = client
        .fluent()
        .insert()
        .into(collection)
        .document_id(id)
        .object(doc)
        .execute()
        .await;

    match result {
        Ok(()) => Ok(true),
        Err(firestore::errors::FirestoreError::DataConflictError(_)) => Ok(false),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

pub(super) async fn delete(
    client: &firestore::FirestoreDb,
    collection: &str,
    id: &str,
) -> Result<(), AppError> {
    client
        .fluent()
        .delete()
        .from(collection)
        .document_id(id)
        .execute()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// All documents whose string fields equal the given values.
pub(super) async fn query<T>(
    client: &firestore::FirestoreDb,
    collection: &str,
    filters: Vec<(&'static str, String)>,
) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Send,
{
    client
        .fluent()
        .select()
        .from(collection)
        .filter(move |q| {
            q.for_all(
                filters
                    .iter()
                    .map(|(field, value)| q.field(*field).eq(value.clone())),
            )
        })
        .obj()
        .query()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
