// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation listings.

use super::{collections, Db};
use crate::error::AppError;
use crate::models::{Donation, DonationStatus, FoodType};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Equality filters for listing donations.
#[derive(Debug, Default, Clone)]
pub struct DonationFilter {
    pub status: Option<DonationStatus>,
    pub food_type: Option<FoodType>,
    pub business_id: Option<String>,
}

impl DonationFilter {
    fn into_fields(self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(status) = self.status {
            fields.push(("status", status.as_str().to_string()));
        }
        if let Some(food_type) = self.food_type {
            fields.push(("foodType", food_type.as_str().to_string()));
        }
        if let Some(business_id) = self.business_id {
            fields.push(("businessId", business_id));
        }
        fields
    }
}

impl Db {
    /// Store a new donation. Ids are random, so a collision is a bug.
    pub async fn create_donation(&self, donation: &Donation) -> Result<(), AppError> {
        if !self
            .insert_doc(collections::DONATIONS, &donation.id, donation)
            .await?
        {
            return Err(AppError::Database(format!(
                "Donation id collision: {}",
                donation.id
            )));
        }
        Ok(())
    }

    pub async fn get_donation(&self, donation_id: &str) -> Result<Option<Donation>, AppError> {
        self.get_doc(collections::DONATIONS, donation_id).await
    }

    pub async fn update_donation(&self, donation: &Donation) -> Result<(), AppError> {
        self.set_doc(collections::DONATIONS, &donation.id, donation)
            .await
    }

    pub async fn delete_donation(&self, donation_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::DONATIONS, donation_id).await
    }

    /// Donations matching `filter`, newest first.
    pub async fn list_donations(&self, filter: DonationFilter) -> Result<Vec<Donation>, AppError> {
        let mut donations: Vec<Donation> = self
            .query_docs(collections::DONATIONS, filter.into_fields())
            .await?;
        donations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(donations)
    }

    /// Delete every donation owned by a business. Returns the number removed.
    pub async fn delete_donations_for_business(&self, business_id: &str) -> Result<usize, AppError> {
        let donations = self
            .list_donations(DonationFilter {
                business_id: Some(business_id.to_string()),
                ..Default::default()
            })
            .await?;

        let results = stream::iter(donations)
            .map(|donation| async move { self.delete_donation(&donation.id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await;

        let mut deleted = 0;
        for result in results {
            result?;
            deleted += 1;
        }
        tracing::debug!(business_id, deleted, "Deleted donations for business");
        Ok(deleted)
    }
}
