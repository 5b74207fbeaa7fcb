// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Surplus-food donation posted by a business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    PreparedMeal,
    Bakery,
    Produce,
    Dairy,
    Packaged,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    #[default]
    Servings,
    Kg,
    Boxes,
    Containers,
    Pieces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageRequirement {
    #[default]
    RoomTemperature,
    Refrigerated,
    Frozen,
}

/// Lifecycle of a donation listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    #[default]
    Available,
    Reserved,
    Matched,
    Completed,
    Cancelled,
    Expired,
}

impl DonationStatus {
    /// Wire name, as stored and used in query filters.
    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::Available => "available",
            DonationStatus::Reserved => "reserved",
            DonationStatus::Matched => "matched",
            DonationStatus::Completed => "completed",
            DonationStatus::Cancelled => "cancelled",
            DonationStatus::Expired => "expired",
        }
    }
}

impl FoodType {
    pub fn as_str(self) -> &'static str {
        match self {
            FoodType::PreparedMeal => "prepared_meal",
            FoodType::Bakery => "bakery",
            FoodType::Produce => "produce",
            FoodType::Dairy => "dairy",
            FoodType::Packaged => "packaged",
            FoodType::Mixed => "mixed",
        }
    }
}

/// Donation stored in the `donations` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    /// Owning business (the posting user's id)
    pub business_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub food_type: FoodType,
    #[serde(default)]
    pub food_categories: Vec<String>,
    pub quantity: u32,
    #[serde(default)]
    pub unit: QuantityUnit,
    pub expiry_time: DateTime<Utc>,
    pub pickup_start_time: DateTime<Utc>,
    pub pickup_end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: DonationStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub storage_requirements: StorageRequirement,
    #[serde(default)]
    pub transportation_required: bool,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub is_halal: bool,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub matched_food_bank_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names_match_serde() {
        for status in [
            DonationStatus::Available,
            DonationStatus::Reserved,
            DonationStatus::Matched,
            DonationStatus::Completed,
            DonationStatus::Cancelled,
            DonationStatus::Expired,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str().unwrap(), status.as_str());
        }
        let json = serde_json::to_value(FoodType::PreparedMeal).unwrap();
        assert_eq!(json.as_str().unwrap(), FoodType::PreparedMeal.as_str());
    }
}
