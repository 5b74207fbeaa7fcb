//! Business and food bank profiles, one-to-one with their owning user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Restaurant,
    Bakery,
    Cafe,
    Mart,
    Franchise,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Nonprofit,
    Government,
    Religious,
    Community,
    School,
}

/// Stored at `businesses/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub user_id: String,
    pub business_name: String,
    pub business_type: BusinessType,
    #[serde(default)]
    pub business_registration_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub total_donations: u32,
    #[serde(default)]
    pub is_verified: bool,
    pub updated_at: DateTime<Utc>,
}

/// Stored at `food_banks/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodBank {
    pub user_id: String,
    pub organization_name: String,
    pub organization_type: OrganizationType,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub contact_number: Option<String>,
    /// Servings the food bank can hold at once
    #[serde(default)]
    pub capacity: u32,
    /// Servings currently needed
    #[serde(default)]
    pub current_need: u32,
    #[serde(default)]
    pub beneficiary_count: u32,
    #[serde(default)]
    pub transportation_available: bool,
    #[serde(default)]
    pub total_received: u32,
    #[serde(default)]
    pub is_verified: bool,
    pub updated_at: DateTime<Utc>,
}
