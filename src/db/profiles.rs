//! Business and food bank profile documents, keyed by owning user id.

use super::{collections, Db};
use crate::error::AppError;
use crate::models::{Business, FoodBank};

impl Db {
    pub async fn get_business(&self, user_id: &str) -> Result<Option<Business>, AppError> {
        self.get_doc(collections::BUSINESSES, user_id).await
    }

    pub async fn upsert_business(&self, business: &Business) -> Result<(), AppError> {
        self.set_doc(collections::BUSINESSES, &business.user_id, business)
            .await
    }

    pub async fn list_businesses(&self) -> Result<Vec<Business>, AppError> {
        let mut businesses: Vec<Business> =
            self.query_docs(collections::BUSINESSES, Vec::new()).await?;
        businesses.sort_by(|a, b| a.business_name.cmp(&b.business_name));
        Ok(businesses)
    }

    pub async fn get_food_bank(&self, user_id: &str) -> Result<Option<FoodBank>, AppError> {
        self.get_doc(collections::FOOD_BANKS, user_id).await
    }

    pub async fn upsert_food_bank(&self, food_bank: &FoodBank) -> Result<(), AppError> {
        self.set_doc(collections::FOOD_BANKS, &food_bank.user_id, food_bank)
            .await
    }

    pub async fn list_food_banks(&self) -> Result<Vec<FoodBank>, AppError> {
        let mut food_banks: Vec<FoodBank> =
            self.query_docs(collections::FOOD_BANKS, Vec::new()).await?;
        food_banks.sort_by(|a, b| a.organization_name.cmp(&b.organization_name));
        Ok(food_banks)
    }

    /// Remove whichever profile the user owns. Missing documents are not an error.
    pub async fn delete_profiles(&self, user_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::BUSINESSES, user_id).await?;
        self.delete_doc(collections::FOOD_BANKS, user_id).await
    }
}
