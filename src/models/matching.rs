//! Proposed pairing of a donation with a receiving food bank.
//!
//! Only the record shape and status vocabulary are defined here; who may move
//! a matching between states is not decided yet, so no transition guards exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStatus {
    #[default]
    Proposed,
    Accepted,
    Rejected,
    Confirmed,
    InTransit,
    Delivered,
    Completed,
    Cancelled,
    Disputed,
}

impl MatchingStatus {
    /// `cancelled` and `disputed` end a matching from any point in its life.
    pub fn is_absorbing(self) -> bool {
        matches!(self, MatchingStatus::Cancelled | MatchingStatus::Disputed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMethod {
    BusinessDelivery,
    FoodbankPickup,
    Volunteer,
    ThirdParty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matching {
    pub id: String,
    pub donation_id: String,
    pub food_bank_id: String,
    pub business_id: String,
    /// 0-100
    pub match_score: f64,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub status: MatchingStatus,
    #[serde(default)]
    pub transport_method: Option<TransportMethod>,
    #[serde(default)]
    pub volunteer_id: Option<String>,
    #[serde(default)]
    pub regulatory_checks_passed: bool,
    pub proposed_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorbing_states() {
        assert!(MatchingStatus::Cancelled.is_absorbing());
        assert!(MatchingStatus::Disputed.is_absorbing());
        assert!(!MatchingStatus::Completed.is_absorbing());
        assert!(!MatchingStatus::Proposed.is_absorbing());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&MatchingStatus::InTransit).unwrap(),
            "\"in_transit\""
        );
        assert_eq!(MatchingStatus::default(), MatchingStatus::Proposed);
    }
}
