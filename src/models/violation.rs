//! Compliance or conduct report tied to a donation or matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    #[default]
    Reported,
    UnderInvestigation,
    Verified,
    Dismissed,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolatorType {
    Business,
    Foodbank,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    FoodSafety,
    FalseInformation,
    NoShow,
    QualityIssue,
    RegulatoryCompliance,
    Harassment,
    Fraud,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    pub violator_type: ViolatorType,
    pub violator_id: String,
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub related_donation_id: Option<String>,
    #[serde(default)]
    pub related_matching_id: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub status: ViolationStatus,
    #[serde(default)]
    pub investigated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_record_defaults() {
        let json = serde_json::json!({
            "id": "v1",
            "violatorType": "business",
            "violatorId": "b1",
            "violationType": "no_show",
            "severity": "high",
            "title": "Missed pickup",
            "description": "Nobody at the store",
            "createdAt": "2026-01-01T00:00:00Z"
        });
        let v: Violation = serde_json::from_value(json).unwrap();
        assert_eq!(v.status, ViolationStatus::Reported);
        assert_eq!(v.violation_type, ViolationType::NoShow);
        assert!(Severity::Critical > Severity::High);
        assert!(v.evidence.is_empty());
    }
}
