//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Account role. Stored and transmitted as the lowercase `userType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Business,
    Foodbank,
    Admin,
    Volunteer,
}

/// Something a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Publish and manage surplus-food donations.
    PostDonations,
    /// Receive donations on behalf of a food bank.
    ReceiveDonations,
    /// Carry donations between pickup and delivery.
    TransportDonations,
    /// Administer other accounts.
    ManageUsers,
    /// Skip every request rate limiter.
    BypassRateLimits,
}

impl Role {
    /// Whether this role holds `capability`. Admins hold all of them.
    pub fn grants(self, capability: Capability) -> bool {
        match self {
            Role::Admin => true,
            Role::Business => matches!(capability, Capability::PostDonations),
            Role::Foodbank => matches!(capability, Capability::ReceiveDonations),
            Role::Volunteer => matches!(capability, Capability::TransportDonations),
        }
    }

    /// Roles a user may pick at self-registration.
    pub fn is_self_assignable(self) -> bool {
        !matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Business => "business",
            Role::Foodbank => "foodbank",
            Role::Admin => "admin",
            Role::Volunteer => "volunteer",
        }
    }
}

/// User record stored in the `users` collection.
///
/// The password is only ever present as a bcrypt hash; one-time tokens are
/// only ever present as HMAC digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Random hex id (also used as document ID)
    pub id: String,
    /// Normalized (trimmed, lowercase) email
    pub email: String,
    pub password_hash: String,
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub user_type: Role,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub verification_token_hash: Option<String>,
    #[serde(default)]
    pub verification_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reset_token_hash: Option<String>,
    #[serde(default)]
    pub reset_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub preferences: serde_json::Value,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Public view of a user; never carries secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub user_type: Role,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown>"))]
    pub preferences: serde_json::Value,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_login: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            phone_number: user.phone_number.clone(),
            user_type: user.user_type,
            is_verified: user.is_verified,
            is_active: user.is_active,
            profile_image: user.profile_image.clone(),
            address: user.address.clone(),
            latitude: user.latitude,
            longitude: user.longitude,
            preferences: user.preferences.clone(),
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_matrix() {
        assert!(Role::Business.grants(Capability::PostDonations));
        assert!(!Role::Business.grants(Capability::ReceiveDonations));
        assert!(Role::Foodbank.grants(Capability::ReceiveDonations));
        assert!(!Role::Foodbank.grants(Capability::PostDonations));
        assert!(Role::Volunteer.grants(Capability::TransportDonations));
        assert!(!Role::Volunteer.grants(Capability::BypassRateLimits));
        for cap in [
            Capability::PostDonations,
            Capability::ReceiveDonations,
            Capability::TransportDonations,
            Capability::ManageUsers,
            Capability::BypassRateLimits,
        ] {
            assert!(Role::Admin.grants(cap));
        }
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Foodbank).unwrap(), "\"foodbank\"");
        let role: Role = serde_json::from_str("\"volunteer\"").unwrap();
        assert_eq!(role, Role::Volunteer);
        assert!(!Role::Admin.is_self_assignable());
    }

    #[test]
    fn test_user_response_omits_secrets() {
        let now = Utc::now();
        let user = User {
            id: "abc".to_string(),
            email: "a@b.com".to_string(),
            password_hash: "$2b$10$hash".to_string(),
            username: "abc".to_string(),
            full_name: "Kim".to_string(),
            phone_number: "01011112222".to_string(),
            user_type: Role::Volunteer,
            is_verified: false,
            is_active: true,
            verification_token_hash: Some("digest".to_string()),
            verification_expires_at: Some(now),
            reset_token_hash: None,
            reset_expires_at: None,
            profile_image: None,
            address: None,
            latitude: None,
            longitude: None,
            preferences: serde_json::json!({}),
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("verificationTokenHash"));
        assert_eq!(obj["userType"], "volunteer");
    }
}
