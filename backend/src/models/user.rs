use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// Member profile row, provisioned at signup.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    /// User ID issued by the identity backend
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// Subscription tier
    pub role: Tier,
    /// Whether the account has cleared approval; unapproved accounts
    /// are denied every tiered operation
    pub is_approved: bool,
    pub newsletter_opt_in: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set on each successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl Profile {
    /// Fresh profile row for a newly registered user. Starts on the free
    /// tier with no recorded login.
    pub fn new(
        id: &str,
        email: &str,
        name: Option<String>,
        newsletter_opt_in: bool,
        is_approved: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            email: email.to_lowercase(),
            name,
            role: Tier::Free,
            is_approved,
            newsletter_opt_in,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Partial update an admin may apply to a profile. These are the only
/// writable fields; anything else in a request body is dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newsletter_opt_in: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_approved.is_none() && self.newsletter_opt_in.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_drops_unknown_fields() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"role":"builder","email":"evil@example.com"}"#).unwrap();
        assert_eq!(update.role, Some(Tier::Builder));
        assert!(!update.is_empty());
        let details = serde_json::to_value(&update).unwrap();
        assert!(details.get("email").is_none());
    }

    #[test]
    fn test_update_with_no_known_fields_is_empty() {
        let update: ProfileUpdate = serde_json::from_str(r#"{"password":"hunter2"}"#).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_update_rejects_invalid_role() {
        assert!(serde_json::from_str::<ProfileUpdate>(r#"{"role":"owner"}"#).is_err());
    }

    #[test]
    fn test_update_details_skip_unset_fields() {
        let update = ProfileUpdate {
            is_approved: Some(true),
            ..Default::default()
        };
        let details = serde_json::to_value(&update).unwrap();
        assert_eq!(details, serde_json::json!({"is_approved": true}));
    }
}
