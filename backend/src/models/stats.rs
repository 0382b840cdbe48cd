use chrono::{DateTime, Utc};
use serde::Serialize;

use super::tier::Tier;

/// Aggregate membership counters for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub total_users: u64,
    pub free_users: u64,
    pub builder_users: u64,
    pub admin_users: u64,
    pub newsletter_subscribers: u64,
    /// Users who logged in during the trailing 7 days
    pub active_users_7d: u64,
    pub signups_today: u64,
    pub signups_7d: u64,
}

/// One row of the recent-signups feed on the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RecentSignup {
    pub created_at: DateTime<Utc>,
    pub role: Tier,
}
