//! Per-user usage ledger for long-window feature quotas.
//!
//! Unlike the IP rate limiter, the ledger is persistent and counts a
//! rolling window backwards from now, so quota survives restarts and
//! follows the user across clients. Builder and admin tiers are exempt.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::models::{Profile, Tier, UsageDecision};
use crate::store::{MemberStore, StoreError};

pub struct UsageLedger {
    store: Arc<MemberStore>,
}

impl UsageLedger {
    pub fn new(store: Arc<MemberStore>) -> Self {
        Self { store }
    }

    /// Decide whether `profile` may call `endpoint` given `limit` calls per
    /// trailing `window_hours` hours.
    pub fn check(
        &self,
        profile: &Profile,
        endpoint: &str,
        limit: u64,
        window_hours: i64,
    ) -> Result<UsageDecision, StoreError> {
        if profile.role.at_least(Tier::Builder) {
            return Ok(UsageDecision {
                allowed: true,
                used: 0,
                remaining: limit,
                limit,
            });
        }

        let since = Utc::now() - Duration::hours(window_hours);
        let used = self.store.count_usage_since(&profile.id, endpoint, since)?;
        let remaining = limit.saturating_sub(used);

        Ok(UsageDecision {
            allowed: remaining > 0,
            used,
            remaining,
            limit,
        })
    }

    /// Append one usage row. Call only after the corresponding action was
    /// allowed and performed, once per unit of work.
    pub fn record(
        &self,
        user_id: &str,
        endpoint: &str,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.store.insert_usage(user_id, endpoint, metadata)
    }
}
