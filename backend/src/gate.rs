//! Access gate: the fixed check sequence in front of every gated action.
//!
//! Order is session, then profile and approval, then resource tier, then
//! rate or quota, and only then the action itself. Audit writes come after
//! the action and are best effort; a failed append never fails the
//! response that triggered it.

use axum::http::HeaderMap;
use std::sync::Arc;

use crate::auth::IdentityClient;
use crate::error::GateError;
use crate::models::{AuditEntry, DownloadLog, Profile, Tier, UsageDecision};
use crate::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitStore};
use crate::resources;
use crate::store::MemberStore;
use crate::usage::UsageLedger;

pub struct Gate {
    identity: Arc<IdentityClient>,
    store: Arc<MemberStore>,
    rate_limiter: Arc<dyn RateLimitStore>,
    usage: UsageLedger,
}

impl Gate {
    pub fn new(
        identity: Arc<IdentityClient>,
        store: Arc<MemberStore>,
        rate_limiter: Arc<dyn RateLimitStore>,
    ) -> Self {
        let usage = UsageLedger::new(store.clone());
        Self {
            identity,
            store,
            rate_limiter,
            usage,
        }
    }

    /// Resolve the caller: session token, then profile row, then approval.
    /// Unapproved accounts are denied every tiered operation.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Profile, GateError> {
        let session = self.identity.resolve_session(headers).await?;
        let profile = self
            .store
            .get_profile(&session.id)?
            .ok_or(GateError::ProfileMissing)?;
        if !profile.is_approved {
            return Err(GateError::NotApproved);
        }
        Ok(profile)
    }

    pub async fn require_admin(&self, headers: &HeaderMap) -> Result<Profile, GateError> {
        let profile = self.authenticate(headers).await?;
        if profile.role != Tier::Admin {
            return Err(GateError::AdminRequired);
        }
        Ok(profile)
    }

    /// Check the caller's tier against the resource table.
    pub fn authorize_file(&self, profile: &Profile, file: &str) -> Result<(), GateError> {
        match resources::allowed_tiers(file) {
            None => Err(GateError::NotFound("File not found".to_string())),
            Some(tiers) if tiers.contains(&profile.role) => Ok(()),
            Some(_) => Err(GateError::Forbidden {
                required: resources::required_tier(file).unwrap_or(Tier::Admin),
                current: profile.role,
            }),
        }
    }

    /// Count one request against the fixed-window limiter for `action`.
    pub async fn check_rate(
        &self,
        action: &str,
        key: &str,
        policy: &RateLimitPolicy,
        message: &str,
    ) -> Result<(), GateError> {
        match self.rate_limiter.hit(action, key, policy).await? {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Rejected { retry_after } => Err(GateError::RateLimited {
                message: message.to_string(),
                retry_after_secs: retry_after.as_secs().max(1),
            }),
        }
    }

    /// Check the caller's usage quota for `endpoint` without recording.
    pub async fn check_quota(
        &self,
        profile: &Profile,
        endpoint: &str,
        limit: u64,
        window_hours: i64,
    ) -> Result<UsageDecision, GateError> {
        let decision = self.usage.check(profile, endpoint, limit, window_hours)?;
        if !decision.allowed {
            return Err(GateError::QuotaExceeded {
                used: decision.used,
                limit: decision.limit,
            });
        }
        Ok(decision)
    }

    /// Append a usage row for a completed action. Best effort.
    pub fn record_usage(&self, user_id: &str, endpoint: &str, metadata: serde_json::Value) {
        if let Err(e) = self.usage.record(user_id, endpoint, metadata) {
            tracing::warn!("Failed to record usage for {}: {}", user_id, e);
        }
    }

    /// Append an admin audit entry. Best effort.
    pub fn audit(&self, entry: AuditEntry) {
        if let Err(e) = self.store.insert_admin_log(&entry) {
            tracing::warn!("Failed to write audit log for {}: {}", entry.action, e);
        }
    }

    /// Append a download log row. Best effort.
    pub fn log_download(&self, log: DownloadLog) {
        if let Err(e) = self.store.insert_download_log(&log) {
            tracing::warn!("Failed to write download log for {}: {}", log.file_name, e);
        }
    }
}
