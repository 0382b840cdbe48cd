//! Admin API routes.
//!
//! Provides:
//! - Member listing with search, filters and pagination (`GET /admin/users`)
//! - Profile updates and deletion (`PUT`/`DELETE /admin/users`)
//! - Dashboard statistics (`GET /admin/stats`)
//!
//! Every route sits behind the admin middleware; the authenticated admin
//! profile is attached to the request so handlers can attribute audit
//! entries and refuse self-destructive operations.

use axum::extract::{Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::parse_body;
use crate::error::GateError;
use crate::logging::client_ip;
use crate::models::{AuditEntry, Profile, ProfileStats, ProfileUpdate, RecentSignup, Tier};
use crate::store::{ProfileQuery, SortField, SortOrder};
use crate::AppState;

/// Middleware that admits only admin-tier sessions.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.gate.require_admin(request.headers()).await {
        Ok(profile) => {
            request.extensions_mut().insert(profile);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct UsersQuery {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
    role: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Serialize)]
struct Pagination {
    page: u32,
    limit: u32,
    total: u64,
    pages: u64,
}

#[derive(Serialize)]
struct Filters {
    search: String,
    role: String,
    sort: &'static str,
    order: &'static str,
}

#[derive(Serialize)]
struct UsersResponse {
    success: bool,
    users: Vec<Profile>,
    pagination: Pagination,
    stats: ProfileStats,
    filters: Filters,
}

/// GET /admin/users - Paginated member listing
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, GateError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let role = match query.role.as_deref() {
        None | Some("all") => None,
        Some(value) => Some(
            Tier::parse(value)
                .ok_or_else(|| GateError::Validation("Invalid role filter".to_string()))?,
        ),
    };
    let sort = match query.sort.as_deref() {
        None => SortField::CreatedAt,
        Some(value) => SortField::parse(value)
            .ok_or_else(|| GateError::Validation("Invalid sort field".to_string()))?,
    };
    let order = match query.order.as_deref() {
        None => SortOrder::Desc,
        Some(value) => SortOrder::parse(value)
            .ok_or_else(|| GateError::Validation("Invalid sort order".to_string()))?,
    };

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let (users, total) = state.store.list_profiles(&ProfileQuery {
        search: search.clone(),
        role,
        sort,
        order,
        page,
        limit,
    })?;
    let stats = state.store.profile_stats()?;

    Ok(Json(UsersResponse {
        success: true,
        users,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit as u64),
        },
        stats,
        filters: Filters {
            search: search.unwrap_or_default(),
            role: query.role.unwrap_or_else(|| "all".to_string()),
            sort: sort.as_str(),
            order: order.as_str(),
        },
    }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UpdateUserRequest {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    updates: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct UpdateUserResponse {
    success: bool,
    user: Profile,
    message: &'static str,
}

/// PUT /admin/users - Apply an allow-listed partial update
async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Profile>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<UpdateUserResponse>, GateError> {
    let body: UpdateUserRequest = parse_body(body)?;
    let (Some(user_id), Some(updates)) = (body.user_id.filter(|v| !v.is_empty()), body.updates)
    else {
        return Err(GateError::Validation(
            "User ID and updates are required".to_string(),
        ));
    };

    // Unknown fields are dropped here; only the allow-listed ones survive
    let updates: ProfileUpdate = parse_body(updates)?;
    if updates.is_empty() {
        return Err(GateError::Validation(
            "No valid updates provided".to_string(),
        ));
    }

    let updated = state
        .store
        .update_profile(&user_id, &updates)?
        .ok_or_else(|| GateError::NotFound("User not found".to_string()))?;

    let details = serde_json::to_value(&updates).unwrap_or(serde_json::Value::Null);
    state.gate.audit(AuditEntry::new(
        &admin.id,
        "user_update",
        Some(&user_id),
        details,
        client_ip(&headers),
    ));

    tracing::info!("Admin {} updated user {}", admin.id, user_id);

    Ok(Json(UpdateUserResponse {
        success: true,
        user: updated,
        message: "User updated successfully",
    }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DeleteUserRequest {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Serialize)]
struct DeleteUserResponse {
    success: bool,
    message: &'static str,
}

/// DELETE /admin/users - Remove a member and their activity
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Profile>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<DeleteUserResponse>, GateError> {
    let body: DeleteUserRequest = parse_body(body)?;
    let Some(user_id) = body.user_id.filter(|v| !v.is_empty()) else {
        return Err(GateError::Validation("User ID is required".to_string()));
    };

    if user_id == admin.id {
        return Err(GateError::Validation(
            "Cannot delete your own account".to_string(),
        ));
    }

    // Capture the row before anything is destroyed; the audit entry must
    // survive the profile itself.
    let target = state
        .store
        .get_profile(&user_id)?
        .ok_or_else(|| GateError::NotFound("User not found".to_string()))?;

    state.identity.delete_user(&user_id).await?;
    state.store.delete_profile(&user_id)?;

    state.gate.audit(AuditEntry::new(
        &admin.id,
        "user_delete",
        Some(&user_id),
        json!({
            "deleted_user_email": target.email,
            "deleted_user_role": target.role,
        }),
        client_ip(&headers),
    ));

    tracing::info!("Admin {} deleted user {}", admin.id, user_id);

    Ok(Json(DeleteUserResponse {
        success: true,
        message: "User deleted successfully",
    }))
}

#[derive(Serialize)]
struct UserDistribution {
    free: u64,
    builder: u64,
    admin: u64,
}

#[derive(Serialize)]
struct DownloadCount {
    file: String,
    count: u64,
}

#[derive(Serialize)]
struct AdminStats {
    total_users: u64,
    signups_today: u64,
    signups_7d: u64,
    active_users_7d: u64,
    newsletter_subscribers: u64,
    user_distribution: UserDistribution,
    /// Daily signups for the trailing week, keyed by ISO date
    signup_trend: BTreeMap<String, u64>,
    api_usage_by_endpoint: BTreeMap<String, u64>,
    total_api_calls_7d: u64,
    popular_downloads: Vec<DownloadCount>,
    total_downloads_7d: u64,
    recent_signups: Vec<RecentSignup>,
    recent_admin_actions: Vec<AuditEntry>,
}

#[derive(Serialize)]
struct StatsResponse {
    success: bool,
    stats: AdminStats,
    generated_at: DateTime<Utc>,
}

/// GET /admin/stats - Dashboard aggregates
async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, GateError> {
    let week_ago = Utc::now() - Duration::days(7);

    let basic = state.store.profile_stats()?;
    let trend = state.store.signup_trend(7)?;
    let usage = state.store.usage_by_endpoint(week_ago)?;
    let total_api_calls_7d = usage.iter().map(|(_, count)| count).sum();
    let downloads = state.store.top_downloads(week_ago, 5)?;
    let total_downloads_7d = state.store.count_downloads_since(week_ago)?;
    let recent_signups = state.store.recent_signups(week_ago, 5)?;
    let recent_admin_actions = state.store.recent_admin_logs(10)?;

    Ok(Json(StatsResponse {
        success: true,
        stats: AdminStats {
            total_users: basic.total_users,
            signups_today: basic.signups_today,
            signups_7d: basic.signups_7d,
            active_users_7d: basic.active_users_7d,
            newsletter_subscribers: basic.newsletter_subscribers,
            user_distribution: UserDistribution {
                free: basic.free_users,
                builder: basic.builder_users,
                admin: basic.admin_users,
            },
            signup_trend: trend.into_iter().collect(),
            api_usage_by_endpoint: usage.into_iter().collect(),
            total_api_calls_7d,
            popular_downloads: downloads
                .into_iter()
                .map(|(file, count)| DownloadCount { file, count })
                .collect(),
            total_downloads_7d,
            recent_signups,
            recent_admin_actions,
        },
        generated_at: Utc::now(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/users",
            get(list_users).put(update_user).delete(delete_user),
        )
        .route("/stats", get(stats))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}
