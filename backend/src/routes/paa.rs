//! PAA explorer route.
//!
//! Free-tier callers burn quota and get the demo dataset; builder and
//! admin callers get the live search service. Usage is recorded after the
//! payload is ready, never for rejected requests.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use super::parse_body;
use crate::error::GateError;
use crate::models::Tier;
use crate::paa::demo_results;
use crate::AppState;

const ENDPOINT: &str = "paa-explorer";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PaaRequest {
    query: Option<String>,
    location: Option<String>,
    language: Option<String>,
}

#[derive(Serialize)]
struct QuotaBlock {
    used: u64,
    limit: u64,
    remaining: u64,
}

#[derive(Serialize)]
struct PaaResponse {
    success: bool,
    data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota: Option<QuotaBlock>,
    demo_mode: bool,
}

async fn paa_explorer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<PaaResponse>, GateError> {
    let profile = state.gate.authenticate(&headers).await?;

    let limit = state.config.limits.paa_daily_limit;
    let window_hours = state.config.limits.paa_window_hours;
    let decision = state
        .gate
        .check_quota(&profile, ENDPOINT, limit, window_hours)
        .await?;

    let body: PaaRequest = parse_body(body)?;
    let query = body
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| GateError::Validation("Query parameter is required".to_string()))?;
    let location = body.location.unwrap_or_else(|| "United States".to_string());
    let language = body.language.unwrap_or_else(|| "en".to_string());

    if profile.role == Tier::Free {
        let data = demo_results(&query, &location, &language);
        state.gate.record_usage(
            &profile.id,
            ENDPOINT,
            json!({
                "query": query,
                "location": location,
                "language": language,
                "demo_mode": true,
            }),
        );

        return Ok(Json(PaaResponse {
            success: true,
            data,
            quota: Some(QuotaBlock {
                used: decision.used + 1,
                limit: decision.limit,
                remaining: decision.remaining.saturating_sub(1),
            }),
            demo_mode: true,
        }));
    }

    // Builder and admin get the live path
    let started = Instant::now();
    let questions = state
        .paa
        .search(&query, &location, &language)
        .await
        .map_err(|e| GateError::Dependency(e.to_string()))?;
    let total_questions = questions.len();

    let data = json!({
        "query": query,
        "location": location,
        "language": language,
        "questions": questions,
        "metadata": {
            "total_questions": total_questions,
            "processing_time": format!("{:.1}s", started.elapsed().as_secs_f64()),
            "data_source": "live",
            "tier": profile.role,
        },
    });

    state.gate.record_usage(
        &profile.id,
        ENDPOINT,
        json!({
            "query": query,
            "location": location,
            "language": language,
            "live_mode": true,
            "questions_found": total_questions,
        }),
    );

    Ok(Json(PaaResponse {
        success: true,
        data,
        quota: None,
        demo_mode: false,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/protected/paa-explorer", post(paa_explorer))
        .with_state(state)
}
