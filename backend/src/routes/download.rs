//! Gated download route. The response carries a signed URL; file bytes
//! never pass through this service.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GateError;
use crate::logging::{client_ip, user_agent};
use crate::models::DownloadLog;
use crate::storage::StorageError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    file: Option<String>,
}

#[derive(Serialize)]
struct DownloadResponse {
    success: bool,
    download_url: String,
    file_name: String,
    expires_in: u64,
    message: &'static str,
}

async fn download(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<DownloadResponse>, GateError> {
    let profile = state.gate.authenticate(&headers).await?;

    let file = query
        .file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| GateError::Validation("File parameter is required".to_string()))?;

    state.gate.authorize_file(&profile, &file)?;

    let expires_in = state.config.storage.signed_url_expiry_secs;
    let download_url = match state.storage.sign_url(&file, expires_in).await {
        Ok(url) => url,
        Err(StorageError::NotFound(_)) => {
            // Listed in the access table but missing from the bucket
            return Err(GateError::NotFound("File not found".to_string()));
        }
        Err(e) => {
            return Err(GateError::Internal(format!(
                "Signed URL generation failed: {}",
                e
            )));
        }
    };

    tracing::info!("Download granted: {} for user {}", file, profile.id);

    state.gate.log_download(DownloadLog::new(
        &profile.id,
        &file,
        client_ip(&headers),
        user_agent(&headers),
    ));

    Ok(Json(DownloadResponse {
        success: true,
        download_url,
        file_name: file,
        expires_in,
        message: "Download link generated successfully",
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/protected/download", get(download))
        .with_state(state)
}
