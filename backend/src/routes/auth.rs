//! Credential routes: login, signup, logout.
//!
//! Login and signup are the only unauthenticated writes in the API, so
//! both sit behind per-IP fixed-window limits that are checked before
//! anything else, validation included.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::parse_body;
use crate::auth::{bearer_token, Session};
use crate::config::LimitsConfig;
use crate::error::GateError;
use crate::logging::client_ip;
use crate::models::{Profile, Tier};
use crate::rate_limit::RateLimitPolicy;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SignupRequest {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    newsletter_opt_in: bool,
}

#[derive(Serialize)]
struct LoginUser {
    id: String,
    email: String,
    role: Tier,
    name: Option<String>,
    newsletter_opt_in: bool,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    user: LoginUser,
    session: Session,
}

#[derive(Serialize)]
struct SignupUser {
    id: String,
    email: String,
    email_confirmed: bool,
}

#[derive(Serialize)]
struct SignupResponse {
    message: &'static str,
    user: SignupUser,
}

#[derive(Serialize)]
struct LogoutResponse {
    message: &'static str,
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<LoginResponse>, GateError> {
    let ip = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    state
        .gate
        .check_rate(
            "login",
            &ip,
            &login_policy(&state.config.limits),
            "Too many login attempts. Please try again later.",
        )
        .await?;

    let body: LoginRequest = parse_body(body)?;
    let (Some(email), Some(password)) = (
        body.email.filter(|v| !v.is_empty()),
        body.password.filter(|v| !v.is_empty()),
    ) else {
        return Err(GateError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    let email = email.trim().to_lowercase();
    let signin = state.identity.sign_in(&email, &password).await?;

    // Record the login before the approval check so rejected-but-valid
    // credentials still show up as account activity.
    if let Err(e) = state.store.touch_last_login(&signin.user.id) {
        tracing::warn!("Failed to update last login for {}: {}", signin.user.id, e);
    }

    let profile = state
        .store
        .get_profile(&signin.user.id)?
        .ok_or(GateError::ProfileMissing)?;
    if !profile.is_approved {
        return Err(GateError::NotApproved);
    }

    tracing::info!("User login: {}", email);

    Ok(Json(LoginResponse {
        message: "Login successful",
        user: LoginUser {
            id: profile.id,
            email: profile.email,
            role: profile.role,
            name: profile.name,
            newsletter_opt_in: profile.newsletter_opt_in,
        },
        session: signin.session,
    }))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SignupResponse>, GateError> {
    let ip = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    state
        .gate
        .check_rate(
            "signup",
            &ip,
            &signup_policy(&state.config.limits),
            "Rate limit exceeded",
        )
        .await?;

    let body: SignupRequest = parse_body(body)?;
    let (Some(email), Some(password)) = (
        body.email.filter(|v| !v.is_empty()),
        body.password.filter(|v| !v.is_empty()),
    ) else {
        return Err(GateError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    if password.len() < 8 {
        return Err(GateError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let email = email.trim().to_lowercase();
    if !valid_email(&email) {
        return Err(GateError::Validation("Invalid email format".to_string()));
    }

    if state.store.get_profile_by_email(&email)?.is_some() {
        return Err(GateError::Validation("User already exists".to_string()));
    }

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let identity_user = state
        .identity
        .sign_up(
            &email,
            &password,
            json!({ "name": name, "newsletter_opt_in": body.newsletter_opt_in }),
        )
        .await?;

    let profile = Profile::new(
        &identity_user.id,
        &email,
        Some(name),
        body.newsletter_opt_in,
        !state.config.signup.require_approval,
    );
    state.store.insert_profile(&profile)?;

    tracing::info!("New user signup: {}", email);

    Ok(Json(SignupResponse {
        message: "User created successfully",
        user: SignupUser {
            id: identity_user.id,
            email,
            email_confirmed: identity_user.email_confirmed_at.is_some(),
        },
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, GateError> {
    let token = bearer_token(&headers)?;

    // Revocation is best effort; the client drops the token either way
    if let Err(e) = state.identity.sign_out(token).await {
        tracing::warn!("Session revocation failed: {}", e);
    }

    Ok(Json(LogoutResponse {
        message: "Signed out",
    }))
}

fn login_policy(limits: &LimitsConfig) -> RateLimitPolicy {
    RateLimitPolicy {
        window: Duration::from_secs(limits.login_window_secs),
        max_requests: limits.login_max_attempts,
        max_keys: limits.max_tracked_keys,
    }
}

fn signup_policy(limits: &LimitsConfig) -> RateLimitPolicy {
    RateLimitPolicy {
        window: Duration::from_secs(limits.signup_window_secs),
        max_requests: limits.signup_max_attempts,
        max_keys: limits.max_tracked_keys,
    }
}

/// Same acceptance rule as the signup form: one `@`, no whitespace, and a
/// dot somewhere in the domain.
fn valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/logout", post(logout))
        .with_state(state)
}
