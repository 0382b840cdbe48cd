pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod models;
pub mod paa;
pub mod rate_limit;
pub mod resources;
pub mod routes;
pub mod storage;
pub mod store;
pub mod test_util;
pub mod usage;

pub use auth::{IdentityClient, Session, SessionUser, SignIn};
pub use config::Config;
pub use error::GateError;
pub use gate::Gate;
pub use models::{AuditEntry, DownloadLog, Profile, ProfileUpdate, Tier, UsageDecision};
pub use paa::PaaClient;
pub use rate_limit::{MemoryRateLimitStore, RateLimitPolicy, RateLimitStore};
pub use storage::StorageClient;
pub use store::MemberStore;
pub use usage::UsageLedger;

use axum::middleware;
use axum::Router;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: Arc<IdentityClient>,
    pub store: Arc<MemberStore>,
    pub storage: StorageClient,
    pub paa: PaaClient,
    pub gate: Gate,
}

/// Assemble the full route tree on top of `state`.
///
/// Used by `main` and by the integration tests, so both exercise the
/// same middleware ordering.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router(state.clone()))
        .merge(routes::download::router(state.clone()))
        .merge(routes::paa::router(state.clone()))
        .nest("/admin", routes::admin::router(state))
        .layer(middleware::from_fn(logging::request_logger))
}
