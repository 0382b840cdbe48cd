use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voidseo_backend::config::CorsConfig;
use voidseo_backend::{
    build_router, AppState, Config, Gate, IdentityClient, MemberStore, MemoryRateLimitStore,
    PaaClient, StorageClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. Identity and storage settings are required \
             (VOIDSEO__IDENTITY__BASE_URL, VOIDSEO__IDENTITY__API_KEY, VOIDSEO__STORAGE__BASE_URL) \
             via environment or config.toml",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VoidSEO membership API");

    // Initialize components
    let identity = Arc::new(IdentityClient::new(
        &config.identity.base_url,
        &config.identity.api_key,
        config.identity.service_role_key.as_deref(),
        Duration::from_secs(config.identity.timeout_secs),
    )?);
    let store = Arc::new(MemberStore::new(&config.database.url)?);
    tracing::info!("Member store ready at {}", config.database.url);

    let storage = StorageClient::new(
        &config.storage.base_url,
        &config.storage.bucket,
        config.identity.service_key(),
        Duration::from_secs(config.storage.timeout_secs),
    )?;
    let paa = PaaClient::new(
        &config.paa.base_url,
        Duration::from_secs(config.paa.timeout_secs),
    )?;

    let rate_limiter = Arc::new(MemoryRateLimitStore::new());
    let gate = Gate::new(identity.clone(), store.clone(), rate_limiter);

    let state = Arc::new(AppState {
        config: config.clone(),
        identity,
        store,
        storage,
        paa,
        gate,
    });

    // Build router
    let app = build_router(state)
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors.origins.trim() == "*" {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors
            .origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
