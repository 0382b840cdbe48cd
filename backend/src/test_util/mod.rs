//! Shared helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    Config, CorsConfig, DatabaseConfig, IdentityConfig, LimitsConfig, LoggingConfig, PaaConfig,
    ServerConfig, SignupConfig, StorageConfig,
};
use crate::rate_limit::MemoryRateLimitStore;
use crate::{AppState, Gate, IdentityClient, MemberStore, PaaClient, StorageClient};

/// Config pointing at the given backends, with production limit defaults.
pub fn test_config(
    identity_url: &str,
    storage_url: &str,
    paa_url: &str,
    database_url: &str,
) -> Config {
    Config {
        server: ServerConfig::default(),
        identity: IdentityConfig {
            base_url: identity_url.to_string(),
            api_key: "test-anon-key".to_string(),
            service_role_key: Some("test-service-key".to_string()),
            timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
        },
        storage: StorageConfig {
            base_url: storage_url.to_string(),
            bucket: "downloads".to_string(),
            signed_url_expiry_secs: 600,
            timeout_secs: 5,
        },
        paa: PaaConfig {
            base_url: paa_url.to_string(),
            timeout_secs: 5,
        },
        signup: SignupConfig {
            require_approval: false,
        },
        limits: LimitsConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
    }
}

pub fn create_test_state(config: Config) -> Arc<AppState> {
    let identity = Arc::new(
        IdentityClient::new(
            &config.identity.base_url,
            &config.identity.api_key,
            config.identity.service_role_key.as_deref(),
            Duration::from_secs(config.identity.timeout_secs),
        )
        .unwrap(),
    );
    let store = Arc::new(MemberStore::new(&config.database.url).unwrap());
    let storage = StorageClient::new(
        &config.storage.base_url,
        &config.storage.bucket,
        config.identity.service_key(),
        Duration::from_secs(config.storage.timeout_secs),
    )
    .unwrap();
    let paa = PaaClient::new(
        &config.paa.base_url,
        Duration::from_secs(config.paa.timeout_secs),
    )
    .unwrap();
    let rate_limiter = Arc::new(MemoryRateLimitStore::new());
    let gate = Gate::new(identity.clone(), store.clone(), rate_limiter);

    Arc::new(AppState {
        config,
        identity,
        store,
        storage,
        paa,
        gate,
    })
}
