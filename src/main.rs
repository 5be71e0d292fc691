//! stampd application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build the session store (memory or Redis) and its expiry mechanism
//! 3. Build the Idena client and the provider registry
//! 4. Build router with API routes, tracing and CORS layers
//! 5. Start Axum server

use axum::http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use stampd::{
    cleanup,
    clock::SystemClock,
    config::{Config, SessionBackend},
    idena::{HttpIdenaApi, IdenaSignIn},
    providers::{LensProvider, ProviderRegistry},
    routes::{self, AppState},
    storage::{ExpiryMode, MemorySessionStore, RedisSessionStore, SessionStore},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

fn session_store(config: &Config) -> Arc<dyn SessionStore> {
    match config.session_backend {
        SessionBackend::Memory => {
            let store = MemorySessionStore::new(
                Duration::from_secs(config.session_ttl_secs),
                Arc::new(SystemClock),
                config.session_expiry_mode,
            );
            if store.mode() == ExpiryMode::Sweep {
                tokio::spawn(cleanup::run_sweep_loop(
                    store.clone(),
                    Duration::from_secs(config.sweep_interval_secs),
                ));
            }
            tracing::info!(mode = ?store.mode(), "Using in-memory session store");
            Arc::new(store)
        }
        SessionBackend::Redis => {
            let redis_url = config.redis_url.as_deref().expect("REDIS_URL checked by config");
            let client = redis::Client::open(redis_url).expect("Invalid Redis URL");
            tracing::info!("Using Redis session store");
            Arc::new(RedisSessionStore::new(client, config.session_ttl_secs))
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    // No configured origins: CorsLayer::new() rejects all cross-origin requests.
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(config = ?config, "Starting stampd on {}", config.bind_addr);

    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);

    let idena_api = HttpIdenaApi::new(config.idena_api_url.clone(), upstream_timeout)
        .expect("Failed to create Idena API client");
    let signin = IdenaSignIn::new(session_store(&config), Arc::new(idena_api));

    let lens = LensProvider::new(
        config.lens_subgraphs.clone(),
        Duration::from_secs(config.lens_min_token_age_secs),
        upstream_timeout,
        Arc::new(SystemClock),
    )
    .expect("Failed to create Lens provider");
    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(lens));

    // Build shared state
    let state = AppState {
        signin: Arc::new(signin),
        providers: Arc::new(providers),
    };

    let app = routes::api_router()
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
