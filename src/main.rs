//! Postbox application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Connect to Redis and verify it answers
//! 3. Wire the auth and address services over the Redis stores
//! 4. Build router with API routes, CORS, request tracing and security headers
//! 5. Start Axum server

use axum::http::{header, HeaderValue, Method};
use postbox::{
    auth::{csrf::CSRF_HEADER, AppState, CredentialHasher},
    config::Config,
    middleware::security_headers,
    routes,
    storage::{address::RedisAddressStore, user::RedisUserDirectory},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting postbox on {}", config.bind_addr);

    // Connect to Redis
    let redis_client = redis::Client::open(config.redis_url.as_str()).expect("Invalid Redis URL");

    // Verify Redis connection
    let mut con = redis_client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");
    let _: String = redis::cmd("PING")
        .query_async(&mut con)
        .await
        .expect("Redis did not answer PING");

    // Build shared state
    let state = AppState::new(
        Arc::new(RedisUserDirectory::new(redis_client.clone())),
        Arc::new(RedisAddressStore::new(redis_client)),
        CredentialHasher::new(),
        config.jwt_secret.as_bytes(),
    );

    // Explicit CORS: exactly one front-end origin, with cookies
    let origin: HeaderValue = config
        .allowed_origin
        .parse()
        .expect("ALLOWED_ORIGIN is not a valid header value");
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static(CSRF_HEADER),
        ]);

    let app = routes::api_router(&state)
        .layer(axum::extract::DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
