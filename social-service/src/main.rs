use service_core::observability::logging::init_tracing;
use social_service::{
    build_router,
    config::{SocialConfig, StoreBackend},
    services::{
        init_metrics, ClerkApi, CloudinaryProvider, HttpClerkClient, ImageHost, InMemoryStore,
        LinkOnlyImageHost, MongoDb, SocialStore,
    },
    AppState,
};
use service_core::middleware::spawn_rate_limit_pruner;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    let config = SocialConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting social service"
    );

    let store: Arc<dyn SocialStore> = match config.store {
        StoreBackend::Mongo => {
            tracing::info!("Initializing database connection");
            let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
            db.initialize_indexes().await?;
            tracing::info!("Database initialized successfully");
            Arc::new(db)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let clerk: Arc<dyn ClerkApi> = Arc::new(HttpClerkClient::new(&config.clerk));
    if !clerk.is_enabled() {
        tracing::info!("CLERK_SECRET_KEY not set; Clerk user sync is disabled");
    }

    let images: Arc<dyn ImageHost> = if config.cloudinary.enabled {
        tracing::info!(cloud = %config.cloudinary.cloud_name, "Cloudinary image hosting enabled");
        Arc::new(CloudinaryProvider::new(config.cloudinary.clone()))
    } else {
        tracing::info!("Cloudinary not configured; only image URLs are accepted");
        Arc::new(LinkOnlyImageHost)
    };

    let state = AppState::new(config.clone(), store, clerk, images)?;
    spawn_rate_limit_pruner(
        state.ip_rate_limiter.clone(),
        Duration::from_secs(config.rate_limit.window_seconds.max(60)),
    );
    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
