use rust_lead_cockpit::config::Config;
use rust_lead_cockpit::handlers::AppState;
use rust_lead_cockpit::routes::build_router;
use rust_lead_cockpit::store::RecordStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, configuration and the record store, then serves the
/// view and webhook routes.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_cockpit=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let store = RecordStore::connect(&config).await?;
    tracing::info!("Record store ready ({})", store.backend_name());

    tracing::info!(
        "Snapshot slots: {} org(s) max, {}s idle eviction",
        config.snapshot_max_orgs,
        config.snapshot_idle.as_secs()
    );
    let app_state = Arc::new(AppState::new(config.clone(), store));

    let app = build_router(app_state, true)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
