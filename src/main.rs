// vidshare API server

use axum::http::{header, HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vidshare::{api::create_router, app_state::AppState, config::Config, error::AppError};

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    if origin == "*" {
        return Ok(CorsLayer::permissive());
    }

    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vidshare=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(?config, "configuration loaded");

    tokio::fs::create_dir_all(&config.server.upload_temp_dir)
        .await
        .map_err(|e| AppError::ConfigurationError(format!("Cannot create upload directory: {}", e)))?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let app = create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origin)?);

    // Start server
    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("vidshare listening on http://{}/api/v1", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
