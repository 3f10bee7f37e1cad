use anyhow::Context;
use axum::http::{HeaderName, Method};
use std::sync::Arc;
use stride_server::{config::Config, db, routes, AppState};
use stride_shared::constants::APP_NAME;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stride_server=info".into()),
        )
        .init();

    let config = Config::from_env();

    let pool = db::init_pool(&config.database_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_path))?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", config.upload_dir))?;

    let state = Arc::new(AppState::new(pool, config.clone()));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("cookie"),
            HeaderName::from_static("authorization"),
        ])
        .allow_credentials(true);

    let app = routes::build_router(state).layer(ServiceBuilder::new().layer(cors));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("{} server running on {}", APP_NAME, addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
