use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &sheetbridge::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    if cfg.api_key.is_empty() {
        return Err("SHEETBRIDGE_API_KEY must be set".into());
    }

    info!(
        database_url = %cfg.database_url,
        listen = %cfg.listen,
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
        backup_folder = %cfg.backup_folder_name
    );

    let pool = sheetbridge::db::connect(&cfg.database_url).await?;

    let google = Arc::new(sheetbridge::GoogleApiClient::new(cfg.proxy.clone()));
    let http = google.http();
    let state = sheetbridge::router::BridgeState::new(
        pool,
        google,
        http,
        Arc::from(cfg.api_key.as_str()),
        cfg.backup_folder_name.clone(),
    );
    let app = sheetbridge::router::bridge_router(state);

    let listener = TcpListener::bind(cfg.listen.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen);
    axum::serve(listener, app).await?;
    Ok(())
}
