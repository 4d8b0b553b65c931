use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use trades_server::config::ServerConfig;
use trades_server::load;
use trades_server::routes;
use trades_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = ServerConfig::from_env();
    if cfg.api_key.is_empty() {
        tracing::warn!("TDS_API_KEY is empty; only requests with api_key= set to the empty string will pass");
    }

    // The table is loaded once, before the listener binds. A failure here is
    // fatal: the service never serves traffic over partial data.
    let table = match load::load_table(&cfg) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Failed to load trade data from {}: {e}", cfg.data_path.display());
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Loaded {} trades from {} ({:?} mode)",
        table.len(),
        cfg.data_path.display(),
        cfg.ingest_mode,
    );

    let bind = cfg.bind.clone();
    let port = cfg.port;
    let state = AppState::new(cfg, table);

    let app = routes::api_router()
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .expect("invalid bind address");

    tracing::info!("Trade data server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, gracefully stopping…");
}
