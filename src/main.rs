//! Station locator service

use station_locator::{
    config::AppConfig,
    database::{open_store, GEO_INDEX_NAME},
    errors::StationError,
    http::{router, AppState},
    ingest::Importer,
    query::StationQueries,
    shutdown::Shutdown,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), StationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    #[cfg(feature = "dotenv")]
    if let Err(e) = dotenvy::dotenv() {
        warn!(".env file not loaded, using environment variables: {}", e);
    }

    let config = AppConfig::load()?;
    config.validate()?;
    let shutdown = Shutdown::install()?;

    let store = open_store(&config.database).await?;

    // Without the index nearest queries cannot run, so do not start
    if let Err(e) = store.ensure_geo_index().await {
        error!("Failed to create geo index: {}", e);
        store.close().await;
        return Err(e);
    }
    info!("Station index {} ready", GEO_INDEX_NAME);

    let state = AppState {
        importer: Importer::new(store.clone(), config.import.timeout)?,
        queries: StationQueries::new(store.clone()),
    };

    if config.server.api_key.is_none() {
        warn!("No API key configured, /api is open");
    }
    let app = router(state, config.server.api_key.clone());

    let addr = config.server.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server starting on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            info!("Received {}, shutting down", shutdown.recv().await);
        })
        .await;

    store.close().await;
    info!("Server stopped");

    served.map_err(StationError::from)
}
