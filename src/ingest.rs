//! Import of the remote station dataset

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, warn};

use crate::{
    contracts::ImportResult,
    database::StationStore,
    errors::StationError,
    models::decode_stations,
};

/// Fetches a station feed and upserts it into a store
#[derive(Clone)]
pub struct Importer {
    client: Client,
    store: Arc<dyn StationStore>,
}

impl Importer {
    /// `timeout` bounds the whole request, body included
    pub fn new(store: Arc<dyn StationStore>, timeout: Duration) -> Result<Self, StationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StationError::Configuration {
                message: format!("Could not build HTTP client: {e}"),
            })?;

        Ok(Self { client, store })
    }

    /// Fetch, decode and upsert the dataset at `url`.
    ///
    /// Fetch, read and decode failures are errors. A failed upsert is not:
    /// it comes back as `success: false` with the store's message, and any
    /// records already written stay written.
    pub async fn import_from_url(&self, url: &str) -> Result<ImportResult, StationError> {
        info!("Importing stations from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StationError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StationError::Fetch {
                url: url.to_string(),
                message: format!("unexpected status code: {}", status.as_u16()),
            });
        }

        let body = response.bytes().await.map_err(StationError::Read)?;
        let stations = decode_stations(&body)?;
        let invalid_coordinates = stations.iter().filter(|s| !s.has_geo_point()).count();

        info!(
            "Decoded {} stations from {} bytes, {} without coordinates",
            stations.len(),
            body.len(),
            invalid_coordinates
        );
        if invalid_coordinates > 0 {
            warn!(
                "{} stations have no coordinates and will not appear in nearest queries",
                invalid_coordinates
            );
        }

        match self.store.upsert_many(&stations).await {
            Ok(summary) => {
                info!(
                    "Successfully processed {} stations: {} inserted, {} updated",
                    stations.len(),
                    summary.inserted,
                    summary.updated
                );
                Ok(ImportResult {
                    success: true,
                    imported_count: stations.len(),
                    invalid_coordinates,
                    message: "Import completed successfully".to_string(),
                })
            }
            Err(e) => {
                error!("Station upsert failed: {}", e);
                Ok(ImportResult {
                    success: false,
                    imported_count: 0,
                    invalid_coordinates,
                    message: e.to_string(),
                })
            }
        }
    }
}
