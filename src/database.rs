//! Station storage with a spherical nearest-neighbor capability.
//!
//! The pipeline and the query engine only see [`StationStore`]. Two
//! implementations exist: [`postgres::PgStore`] on PostGIS and
//! [`memory::MemoryStore`] held in process.

pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    config::DatabaseConfig,
    errors::StationError,
    models::{GeoPoint, StationHit, StationRecord, StoredStation},
};

/// Name of the spatial index over `geo_point`
pub const GEO_INDEX_NAME: &str = "stations_geo_point_2dsphere";

/// Counts reported by a bulk upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// A window of the distance ordering and the ordering's full length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestPage {
    pub hits: Vec<StationHit>,
    pub total: u64,
}

/// One keyed upsert of a station.
///
/// `created_at` is written only when the key is absent, every other field
/// (and `updated_at`) is always overwritten. Both stores go through this.
#[derive(Debug, Clone, Copy)]
pub struct StationUpsert<'a> {
    pub record: &'a StationRecord,
    pub now: DateTime<Utc>,
}

impl<'a> StationUpsert<'a> {
    pub fn new(record: &'a StationRecord, now: DateTime<Utc>) -> Self {
        Self { record, now }
    }

    pub fn key(&self) -> i64 {
        self.record.business_id
    }

    /// Fields set only on insert
    pub fn created_at(&self) -> DateTime<Utc> {
        self.now
    }

    /// Apply onto the current stored state, if any
    pub fn apply(&self, existing: Option<&StoredStation>) -> StoredStation {
        StoredStation {
            record: self.record.clone(),
            created_at: existing.map_or_else(|| self.created_at(), |s| s.created_at),
            updated_at: self.now,
        }
    }
}

#[async_trait]
pub trait StationStore: Send + Sync {
    /// Create the spatial index if missing. Idempotent.
    async fn ensure_geo_index(&self) -> Result<(), StationError>;

    /// Upsert every record by `business_id`, unordered: a failing record
    /// does not stop the others.
    async fn upsert_many(&self, records: &[StationRecord]) -> Result<UpsertSummary, StationError>;

    /// Up to `limit` active records with a geo point, nearest first,
    /// optionally bounded by `max_distance_meters`.
    async fn nearest(
        &self,
        point: GeoPoint,
        max_distance_meters: Option<f64>,
        limit: u64,
    ) -> Result<Vec<StationHit>, StationError>;

    /// The `[skip, skip + take)` window of the same ordering, unbounded,
    /// and the size of that ordering, both read from one snapshot.
    async fn nearest_page(
        &self,
        point: GeoPoint,
        skip: u64,
        take: u64,
    ) -> Result<NearestPage, StationError>;

    /// Release connections. The store is unusable afterwards.
    async fn close(&self);
}

/// Open the store named by the configured URL
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn StationStore>, StationError> {
    if config.url.starts_with("memory:") {
        info!("Using in-process station store");
        return Ok(Arc::new(memory::MemoryStore::new()));
    }

    let store = postgres::PgStore::connect(config).await?;
    Ok(Arc::new(store))
}
