// src/database/postgres.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{error, info, warn};

use super::{
    models::{StationHitRow, StationRow},
    NearestPage, StationStore, StationUpsert, UpsertSummary, GEO_INDEX_NAME,
};
use crate::{
    config::DatabaseConfig,
    errors::StationError,
    models::{GeoPoint, StationHit, StationRecord, StoredStation},
};

/// Query point as a spherical geography, longitude first
const ORIGIN: &str = "ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography";

/// Records per multi-row upsert statement
const UPSERT_CHUNK_SIZE: usize = 500;

/// A chunk of records laid out column by column for `UNNEST`
#[derive(Debug, Default, PartialEq)]
struct StationColumns {
    business_id: Vec<i64>,
    code: Vec<i64>,
    name: Vec<String>,
    short_name_local: Vec<String>,
    short_name_foreign: Vec<String>,
    name_foreign: Vec<String>,
    name_alt: Vec<String>,
    control_division: Vec<i64>,
    exact_km: Vec<i64>,
    exact_distance: Vec<i64>,
    km: Vec<i64>,
    class_level: Vec<i64>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    is_active: Vec<bool>,
    has_giveway: Vec<bool>,
    is_dual_track: Vec<bool>,
    comment: Vec<String>,
    geo_longitude: Vec<Option<f64>>,
    geo_latitude: Vec<Option<f64>>,
}

impl StationColumns {
    fn from_records(records: &[StationRecord]) -> Self {
        let mut columns = Self::default();
        for record in records {
            columns.business_id.push(record.business_id);
            columns.code.push(record.code);
            columns.name.push(record.name.clone());
            columns.short_name_local.push(record.short_name_local.clone());
            columns.short_name_foreign.push(record.short_name_foreign.clone());
            columns.name_foreign.push(record.name_foreign.clone());
            columns.name_alt.push(record.name_alt.clone());
            columns.control_division.push(record.control_division);
            columns.exact_km.push(record.exact_km);
            columns.exact_distance.push(record.exact_distance);
            columns.km.push(record.km);
            columns.class_level.push(record.class_level);
            columns.latitude.push(record.latitude);
            columns.longitude.push(record.longitude);
            columns.is_active.push(record.is_active);
            columns.has_giveway.push(record.has_giveway);
            columns.is_dual_track.push(record.is_dual_track);
            columns.comment.push(record.comment.clone());
            columns.geo_longitude.push(record.geo_point.map(|p| p.longitude()));
            columns.geo_latitude.push(record.geo_point.map(|p| p.latitude()));
        }
        columns
    }
}

/// Station store on PostgreSQL with PostGIS
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the `stations` table exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StationError> {
        info!(
            "Connecting to station database: max_connections={}, timeout={:?}",
            config.max_connections, config.connect_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                e
            })?;

        Self::new(pool).await
    }

    /// Wrap an existing pool
    pub async fn new(pool: PgPool) -> Result<Self, StationError> {
        Self::create_table(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_table(pool: &PgPool) -> Result<(), StationError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS stations (
                business_id BIGINT PRIMARY KEY,
                code BIGINT NOT NULL,
                name TEXT NOT NULL,
                short_name_local TEXT NOT NULL,
                short_name_foreign TEXT NOT NULL,
                name_foreign TEXT NOT NULL,
                name_alt TEXT NOT NULL,
                control_division BIGINT NOT NULL,
                exact_km BIGINT NOT NULL,
                exact_distance BIGINT NOT NULL,
                km BIGINT NOT NULL,
                class_level BIGINT NOT NULL,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                is_active BOOLEAN NOT NULL,
                has_giveway BOOLEAN NOT NULL,
                is_dual_track BOOLEAN NOT NULL,
                comment TEXT NOT NULL,
                geo_point geography(Point, 4326),
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(pool)
        .await
        .map_err(|e| StationError::Store(format!("Failed to create table stations: {e}")))?;

        Ok(())
    }

    /// Upsert a chunk in one statement, one `inserted` flag per row.
    ///
    /// Fails as a whole, for example when a key repeats inside the chunk.
    async fn upsert_chunk(
        &self,
        chunk: &[StationRecord],
        now: DateTime<Utc>,
    ) -> Result<Vec<bool>, sqlx::Error> {
        let columns = StationColumns::from_records(chunk);

        sqlx::query_scalar(
            "INSERT INTO stations (
                business_id, code, name, short_name_local, short_name_foreign,
                name_foreign, name_alt, control_division, exact_km, exact_distance,
                km, class_level, latitude, longitude, is_active,
                has_giveway, is_dual_track, comment, geo_point, created_at,
                updated_at
            )
            SELECT
                u.business_id, u.code, u.name, u.short_name_local, u.short_name_foreign,
                u.name_foreign, u.name_alt, u.control_division, u.exact_km, u.exact_distance,
                u.km, u.class_level, u.latitude, u.longitude, u.is_active,
                u.has_giveway, u.is_dual_track, u.comment,
                CASE WHEN u.geo_longitude IS NULL OR u.geo_latitude IS NULL THEN NULL
                     ELSE ST_SetSRID(ST_MakePoint(u.geo_longitude, u.geo_latitude), 4326)::geography END,
                $21, $22
            FROM UNNEST(
                $1::bigint[], $2::bigint[], $3::text[], $4::text[], $5::text[],
                $6::text[], $7::text[], $8::bigint[], $9::bigint[], $10::bigint[],
                $11::bigint[], $12::bigint[], $13::float8[], $14::float8[], $15::bool[],
                $16::bool[], $17::bool[], $18::text[], $19::float8[], $20::float8[]
            ) AS u(
                business_id, code, name, short_name_local, short_name_foreign,
                name_foreign, name_alt, control_division, exact_km, exact_distance,
                km, class_level, latitude, longitude, is_active,
                has_giveway, is_dual_track, comment, geo_longitude, geo_latitude
            )
            ON CONFLICT (business_id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                short_name_local = EXCLUDED.short_name_local,
                short_name_foreign = EXCLUDED.short_name_foreign,
                name_foreign = EXCLUDED.name_foreign,
                name_alt = EXCLUDED.name_alt,
                control_division = EXCLUDED.control_division,
                exact_km = EXCLUDED.exact_km,
                exact_distance = EXCLUDED.exact_distance,
                km = EXCLUDED.km,
                class_level = EXCLUDED.class_level,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                is_active = EXCLUDED.is_active,
                has_giveway = EXCLUDED.has_giveway,
                is_dual_track = EXCLUDED.is_dual_track,
                comment = EXCLUDED.comment,
                geo_point = EXCLUDED.geo_point,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted",
        )
        .bind(columns.business_id)
        .bind(columns.code)
        .bind(columns.name)
        .bind(columns.short_name_local)
        .bind(columns.short_name_foreign)
        .bind(columns.name_foreign)
        .bind(columns.name_alt)
        .bind(columns.control_division)
        .bind(columns.exact_km)
        .bind(columns.exact_distance)
        .bind(columns.km)
        .bind(columns.class_level)
        .bind(columns.latitude)
        .bind(columns.longitude)
        .bind(columns.is_active)
        .bind(columns.has_giveway)
        .bind(columns.is_dual_track)
        .bind(columns.comment)
        .bind(columns.geo_longitude)
        .bind(columns.geo_latitude)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Upsert one record, returning true when it was inserted
    async fn upsert_one(&self, upsert: StationUpsert<'_>) -> Result<bool, sqlx::Error> {
        let record = upsert.record;
        let (geo_longitude, geo_latitude) = match record.geo_point {
            Some(point) => (Some(point.longitude()), Some(point.latitude())),
            None => (None, None),
        };

        // created_at only lands through the INSERT branch
        sqlx::query_scalar(
            "INSERT INTO stations (
                business_id, code, name, short_name_local, short_name_foreign,
                name_foreign, name_alt, control_division, exact_km, exact_distance,
                km, class_level, latitude, longitude, is_active,
                has_giveway, is_dual_track, comment, geo_point, created_at,
                updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18,
                CASE WHEN $19::float8 IS NULL OR $20::float8 IS NULL THEN NULL
                     ELSE ST_SetSRID(ST_MakePoint($19, $20), 4326)::geography END,
                $21, $22
            )
            ON CONFLICT (business_id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                short_name_local = EXCLUDED.short_name_local,
                short_name_foreign = EXCLUDED.short_name_foreign,
                name_foreign = EXCLUDED.name_foreign,
                name_alt = EXCLUDED.name_alt,
                control_division = EXCLUDED.control_division,
                exact_km = EXCLUDED.exact_km,
                exact_distance = EXCLUDED.exact_distance,
                km = EXCLUDED.km,
                class_level = EXCLUDED.class_level,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                is_active = EXCLUDED.is_active,
                has_giveway = EXCLUDED.has_giveway,
                is_dual_track = EXCLUDED.is_dual_track,
                comment = EXCLUDED.comment,
                geo_point = EXCLUDED.geo_point,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted",
        )
        .bind(upsert.key())
        .bind(record.code)
        .bind(&record.name)
        .bind(&record.short_name_local)
        .bind(&record.short_name_foreign)
        .bind(&record.name_foreign)
        .bind(&record.name_alt)
        .bind(record.control_division)
        .bind(record.exact_km)
        .bind(record.exact_distance)
        .bind(record.km)
        .bind(record.class_level)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.is_active)
        .bind(record.has_giveway)
        .bind(record.is_dual_track)
        .bind(&record.comment)
        .bind(geo_longitude)
        .bind(geo_latitude)
        .bind(upsert.created_at())
        .bind(upsert.now)
        .fetch_one(&self.pool)
        .await
    }

    /// Stored state of one station
    pub async fn get(&self, business_id: i64) -> Result<Option<StoredStation>, StationError> {
        let row: Option<StationRow> = sqlx::query_as(
            "SELECT
                business_id, code, name, short_name_local, short_name_foreign,
                name_foreign, name_alt, control_division, exact_km, exact_distance,
                km, class_level, latitude, longitude, is_active,
                has_giveway, is_dual_track, comment,
                ST_X(geo_point::geometry) AS geo_longitude,
                ST_Y(geo_point::geometry) AS geo_latitude,
                created_at, updated_at
            FROM stations
            WHERE business_id = $1",
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredStation::from))
    }
}

#[async_trait]
impl StationStore for PgStore {
    async fn ensure_geo_index(&self) -> Result<(), StationError> {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {GEO_INDEX_NAME} ON stations USING GIST (geo_point)"
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StationError::Store(format!("Failed to create index {GEO_INDEX_NAME}: {e}"))
        })?;

        Ok(())
    }

    async fn upsert_many(&self, records: &[StationRecord]) -> Result<UpsertSummary, StationError> {
        let now = Utc::now();
        let mut summary = UpsertSummary::default();
        let mut failed = 0usize;
        let mut first_error = None;

        for chunk in records.chunks(UPSERT_CHUNK_SIZE) {
            match self.upsert_chunk(chunk, now).await {
                Ok(inserted) => {
                    let new_rows = inserted.iter().filter(|&&i| i).count();
                    summary.inserted += new_rows;
                    summary.updated += inserted.len() - new_rows;
                    continue;
                }
                Err(e) => warn!(
                    "Bulk upsert of {} stations failed, retrying one by one: {}",
                    chunk.len(),
                    e
                ),
            }

            for record in chunk {
                match self.upsert_one(StationUpsert::new(record, now)).await {
                    Ok(true) => summary.inserted += 1,
                    Ok(false) => summary.updated += 1,
                    Err(e) => {
                        warn!("Failed to upsert station {}: {}", record.business_id, e);
                        failed += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(StationError::Store(format!(
                "failed to upsert {failed} of {} stations ({} inserted, {} updated): {e}",
                records.len(),
                summary.inserted,
                summary.updated
            )));
        }

        Ok(summary)
    }

    async fn nearest(
        &self,
        point: GeoPoint,
        max_distance_meters: Option<f64>,
        limit: u64,
    ) -> Result<Vec<StationHit>, StationError> {
        let rows: Vec<StationHitRow> = sqlx::query_as(&format!(
            "SELECT
                business_id, name, name_foreign, latitude, longitude,
                ST_Distance(geo_point, {ORIGIN}, false) AS distance_meters
            FROM stations
            WHERE is_active
                AND geo_point IS NOT NULL
                AND ($3::float8 IS NULL OR ST_DWithin(geo_point, {ORIGIN}, $3, false))
            ORDER BY geo_point <-> {ORIGIN}
            LIMIT $4"
        ))
        .bind(point.longitude())
        .bind(point.latitude())
        .bind(max_distance_meters)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StationHit::from).collect())
    }

    async fn nearest_page(
        &self,
        point: GeoPoint,
        skip: u64,
        take: u64,
    ) -> Result<NearestPage, StationError> {
        // Count and window must see the same rows while imports run
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stations WHERE is_active AND geo_point IS NOT NULL",
        )
        .fetch_one(&mut *tx)
        .await?;

        let rows: Vec<StationHitRow> = sqlx::query_as(&format!(
            "SELECT
                business_id, name, name_foreign, latitude, longitude,
                ST_Distance(geo_point, {ORIGIN}, false) AS distance_meters
            FROM stations
            WHERE is_active AND geo_point IS NOT NULL
            ORDER BY geo_point <-> {ORIGIN}
            OFFSET $3
            LIMIT $4"
        ))
        .bind(point.longitude())
        .bind(point.latitude())
        .bind(i64::try_from(skip).unwrap_or(i64::MAX))
        .bind(i64::try_from(take).unwrap_or(i64::MAX))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(NearestPage {
            hits: rows.into_iter().map(StationHit::from).collect(),
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn close(&self) {
        info!("Closing station database pool");
        self.pool.close().await;
    }
}
