// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::models::{GeoPoint, StationHit, StationRecord, StoredStation};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StationHitRow {
    business_id: i64,
    name: String,
    name_foreign: String,
    latitude: f64,
    longitude: f64,
    distance_meters: f64,
}

impl From<StationHitRow> for StationHit {
    fn from(row: StationHitRow) -> Self {
        StationHit {
            business_id: row.business_id,
            name: row.name,
            name_foreign: row.name_foreign,
            latitude: row.latitude,
            longitude: row.longitude,
            distance_meters: row.distance_meters,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StationRow {
    business_id: i64,
    code: i64,
    name: String,
    short_name_local: String,
    short_name_foreign: String,
    name_foreign: String,
    name_alt: String,
    control_division: i64,
    exact_km: i64,
    exact_distance: i64,
    km: i64,
    class_level: i64,
    latitude: f64,
    longitude: f64,
    is_active: bool,
    has_giveway: bool,
    is_dual_track: bool,
    comment: String,
    geo_longitude: Option<f64>, // ST_X of geo_point
    geo_latitude: Option<f64>,  // ST_Y of geo_point
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StationRow> for StoredStation {
    fn from(row: StationRow) -> Self {
        let geo_point = match (row.geo_longitude, row.geo_latitude) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)),
            _ => None,
        };

        StoredStation {
            record: StationRecord {
                business_id: row.business_id,
                code: row.code,
                name: row.name,
                short_name_local: row.short_name_local,
                short_name_foreign: row.short_name_foreign,
                name_foreign: row.name_foreign,
                name_alt: row.name_alt,
                control_division: row.control_division,
                exact_km: row.exact_km,
                exact_distance: row.exact_distance,
                km: row.km,
                class_level: row.class_level,
                latitude: row.latitude,
                longitude: row.longitude,
                is_active: row.is_active,
                has_giveway: row.has_giveway,
                is_dual_track: row.is_dual_track,
                comment: row.comment,
                geo_point,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
