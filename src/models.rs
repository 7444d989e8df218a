//! Data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StationError;
use crate::normalize::{to_flag, to_float64, to_int, to_string};

/// GeoJSON point, coordinates in `[longitude, latitude]` order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct GeoPoint {
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// One railway station as published by the feed
///
/// `business_id` is the feed's stable identifier and the only upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StationRecord {
    pub business_id: i64,
    pub code: i64,
    pub name: String,
    /// Short name in the local script (`th_short`)
    pub short_name_local: String,
    /// Short name in latin script (`en_short`)
    pub short_name_foreign: String,
    /// Full name in latin script (`en_name`)
    pub name_foreign: String,
    /// Alternate name (`chname`)
    pub name_alt: String,
    pub control_division: i64,
    pub exact_km: i64,
    pub exact_distance: i64,
    /// Legacy kilometre marker
    pub km: i64,
    pub class_level: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
    pub has_giveway: bool,
    pub is_dual_track: bool,
    pub comment: String,
    /// Absent when both coordinates are zero; such records are never
    /// returned by nearest queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_point: Option<GeoPoint>,
}

impl StationRecord {
    /// Build a record from one raw feed object.
    ///
    /// Never fails: missing or malformed fields become zero or empty.
    pub fn from_raw(raw: &Value) -> Self {
        let field = |key: &str| raw.get(key).unwrap_or(&Value::Null);

        let mut record = StationRecord {
            business_id: to_int(field("id")),
            code: to_int(field("station_code")),
            name: to_string(field("name")),
            short_name_local: to_string(field("th_short")),
            short_name_foreign: to_string(field("en_short")),
            name_foreign: to_string(field("en_name")),
            name_alt: to_string(field("chname")),
            control_division: to_int(field("controldivision")),
            exact_km: to_int(field("exact_km")),
            exact_distance: to_int(field("exact_distance")),
            km: to_int(field("km")),
            class_level: to_int(field("class")),
            latitude: to_float64(field("lat")),
            longitude: to_float64(field("long")),
            is_active: to_flag(field("active")),
            has_giveway: to_flag(field("giveway")),
            is_dual_track: to_flag(field("dual_track")),
            comment: to_string(field("comment")),
            geo_point: None,
        };

        if record.latitude != 0.0 && record.longitude != 0.0 {
            record.geo_point = Some(GeoPoint::new(record.longitude, record.latitude));
        }

        record
    }

    pub fn has_geo_point(&self) -> bool {
        self.geo_point.is_some()
    }
}

/// Decode a feed body: a JSON array of loosely-typed station objects.
///
/// Only a body that is not JSON, or not an array, is an error.
pub fn decode_stations(body: &[u8]) -> Result<Vec<StationRecord>, StationError> {
    let raw: Vec<Value> = serde_json::from_slice(body)?;
    Ok(raw.iter().map(StationRecord::from_raw).collect())
}

/// A record as held by a store, with its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct StoredStation {
    pub record: StationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A nearest-query match with its distance from the query point
#[derive(Debug, Clone, PartialEq)]
pub struct StationHit {
    pub business_id: i64,
    pub name: String,
    pub name_foreign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: f64,
}

impl StationHit {
    pub fn from_record(record: &StationRecord, distance_meters: f64) -> Self {
        Self {
            business_id: record.business_id,
            name: record.name.clone(),
            name_foreign: record.name_foreign.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            distance_meters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_station() {
        let raw = json!({
            "id": "1,001",
            "station_code": 1001,
            "name": " กรุงเทพ ",
            "en_name": "Bangkok",
            "th_short": "กท.",
            "en_short": "BKK",
            "chname": "曼谷",
            "controldivision": "1",
            "exact_km": 0,
            "exact_distance": "0",
            "km": 0,
            "class": 1.0,
            "lat": "13.75",
            "long": 100.50,
            "active": 1,
            "giveway": "0",
            "dual_track": true,
            "comment": null
        });

        let station = StationRecord::from_raw(&raw);
        let expected = StationRecord {
            business_id: 1001,
            code: 1001,
            name: "กรุงเทพ".to_string(),
            short_name_local: "กท.".to_string(),
            short_name_foreign: "BKK".to_string(),
            name_foreign: "Bangkok".to_string(),
            name_alt: "曼谷".to_string(),
            control_division: 1,
            exact_km: 0,
            exact_distance: 0,
            km: 0,
            class_level: 1,
            latitude: 13.75,
            longitude: 100.5,
            is_active: true,
            has_giveway: false,
            is_dual_track: true,
            comment: String::new(),
            geo_point: Some(GeoPoint::new(100.5, 13.75)),
        };

        assert_eq!(station, expected);
        assert_eq!(station.geo_point.unwrap().coordinates, [100.50, 13.75]);
    }

    #[test]
    fn zero_coordinates_have_no_geo_point() {
        let station = StationRecord::from_raw(&json!({"id": 7, "lat": 0, "long": 0}));
        assert_eq!(station.business_id, 7);
        assert!(!station.has_geo_point());
    }

    #[test]
    fn one_zero_coordinate_has_no_geo_point() {
        let station = StationRecord::from_raw(&json!({"id": 8, "lat": 13.75, "long": "n/a"}));
        assert_eq!(station.latitude, 13.75);
        assert_eq!(station.longitude, 0.0);
        assert!(station.geo_point.is_none());
    }

    #[test]
    fn non_object_record_defaults() {
        let station = StationRecord::from_raw(&json!("garbage"));
        assert_eq!(station, StationRecord::default());
    }

    #[test]
    fn geo_point_serializes_as_geojson() {
        let point = GeoPoint::new(100.5, 13.75);
        assert_eq!(
            serde_json::to_value(point).unwrap(),
            json!({"type": "Point", "coordinates": [100.5, 13.75]})
        );
    }

    #[test]
    fn record_without_geo_point_omits_field() {
        let value = serde_json::to_value(StationRecord::default()).unwrap();
        assert!(value.get("geo_point").is_none());
    }

    #[test]
    fn decode_array() {
        let body = br#"[
            {"id": 1, "name": "A", "lat": 13.1, "long": 100.1, "active": 1},
            {"id": 2, "name": "B", "lat": 0, "long": 0, "active": 1},
            {"id": "x"}
        ]"#;
        let stations = decode_stations(body).unwrap();
        assert_eq!(stations.len(), 3);
        assert!(stations[0].has_geo_point());
        assert!(!stations[1].has_geo_point());
        assert_eq!(stations[2].business_id, 0);
    }

    #[test]
    fn decode_rejects_non_array() {
        assert!(matches!(
            decode_stations(br#"{"id": 1}"#),
            Err(StationError::Decode(_))
        ));
        assert!(matches!(
            decode_stations(b"not json"),
            Err(StationError::Decode(_))
        ));
    }
}
