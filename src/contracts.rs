//! Request and response shapes exchanged with HTTP callers.

use serde::{Deserialize, Serialize};

use crate::geo::meters_to_km;
use crate::models::StationHit;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportRequest {
    pub url: String,
}

/// Outcome of one import attempt. Store failures land here with
/// `success: false` instead of failing the call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported_count: usize,
    pub invalid_coordinates: usize,
    pub message: String,
}

fn default_limit() -> i64 {
    10
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NearestRequest {
    pub lat: f64,
    pub long: f64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NearestPageRequest {
    pub lat: f64,
    pub long: f64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NearestStation {
    pub id: i64,
    pub name: String,
    pub en_name: String,
    pub lat: f64,
    pub long: f64,
    pub distance_km: f64,
}

impl From<StationHit> for NearestStation {
    fn from(hit: StationHit) -> Self {
        Self {
            id: hit.business_id,
            name: hit.name,
            en_name: hit.name_foreign,
            lat: hit.latitude,
            long: hit.longitude,
            distance_km: meters_to_km(hit.distance_meters),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NearestResponse {
    pub success: bool,
    pub data: Vec<NearestStation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NearestPageResponse {
    pub success: bool,
    pub page: u64,
    pub page_size: u64,
    pub pages_items: u64,
    pub item_start: u64,
    pub item_end: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub data: Vec<NearestStation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nearest_station_field_names() {
        let hit = StationHit {
            business_id: 1001,
            name: "กรุงเทพ".to_string(),
            name_foreign: "Bangkok".to_string(),
            latitude: 13.75,
            longitude: 100.5,
            distance_meters: 1234.6,
        };
        let value = serde_json::to_value(NearestStation::from(hit)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 1001,
                "name": "กรุงเทพ",
                "en_name": "Bangkok",
                "lat": 13.75,
                "long": 100.5,
                "distance_km": 1.235
            })
        );
    }

    #[test]
    fn request_defaults() {
        let nearest: NearestRequest =
            serde_json::from_value(json!({"lat": 1.0, "long": 2.0})).unwrap();
        assert_eq!(nearest.limit, 10);

        let page: NearestPageRequest =
            serde_json::from_value(json!({"lat": 1.0, "long": 2.0, "page": 3})).unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.page_size, 10);
    }
}
