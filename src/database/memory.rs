// src/database/memory.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{NearestPage, StationStore, StationUpsert, UpsertSummary};
use crate::{
    errors::StationError,
    geo::haversine_distance,
    models::{GeoPoint, StationHit, StationRecord, StoredStation},
};

#[derive(Default)]
struct Inner {
    /// Insertion order, which is also the tie-break order of equal distances
    stations: Vec<StoredStation>,
    by_business_id: HashMap<i64, usize>,
}

/// Station store held in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored state of one station
    pub async fn get(&self, business_id: i64) -> Option<StoredStation> {
        let inner = self.inner.read().await;
        inner
            .by_business_id
            .get(&business_id)
            .map(|&i| inner.stations[i].clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.stations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_open(&self) -> Result<(), StationError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StationError::Store("store is closed".to_string()));
        }
        Ok(())
    }

    /// Active, geo-indexed stations ordered by distance from `point`
    async fn ranked(&self, point: GeoPoint) -> Vec<StationHit> {
        let inner = self.inner.read().await;
        let mut hits: Vec<StationHit> = inner
            .stations
            .iter()
            .filter(|s| s.record.is_active)
            .filter_map(|s| {
                let geo = s.record.geo_point?;
                let distance = haversine_distance(
                    point.latitude(),
                    point.longitude(),
                    geo.latitude(),
                    geo.longitude(),
                );
                Some(StationHit::from_record(&s.record, distance))
            })
            .collect();

        // Stable, so equal distances keep insertion order
        hits.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        hits
    }
}

#[async_trait]
impl StationStore for MemoryStore {
    async fn ensure_geo_index(&self) -> Result<(), StationError> {
        self.ensure_open()
    }

    async fn upsert_many(&self, records: &[StationRecord]) -> Result<UpsertSummary, StationError> {
        self.ensure_open()?;

        let now = Utc::now();
        let mut summary = UpsertSummary::default();
        let mut inner = self.inner.write().await;

        for record in records {
            let upsert = StationUpsert::new(record, now);
            let existing = inner.by_business_id.get(&upsert.key()).copied();
            match existing {
                Some(i) => {
                    let merged = upsert.apply(Some(&inner.stations[i]));
                    inner.stations[i] = merged;
                    summary.updated += 1;
                }
                None => {
                    let index = inner.stations.len();
                    inner.stations.push(upsert.apply(None));
                    inner.by_business_id.insert(upsert.key(), index);
                    summary.inserted += 1;
                }
            }
        }

        debug!(
            "Memory upsert: {} inserted, {} updated",
            summary.inserted, summary.updated
        );
        Ok(summary)
    }

    async fn nearest(
        &self,
        point: GeoPoint,
        max_distance_meters: Option<f64>,
        limit: u64,
    ) -> Result<Vec<StationHit>, StationError> {
        self.ensure_open()?;

        Ok(self
            .ranked(point)
            .await
            .into_iter()
            .filter(|hit| max_distance_meters.map_or(true, |max| hit.distance_meters <= max))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn nearest_page(
        &self,
        point: GeoPoint,
        skip: u64,
        take: u64,
    ) -> Result<NearestPage, StationError> {
        self.ensure_open()?;

        // One read guard covers both the window and the total
        let ranked = self.ranked(point).await;
        let total = ranked.len() as u64;
        let hits = ranked
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(take).unwrap_or(usize::MAX))
            .collect();

        Ok(NearestPage { hits, total })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: i64, lat: f64, long: f64, active: bool) -> StationRecord {
        StationRecord {
            business_id: id,
            name: format!("station {id}"),
            latitude: lat,
            longitude: long,
            is_active: active,
            geo_point: (lat != 0.0 && long != 0.0).then(|| GeoPoint::new(long, lat)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_by_business_id() {
        let store = MemoryStore::new();
        let batch = vec![station(1, 13.7, 100.5, true), station(2, 13.8, 100.6, true)];

        let first = store.upsert_many(&batch).await.unwrap();
        assert_eq!(first, UpsertSummary { inserted: 2, updated: 0 });
        let created = store.get(1).await.unwrap().created_at;

        let second = store.upsert_many(&batch).await.unwrap();
        assert_eq!(second, UpsertSummary { inserted: 0, updated: 2 });
        assert_eq!(store.len().await, 2);

        let stored = store.get(1).await.unwrap();
        assert_eq!(stored.created_at, created);
        assert!(stored.updated_at >= created);
    }

    #[tokio::test]
    async fn test_nearest_ordering_and_filters() {
        let store = MemoryStore::new();
        store
            .upsert_many(&[
                station(1, 13.80, 100.50, true),
                station(2, 13.76, 100.50, true),
                station(3, 13.75, 100.51, false), // inactive
                station(4, 0.0, 0.0, true),       // no geo point
                station(5, 14.50, 100.50, true),  // far away
            ])
            .await
            .unwrap();

        let origin = GeoPoint::new(100.50, 13.75);
        let hits = store.nearest(origin, Some(10_000.0), 10).await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.business_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(hits[0].distance_meters < hits[1].distance_meters);

        let unbounded = store.nearest(origin, None, 10).await.unwrap();
        assert_eq!(unbounded.len(), 3);

        let limited = store.nearest(origin, None, 1).await.unwrap();
        assert_eq!(limited[0].business_id, 2);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = MemoryStore::new();
        store
            .upsert_many(&[station(9, 13.8, 100.5, true), station(3, 13.8, 100.5, true)])
            .await
            .unwrap();

        let hits = store
            .nearest(GeoPoint::new(100.5, 13.75), None, 10)
            .await
            .unwrap();
        assert_eq!(hits[0].business_id, 9);
        assert_eq!(hits[1].business_id, 3);
    }

    #[tokio::test]
    async fn test_page_window_and_count() {
        let store = MemoryStore::new();
        let batch: Vec<StationRecord> = (1..=25)
            .map(|i| station(i, 13.75 + i as f64 * 0.01, 100.5, true))
            .collect();
        store.upsert_many(&batch).await.unwrap();

        let origin = GeoPoint::new(100.5, 13.75);
        let page = store.nearest_page(origin, 20, 10).await.unwrap();
        assert_eq!(page.total, 25);
        let ids: Vec<i64> = page.hits.iter().map(|h| h.business_id).collect();
        assert_eq!(ids, vec![21, 22, 23, 24, 25]);

        let past_end = store.nearest_page(origin, 30, 10).await.unwrap();
        assert!(past_end.hits.is_empty());
        assert_eq!(past_end.total, 25);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let store = MemoryStore::new();
        store.close().await;
        assert!(matches!(
            store.upsert_many(&[station(1, 1.0, 1.0, true)]).await,
            Err(StationError::Store(_))
        ));
    }
}
