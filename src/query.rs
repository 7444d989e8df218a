//! Nearest-station queries over a [`StationStore`].

use std::sync::Arc;

use tracing::debug;

use crate::{
    contracts::{
        NearestPageRequest, NearestPageResponse, NearestRequest, NearestResponse, NearestStation,
    },
    database::StationStore,
    errors::StationError,
    geo::{is_valid_latitude, is_valid_longitude, NEAREST_MAX_DISTANCE_METERS},
    models::GeoPoint,
};

pub const MAX_LIMIT: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 100;
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Window and metadata of one result page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub item_start: u64,
    pub item_end: u64,
    pub returned: u64,
}

impl PageMeta {
    /// Rows to skip before `page` (1-based). `None` when the window would
    /// end past `i64::MAX`, the largest offset a store accepts.
    pub fn skip(page: u64, page_size: u64) -> Option<u64> {
        let skip = page.checked_sub(1)?.checked_mul(page_size)?;
        skip.checked_add(page_size)
            .filter(|&end| end <= MAX_OFFSET)
            .map(|_| skip)
    }

    /// `item_end` is `item_start - 1` when the page is past the end.
    pub fn compute(page: u64, page_size: u64, total_items: u64, returned: u64) -> Self {
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        Self {
            page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size.max(1)),
            item_start: skip.saturating_add(1),
            item_end: skip.saturating_add(returned),
            returned,
        }
    }
}

pub fn validate_coordinates(lat: f64, long: f64) -> Result<(), StationError> {
    if !is_valid_latitude(lat) {
        return Err(StationError::Validation(
            "invalid latitude: must be between -90 and 90".to_string(),
        ));
    }
    if !is_valid_longitude(long) {
        return Err(StationError::Validation(
            "invalid longitude: must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

fn validate_limit(limit: i64) -> Result<u64, StationError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(StationError::Validation(format!(
            "invalid limit: must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(limit as u64)
}

/// Returns `(page, page_size, skip)`
fn validate_page(page: i64, page_size: i64) -> Result<(u64, u64, u64), StationError> {
    if page < 1 {
        return Err(StationError::Validation(
            "invalid page: must be 1 or greater".to_string(),
        ));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(StationError::Validation(format!(
            "invalid page_size: must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let (page, page_size) = (page as u64, page_size as u64);
    let skip = PageMeta::skip(page, page_size)
        .ok_or_else(|| StationError::Validation("invalid page: out of range".to_string()))?;
    Ok((page, page_size, skip))
}

/// Stateless query engine, one call per request
#[derive(Clone)]
pub struct StationQueries {
    store: Arc<dyn StationStore>,
}

impl StationQueries {
    pub fn new(store: Arc<dyn StationStore>) -> Self {
        Self { store }
    }

    /// Up to `limit` active stations within 10 km, nearest first
    pub async fn find_nearest(
        &self,
        request: &NearestRequest,
    ) -> Result<NearestResponse, StationError> {
        validate_coordinates(request.lat, request.long)?;
        let limit = validate_limit(request.limit)?;

        let hits = self
            .store
            .nearest(
                GeoPoint::new(request.long, request.lat),
                Some(NEAREST_MAX_DISTANCE_METERS),
                limit,
            )
            .await?;

        if hits.is_empty() {
            return Err(StationError::NotFound(
                "no stations found within range".to_string(),
            ));
        }

        debug!(
            "Found {} stations near ({}, {})",
            hits.len(),
            request.lat,
            request.long
        );

        Ok(NearestResponse {
            success: true,
            data: hits.into_iter().map(NearestStation::from).collect(),
        })
    }

    /// One page of all active stations ordered by distance, with totals
    pub async fn find_nearest_paginated(
        &self,
        request: &NearestPageRequest,
    ) -> Result<NearestPageResponse, StationError> {
        validate_coordinates(request.lat, request.long)?;
        let (page, page_size, skip) = validate_page(request.page, request.page_size)?;

        let point = GeoPoint::new(request.long, request.lat);
        let window = self.store.nearest_page(point, skip, page_size).await?;
        if window.total == 0 {
            return Err(StationError::NotFound("no stations found".to_string()));
        }

        let hits = window.hits;
        let meta = PageMeta::compute(page, page_size, window.total, hits.len() as u64);

        Ok(NearestPageResponse {
            success: true,
            page: meta.page,
            page_size: meta.page_size,
            pages_items: meta.returned,
            item_start: meta.item_start,
            item_end: meta.item_end,
            total_pages: meta.total_pages,
            total_items: meta.total_items,
            data: hits.into_iter().map(NearestStation::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_arithmetic() {
        let meta = PageMeta::compute(3, 10, 25, 5);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.item_start, 21);
        assert_eq!(meta.item_end, 25);
        assert_eq!(meta.returned, 5);
        assert_eq!(PageMeta::skip(3, 10), Some(20));
    }

    #[test]
    fn page_past_the_end() {
        let meta = PageMeta::compute(5, 10, 25, 0);
        assert_eq!(meta.item_start, 41);
        assert_eq!(meta.item_end, 40);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn exact_multiple_of_page_size() {
        let meta = PageMeta::compute(2, 10, 20, 10);
        assert_eq!(meta.total_pages, 2);
        assert_eq!(meta.item_start, 11);
        assert_eq!(meta.item_end, 20);
    }

    #[test]
    fn coordinate_validation() {
        assert!(validate_coordinates(13.75, 100.5).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(91.0, 0.0),
            Err(StationError::Validation(_))
        ));
        assert!(matches!(
            validate_coordinates(0.0, 181.0),
            Err(StationError::Validation(_))
        ));
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn limit_bounds() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(101).is_err());
        assert!(validate_limit(-3).is_err());
        assert_eq!(validate_limit(1).unwrap(), 1);
        assert_eq!(validate_limit(100).unwrap(), 100);
    }

    #[test]
    fn page_bounds() {
        assert!(validate_page(0, 10).is_err());
        assert!(validate_page(-1, 10).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(1, 101).is_err());
        assert_eq!(validate_page(2, 100).unwrap(), (2, 100, 100));
    }

    #[test]
    fn huge_page_is_rejected_not_overflowed() {
        assert!(matches!(
            validate_page(i64::MAX, 100),
            Err(StationError::Validation(msg)) if msg == "invalid page: out of range"
        ));
        assert!(validate_page(i64::MAX, 1).is_ok());
        assert_eq!(PageMeta::skip(u64::MAX, 100), None);
        assert_eq!(PageMeta::skip(0, 10), None);

        // Metadata saturates instead of panicking
        let meta = PageMeta::compute(u64::MAX, 100, 3, 0);
        assert_eq!(meta.item_start, u64::MAX);
        assert_eq!(meta.item_end, u64::MAX);
    }
}
