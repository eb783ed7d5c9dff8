use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{CategoryQuery, Coordinate, MAX_PAGES, Place, PlacesProvider, SearchPage, SearchStatus};

/// Merges the paginated category search into one list ordered by page.
///
/// Only one search runs at a time. A call made while another is pending is dropped and returns `None`.
pub struct PlacesAggregator<P> {
    provider: Arc<P>,
    in_flight: AtomicBool,
    max_pages: u32,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: PlacesProvider> PlacesAggregator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            in_flight: AtomicBool::new(false),
            max_pages: MAX_PAGES,
        }
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn search(&self, center: Coordinate) -> Option<Vec<Place>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Search already in flight, dropping request");
            return None;
        }

        let _guard = InFlight(&self.in_flight);
        let places = self.collect(center).await;

        info!(
            "Found {} places around ({}, {})",
            places.len(),
            center.latitude,
            center.longitude
        );

        Some(places)
    }

    async fn collect(&self, center: Coordinate) -> Vec<Place> {
        let first = self
            .provider
            .search_category(&CategoryQuery::food(center, 1))
            .await;

        if first.status != SearchStatus::Ok {
            info!("First page came back {:?}, no places", first.status);
            return Vec::new();
        }

        let total_pages = first.pagination.last.clamp(1, self.max_pages);
        if total_pages == 1 {
            return first.places;
        }

        let mut slots: Vec<Option<Vec<Place>>> = vec![None; total_pages as usize];
        fill_slot(&mut slots, first);

        let mut pending = JoinSet::new();
        for page in 2..=total_pages {
            let provider = self.provider.clone();
            let query = CategoryQuery::food(center, page);

            pending.spawn(async move { provider.search_category(&query).await });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(page) if page.status == SearchStatus::Ok => fill_slot(&mut slots, page),
                Ok(page) => debug!(
                    "Page {} came back {:?}, skipping",
                    page.pagination.current, page.status
                ),
                Err(e) => warn!("Page task did not complete: {e}"),
            }
        }

        slots.into_iter().flatten().flatten().collect()
    }
}

fn fill_slot(slots: &mut [Option<Vec<Place>>], page: SearchPage) {
    let Some(slot) = page
        .pagination
        .current
        .checked_sub(1)
        .and_then(|index| slots.get_mut(index as usize))
    else {
        warn!("Page {} is outside the requested range", page.pagination.current);
        return;
    };

    *slot = Some(page.places);
}
