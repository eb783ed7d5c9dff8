//! # Places
//!
//! Nearby food venues from the map provider.
//!
//! ## Overall Data Structures
//!
//! - [`Coordinate`]: WGS84 latitude/longitude pair. Produced by the location acquirer, consumed here as the
//!   search center and by the map surface for centering.
//! - [`Place`]: one venue as the provider reports it. `x` is the longitude and `y` the latitude, matching the
//!   provider's naming. The category is a `" > "` separated path such as `음식점 > 한식 > 국수`.
//!
//! ## Provider Contract
//!
//! The provider only needs a single capability, a paginated category search around a point. Each call yields
//! the page's places, a status, and pagination info (current page, last page). A status other than
//! [`SearchStatus::Ok`] means "no results for this page", never a hard failure.
//!
//! ## Aggregation
//! 1. Fetch page 1 to learn the page count.
//!
//! 2. Cap the page count at 5 regardless of what the provider reports.
//!
//! 3. Fetch the remaining pages concurrently, slotting each into `page - 1` so the merged list is in page order
//!    no matter which request lands first.
//!
//! 4. Flatten the slots, skipping pages that failed.
use std::future::Future;

use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod kakao;

pub use aggregate::PlacesAggregator;
pub use kakao::KakaoPlaces;

/// Seoul City Hall, used whenever the user's position can't be determined.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate {
    latitude: 37.5665,
    longitude: 126.9780,
};

/// Kakao category group code for restaurants.
pub const FOOD_CATEGORY: &str = "FD6";
pub const SEARCH_RADIUS_METERS: u32 = 500;
pub const MAX_PAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        DEFAULT_COORDINATE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub category: String,
}

impl Place {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.y, self.x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Ok,
    ZeroResult,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current: u32,
    pub last: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub places: Vec<Place>,
    pub status: SearchStatus,
    pub pagination: Pagination,
}

impl SearchPage {
    /// A page that contributes nothing, still reporting which page it was.
    pub fn failed(page: u32, status: SearchStatus) -> Self {
        Self {
            places: Vec::new(),
            status,
            pagination: Pagination {
                current: page,
                last: page,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryQuery {
    pub category: String,
    pub center: Coordinate,
    pub radius_meters: u32,
    pub page: u32,
}

impl CategoryQuery {
    pub fn food(center: Coordinate, page: u32) -> Self {
        Self {
            category: FOOD_CATEGORY.to_string(),
            center,
            radius_meters: SEARCH_RADIUS_METERS,
            page,
        }
    }
}

pub trait PlacesProvider: Send + Sync + 'static {
    fn search_category(&self, query: &CategoryQuery) -> impl Future<Output = SearchPage> + Send;
}
