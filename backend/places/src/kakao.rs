//! # Kakao Local
//!
//! Category search over the Kakao Local REST API.
//!
//! ```sh
//! curl -H "Authorization: KakaoAK $(cat /run/secrets/KAKAO_REST_KEY)" \
//!   "https://dapi.kakao.com/v2/local/search/category.json?category_group_code=FD6&x=126.978&y=37.5665&radius=500"
//! ```
//!
//! Kakao never pages past 45 documents for category search, so in practice the aggregator sees at most 3 pages
//! from this provider even though it would accept 5.
use std::time::Duration;

use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{CategoryQuery, Pagination, Place, PlacesProvider, SearchPage, SearchStatus};

pub const KAKAO_BASE_URL: &str = "https://dapi.kakao.com";
pub const CATEGORY_ENDPOINT: &str = "/v2/local/search/category.json";
pub const PAGE_SIZE: u32 = 15;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider rejected request: {0}")]
    Rejected(StatusCode),
}

#[derive(Deserialize)]
pub struct Response {
    pub documents: Vec<Document>,
    pub meta: Meta,
}

#[derive(Deserialize)]
pub struct Document {
    pub id: String,
    pub place_name: String,
    pub category_name: String,
    pub x: String,
    pub y: String,
}

#[derive(Deserialize)]
pub struct Meta {
    pub total_count: u32,
    pub pageable_count: u32,
    pub is_end: bool,
}

pub struct KakaoPlaces {
    client: Client,
    base_url: String,
    rest_key: String,
}

impl KakaoPlaces {
    pub fn new(base_url: &str, rest_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rest_key: rest_key.to_string(),
        })
    }

    async fn fetch(&self, query: &CategoryQuery) -> Result<Response, ProviderError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, CATEGORY_ENDPOINT))
            .header(AUTHORIZATION, format!("KakaoAK {}", self.rest_key))
            .query(&[
                ("category_group_code", query.category.clone()),
                ("x", query.center.longitude.to_string()),
                ("y", query.center.latitude.to_string()),
                ("radius", query.radius_meters.to_string()),
                ("page", query.page.to_string()),
                ("size", PAGE_SIZE.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Rejected(status));
        }

        Ok(response.json().await?)
    }
}

impl PlacesProvider for KakaoPlaces {
    async fn search_category(&self, query: &CategoryQuery) -> SearchPage {
        match self.fetch(query).await {
            Ok(response) => into_page(response, query.page),
            Err(e) => {
                warn!("Category search for page {} failed: {e}", query.page);
                SearchPage::failed(query.page, SearchStatus::Error)
            }
        }
    }
}

pub fn last_page(pageable_count: u32) -> u32 {
    pageable_count.div_ceil(PAGE_SIZE).max(1)
}

pub fn into_page(response: Response, page: u32) -> SearchPage {
    debug!(
        "Page {page}: {} documents, {} total",
        response.documents.len(),
        response.meta.total_count
    );

    let places: Vec<Place> = response
        .documents
        .into_iter()
        .filter_map(|document| {
            let (Ok(x), Ok(y)) = (document.x.parse(), document.y.parse()) else {
                warn!("Skipping {} with invalid coordinates", document.id);
                return None;
            };

            Some(Place {
                id: document.id,
                name: document.place_name,
                x,
                y,
                category: document.category_name,
            })
        })
        .collect();

    let status = if places.is_empty() {
        SearchStatus::ZeroResult
    } else {
        SearchStatus::Ok
    };

    SearchPage {
        places,
        status,
        pagination: Pagination {
            current: page,
            last: last_page(response.meta.pageable_count),
        },
    }
}
