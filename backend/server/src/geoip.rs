//! # IP Geolocation
//!
//! Server side stand-in for the browser's geolocation: looks the caller's public IP up against an ip-api style
//! endpoint.
//!
//! ```sh
//! curl "http://ip-api.com/json/?fields=status,message,lat,lon"
//! ```
//!
//! IP lookups have a single accuracy level, so `enable_high_accuracy` changes nothing here. `maximum_age` is
//! honored by reusing the last fix while it is young enough.
use std::sync::Mutex;

use places::Coordinate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    location::{Geolocator, PositionError, PositionOptions},
    session::lock,
    utils::in_range,
};

pub const GEOIP_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

#[derive(Deserialize)]
pub struct Lookup {
    pub status: String,
    pub message: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub struct IpGeolocator {
    client: Client,
    url: String,
    last_fix: Mutex<Option<(Instant, Coordinate)>>,
}

impl IpGeolocator {
    pub fn new(url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            url: url.to_string(),
            last_fix: Mutex::new(None),
        })
    }

    fn cached(&self, options: &PositionOptions) -> Option<Coordinate> {
        let last_fix = *lock(&self.last_fix);

        last_fix
            .filter(|(at, _)| at.elapsed() <= options.maximum_age)
            .map(|(_, coordinate)| coordinate)
    }

    fn remember(&self, coordinate: Coordinate) {
        *lock(&self.last_fix) = Some((Instant::now(), coordinate));
    }

    async fn lookup(&self, options: &PositionOptions) -> Result<Coordinate, PositionError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(classify)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PositionError::PermissionDenied);
            }
            status if !status.is_success() => {
                warn!("Geolocation lookup returned {status}");
                return Err(PositionError::PositionUnavailable);
            }
            _ => {}
        }

        let lookup: Lookup = response.json().await.map_err(classify)?;
        fix_from_lookup(lookup)
    }
}

impl Geolocator for IpGeolocator {
    async fn current_position(&self, options: PositionOptions) -> Result<Coordinate, PositionError> {
        if let Some(coordinate) = self.cached(&options) {
            debug!("Reusing cached position");
            return Ok(coordinate);
        }

        let coordinate = self.lookup(&options).await?;
        self.remember(coordinate);

        Ok(coordinate)
    }
}

fn classify(e: reqwest::Error) -> PositionError {
    if e.is_timeout() {
        return PositionError::Timeout;
    }

    warn!("Geolocation lookup failed: {e}");
    PositionError::PositionUnavailable
}

pub fn fix_from_lookup(lookup: Lookup) -> Result<Coordinate, PositionError> {
    if lookup.status != "success" {
        warn!(
            "Geolocation lookup refused: {}",
            lookup.message.as_deref().unwrap_or("no reason given")
        );
        return Err(PositionError::PositionUnavailable);
    }

    match (lookup.lat, lookup.lon) {
        (Some(latitude), Some(longitude)) if in_range(latitude, longitude) => {
            Ok(Coordinate::new(latitude, longitude))
        }
        _ => Err(PositionError::PositionUnavailable),
    }
}
