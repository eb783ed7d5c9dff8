//! # Location
//!
//! Best-effort position of the user, always ending in a usable coordinate.
//!
//! ## Flow
//! - Quick, low accuracy attempt: 5 s timeout, accepts a fix up to 1 minute old.
//! - Only if that timed out, one high accuracy attempt: 15 s timeout, accepts a fix up to 5 minutes old.
//! - Anything else (denied, unavailable, second timeout) falls back to the default coordinate.
//!
//! The outcome is also posted as a notice: 3 s for success, 5 s for failures.
use std::{future::Future, time::Duration};

use places::{Coordinate, DEFAULT_COORDINATE};
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::notice::{Notices, Tone};

pub const SUCCESS_NOTICE: Duration = Duration::from_secs(3);
pub const FAILURE_NOTICE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

pub const FAST_OPTIONS: PositionOptions = PositionOptions {
    enable_high_accuracy: false,
    timeout: Duration::from_secs(5),
    maximum_age: Duration::from_secs(60),
};

pub const ACCURATE_OPTIONS: PositionOptions = PositionOptions {
    enable_high_accuracy: true,
    timeout: Duration::from_secs(15),
    maximum_age: Duration::from_secs(300),
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Position request timed out")]
    Timeout,
}

pub trait Geolocator: Send + Sync + 'static {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<Coordinate, PositionError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Success,
    Failed,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Acquired {
    pub coordinate: Coordinate,
    pub status: LocationStatus,
}

pub struct LocationAcquirer<G> {
    geolocator: G,
    notices: Notices,
    fallback: Coordinate,
}

impl<G: Geolocator> LocationAcquirer<G> {
    pub fn new(geolocator: G, notices: Notices) -> Self {
        Self {
            geolocator,
            notices,
            fallback: DEFAULT_COORDINATE,
        }
    }

    pub async fn acquire(&self) -> Acquired {
        let outcome = match self.attempt(FAST_OPTIONS).await {
            Err(PositionError::Timeout) => {
                info!("Quick position timed out, retrying with high accuracy");
                self.attempt(ACCURATE_OPTIONS).await
            }
            other => other,
        };

        self.settle(outcome)
    }

    async fn attempt(&self, options: PositionOptions) -> Result<Coordinate, PositionError> {
        timeout(options.timeout, self.geolocator.current_position(options))
            .await
            .unwrap_or(Err(PositionError::Timeout))
    }

    /// Turns a final outcome into a coordinate and posts the matching notice. Also used for fixes the client
    /// reports itself.
    pub fn settle(&self, outcome: Result<Coordinate, PositionError>) -> Acquired {
        match outcome {
            Ok(coordinate) => {
                info!(
                    "Located at ({}, {})",
                    coordinate.latitude, coordinate.longitude
                );
                self.notices
                    .post(Tone::Success, "Found your location", SUCCESS_NOTICE);

                Acquired {
                    coordinate,
                    status: LocationStatus::Success,
                }
            }
            Err(e) => {
                warn!("Could not locate user: {e}, using default location");

                let status = match e {
                    PositionError::PermissionDenied => LocationStatus::Denied,
                    _ => LocationStatus::Failed,
                };
                self.notices.post(
                    Tone::Warning,
                    format!("{e}, showing the default area"),
                    FAILURE_NOTICE,
                );

                Acquired {
                    coordinate: self.fallback,
                    status,
                }
            }
        }
    }
}
