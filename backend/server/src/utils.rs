use axum::body::Bytes;
use places::Coordinate;
use serde::Deserialize;

use crate::{
    error::AppError::{self, MalformedPayload},
    location::PositionError,
};

/// What the browser's own geolocation produced, if the client ran it.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum ClientFix {
    Position { latitude: f64, longitude: f64 },
    Failure { error: ClientFailure },
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientFailure {
    Denied,
    Unavailable,
    Timeout,
}

impl From<ClientFailure> for PositionError {
    fn from(failure: ClientFailure) -> Self {
        match failure {
            ClientFailure::Denied => PositionError::PermissionDenied,
            ClientFailure::Unavailable => PositionError::PositionUnavailable,
            ClientFailure::Timeout => PositionError::Timeout,
        }
    }
}

pub fn in_range(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// `None` for an empty body, meaning the server should locate the client itself.
pub fn get_fix_from_body(body: Bytes) -> Result<Option<Result<Coordinate, PositionError>>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let fix: ClientFix = serde_json::from_slice(&body).map_err(|_| MalformedPayload)?;

    let outcome = match fix {
        ClientFix::Position {
            latitude,
            longitude,
        } => {
            if !in_range(latitude, longitude) {
                return Err(MalformedPayload);
            }
            Ok(Coordinate::new(latitude, longitude))
        }
        ClientFix::Failure { error } => Err(error.into()),
    };

    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use places::Coordinate;

    use super::{get_fix_from_body, in_range};
    use crate::{error::AppError, location::PositionError};

    #[test]
    fn test_in_range() {
        assert!(in_range(37.5665, 126.978));
        assert!(in_range(-90.0, 180.0));
        assert!(!in_range(90.5, 0.0));
        assert!(!in_range(0.0, -180.5));
        assert!(!in_range(f64::NAN, 0.0));
    }

    #[test]
    fn test_empty_body() {
        assert!(matches!(get_fix_from_body(Bytes::new()), Ok(None)));
        assert!(matches!(get_fix_from_body(Bytes::from_static(b" \n")), Ok(None)));
    }

    #[test]
    fn test_position() {
        let fix = get_fix_from_body(Bytes::from_static(br#"{"latitude": 37.5, "longitude": 127.0}"#));
        assert!(matches!(fix, Ok(Some(Ok(c))) if c == Coordinate::new(37.5, 127.0)));
    }

    #[test]
    fn test_failure() {
        let fix = get_fix_from_body(Bytes::from_static(br#"{"error": "denied"}"#));
        assert!(matches!(fix, Ok(Some(Err(PositionError::PermissionDenied)))));

        let fix = get_fix_from_body(Bytes::from_static(br#"{"error": "timeout"}"#));
        assert!(matches!(fix, Ok(Some(Err(PositionError::Timeout)))));
    }

    #[test]
    fn test_malformed() {
        for body in [
            &br#"{"latitude": 137.5, "longitude": 127.0}"#[..],
            br#"{"error": "bored"}"#,
            b"not json",
        ] {
            assert!(matches!(
                get_fix_from_body(Bytes::copy_from_slice(body)),
                Err(AppError::MalformedPayload)
            ));
        }
    }
}
