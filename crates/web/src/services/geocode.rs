//! Address geocoding via the Google Geocoding API.
//!
//! Only the first result is used.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use dar_core::{GeoError, GeoPoint};

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Errors from geocoding an address.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The address did not resolve to any location.
    #[error("no results for address")]
    NoResults,

    /// The API answered with a non-OK status.
    #[error("geocoding API status {status}: {message}")]
    Api { status: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid coordinates: {0}")]
    Coordinates(#[from] GeoError),
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Client for the geocoding API.
#[derive(Clone)]
pub struct Geocoder {
    inner: Arc<GeocoderInner>,
}

struct GeocoderInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl std::fmt::Debug for Geocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geocoder")
            .field("endpoint", &self.inner.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Geocoder {
    /// Create a client for the public Google endpoint.
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self::with_endpoint(api_key, GEOCODE_ENDPOINT)
    }

    /// Create a client for a custom endpoint.
    #[must_use]
    pub fn with_endpoint(api_key: SecretString, endpoint: &str) -> Self {
        Self {
            inner: Arc::new(GeocoderInner {
                client: reqwest::Client::new(),
                endpoint: endpoint.to_string(),
                api_key,
            }),
        }
    }

    /// Resolve an address to coordinates.
    ///
    /// # Errors
    ///
    /// Returns `GeocodeError::NoResults` when the address is unknown.
    /// Returns other variants for transport or API failures.
    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let response = self
            .inner
            .client
            .get(&self.inner.endpoint)
            .query(&[
                ("address", address),
                ("key", self.inner.api_key.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Geocoding API returned non-success status"
            );
            return Err(GeocodeError::Api {
                status: status.to_string(),
                message: body.chars().take(200).collect(),
            });
        }

        parse_response(&body)
    }
}

/// Extract the first location from a response body.
fn parse_response(body: &str) -> Result<GeoPoint, GeocodeError> {
    let response: GeocodeResponse = serde_json::from_str(body)?;

    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(GeocodeError::NoResults),
        _ => {
            return Err(GeocodeError::Api {
                status: response.status,
                message: response.error_message.unwrap_or_default(),
            });
        }
    }

    let first = response
        .results
        .into_iter()
        .next()
        .ok_or(GeocodeError::NoResults)?;

    Ok(GeoPoint::new(
        first.geometry.location.lat,
        first.geometry.location.lng,
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok() {
        let body = r#"{
            "status": "OK",
            "results": [
                {"geometry": {"location": {"lat": 31.6295, "lng": -7.9811}}},
                {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
            ]
        }"#;
        let point = parse_response(body).unwrap();
        assert!((point.lat - 31.6295).abs() < f64::EPSILON);
        assert!((point.lng + 7.9811).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_zero_results() {
        let body = r#"{"status": "ZERO_RESULTS", "results": []}"#;
        assert!(matches!(parse_response(body), Err(GeocodeError::NoResults)));
    }

    #[test]
    fn test_parse_ok_but_empty() {
        let body = r#"{"status": "OK", "results": []}"#;
        assert!(matches!(parse_response(body), Err(GeocodeError::NoResults)));
    }

    #[test]
    fn test_parse_denied() {
        let body = r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#;
        match parse_response(body) {
            Err(GeocodeError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "bad key");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_out_of_range() {
        let body = r#"{"status": "OK", "results": [{"geometry": {"location": {"lat": 123.0, "lng": 0.0}}}]}"#;
        assert!(matches!(
            parse_response(body),
            Err(GeocodeError::Coordinates(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let geocoder = Geocoder::new(SecretString::from("AIzaSecretKey"));
        let debug = format!("{geocoder:?}");
        assert!(!debug.contains("AIzaSecretKey"));
    }
}
