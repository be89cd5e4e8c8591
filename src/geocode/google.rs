//! Google Geocoding API client (paid, requires an API key).
//!
//! The key is sent as a query parameter and never logged.

use super::{Capability, GeocodeProvider};
use crate::error::GeocodeError;
use crate::output::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
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

pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, base_url: Option<&str>, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn build_url(&self, query: &str) -> String {
        format!(
            "{}/maps/api/geocode/json?address={}&key={}&language=ja&region=jp",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl GeocodeProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn capability(&self) -> Capability {
        Capability::PaidAuthenticated
    }

    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let resp = self.client.get(self.build_url(query)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: GeocodeResponse = resp.json().await?;
        match body.status.as_str() {
            "OK" => Ok(body
                .results
                .into_iter()
                .next()
                .map(|r| Coordinate::new(r.geometry.location.lat, r.geometry.location.lng))),
            "ZERO_RESULTS" => {
                debug!("google: no result for '{}'", query);
                Ok(None)
            }
            other => Err(GeocodeError::ProviderStatus(other.to_string())),
        }
    }
}
