//! OpenStreetMap Nominatim client (free, unauthenticated).
//!
//! Usage policy: an identifying User-Agent on every request and no more than
//! one request per second in aggregate. The spacing is enforced by the
//! resolver's limiter, not here.

use super::{Capability, GeocodeProvider};
use crate::error::GeocodeError;
use crate::output::Coordinate;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimProvider {
    pub fn new(client: reqwest::Client, base_url: Option<&str>, user_agent: &str) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    fn build_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1&countrycodes=jp&accept-language=ja",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &str {
        "nominatim"
    }

    fn capability(&self) -> Capability {
        Capability::FreeUnauthenticated
    }

    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let resp = self
            .client
            .get(self.build_url(query))
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let places: Vec<Place> = resp.json().await?;
        let Some(place) = places.into_iter().next() else {
            debug!("nominatim: no result for '{}'", query);
            return Ok(None);
        };

        let lat = place
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::Malformed(format!("lat '{}': {e}", place.lat)))?;
        let lng = place
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::Malformed(format!("lon '{}': {e}", place.lon)))?;
        Ok(Some(Coordinate { lat, lng }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_encoded_and_country_restricted() {
        let p = NominatimProvider::new(reqwest::Client::new(), Some("http://localhost:9/"), "ua");
        let url = p.build_url("東京都 渋谷区");
        assert!(url.starts_with("http://localhost:9/search?q=%E6%9D%B1"));
        assert!(url.contains("%20"));
        assert!(url.contains("countrycodes=jp"));
        assert!(url.contains("accept-language=ja"));
    }
}
