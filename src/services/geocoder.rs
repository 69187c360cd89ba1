use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::GeocoderConfig;
use crate::error::GeocodeError;
use crate::models::solar::Location;
use crate::models::weather::NominatimPlace;

/// Free-text place name → coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, place_name: &str) -> Result<Location, GeocodeError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Arc<G> {
    async fn resolve(&self, place_name: &str) -> Result<Location, GeocodeError> {
        (**self).resolve(place_name).await
    }
}

/// OpenStreetMap Nominatim search client.
pub struct NominatimClient {
    http: reqwest::Client,
    url: String,
}

impl NominatimClient {
    pub fn new(cfg: &GeocoderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_s))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            url: cfg.url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn resolve(&self, place_name: &str) -> Result<Location, GeocodeError> {
        let query = place_name.trim();
        if query.is_empty() {
            return Err(GeocodeError::NotFound(place_name.to_string()));
        }

        let response = self
            .http
            .get(&self.url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let location = first_location(query, &places)?;
        debug!("[GEOCODE] \"{}\" → ({:.4}, {:.4})", query, location.latitude, location.longitude);
        Ok(location)
    }
}

/// First usable hit of a Nominatim search.
pub fn first_location(query: &str, places: &[NominatimPlace]) -> Result<Location, GeocodeError> {
    let place = places
        .first()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;
    let (Ok(lat), Ok(lon)) = (place.lat.parse::<f64>(), place.lon.parse::<f64>()) else {
        return Err(GeocodeError::NotFound(query.to_string()));
    };
    Ok(Location::new(lat, lon)?)
}
