use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::{FetchError, GeocodeError};
use crate::models::solar::Location;
use crate::models::weather::WeatherSample;
use crate::services::geocoder::Geocoder;
use crate::services::weather_service::WeatherProvider;

/// Bounded map that stops accepting new keys once full.
struct BoundedMap<K, V> {
    entries: RwLock<HashMap<K, V>>,
    max_entries: usize,
}

impl<K: Eq + Hash, V: Clone> BoundedMap<K, V> {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: K, value: V) {
        let mut map = self.entries.write().await;
        if map.len() < self.max_entries || map.contains_key(&key) {
            map.insert(key, value);
        }
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// (lat µdeg, lon µdeg, altitude mm, utc offset s, date)
type WeatherKey = (i64, i64, i64, i32, NaiveDate);

fn weather_key(location: &Location, date: NaiveDate) -> WeatherKey {
    (
        (location.latitude * 1e6).round() as i64,
        (location.longitude * 1e6).round() as i64,
        (location.altitude_m * 1e3).round() as i64,
        location.utc_offset_seconds,
        date,
    )
}

/// Memoizes successful day fetches of the wrapped provider.
pub struct CachedWeatherProvider<P> {
    inner: P,
    cache: BoundedMap<WeatherKey, Vec<WeatherSample>>,
}

impl<P: WeatherProvider> CachedWeatherProvider<P> {
    pub fn new(inner: P, max_entries: usize) -> Self {
        Self {
            inner,
            cache: BoundedMap::new(max_entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.cache.len().await
    }
}

#[async_trait]
impl<P: WeatherProvider> WeatherProvider for CachedWeatherProvider<P> {
    async fn fetch(&self, location: &Location, date: NaiveDate) -> Result<Vec<WeatherSample>, FetchError> {
        let key = weather_key(location, date);
        if let Some(hit) = self.cache.get(&key).await {
            trace!("[CACHE] weather hit {}", date);
            return Ok(hit);
        }
        let samples = self.inner.fetch(location, date).await?;
        self.cache.put(key, samples.clone()).await;
        Ok(samples)
    }
}

/// Memoizes successful lookups by normalised place name.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: BoundedMap<String, Location>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, max_entries: usize) -> Self {
        Self {
            inner,
            cache: BoundedMap::new(max_entries),
        }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn resolve(&self, place_name: &str) -> Result<Location, GeocodeError> {
        let key = place_name.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key).await {
            trace!("[CACHE] geocode hit \"{}\"", key);
            return Ok(hit);
        }
        let location = self.inner.resolve(place_name).await?;
        self.cache.put(key, location).await;
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        async fn fetch(&self, _location: &Location, date: NaiveDate) -> Result<Vec<WeatherSample>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if date.format("%d").to_string() == "13" {
                return Err(FetchError::Status(503));
            }
            let ts = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
            Ok(vec![WeatherSample { timestamp: ts, temp_air_c: n as f64, wind_speed_ms: 1.0, cloud_cover_pct: 0.0 }])
        }
    }

    #[derive(Default)]
    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn resolve(&self, place_name: &str) -> Result<Location, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if place_name.contains("Atlantis") {
                return Err(GeocodeError::NotFound(place_name.into()));
            }
            Ok(Location::new(45.07, 7.68)?)
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_weather_hit_skips_inner() {
        let cached = CachedWeatherProvider::new(CountingProvider::default(), 16);
        let loc = Location::new(45.0, 7.0).unwrap();
        let a = cached.fetch(&loc, day(1)).await.unwrap();
        let b = cached.fetch(&loc, day(1)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);

        let other = Location::new(45.5, 7.0).unwrap();
        cached.fetch(&other, day(1)).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cached = CachedWeatherProvider::new(CountingProvider::default(), 16);
        let loc = Location::new(45.0, 7.0).unwrap();
        assert!(cached.fetch(&loc, day(13)).await.is_err());
        assert!(cached.fetch(&loc, day(13)).await.is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.len().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let cached = CachedWeatherProvider::new(CountingProvider::default(), 2);
        let loc = Location::new(45.0, 7.0).unwrap();
        for d in 1..=4 {
            cached.fetch(&loc, day(d)).await.unwrap();
        }
        assert_eq!(cached.len().await, 2);
    }

    #[tokio::test]
    async fn test_geocoder_normalises_names() {
        let cached = CachedGeocoder::new(CountingGeocoder::default(), 16);
        cached.resolve("Turin").await.unwrap();
        cached.resolve("  turin ").await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert!(cached.resolve("Atlantis").await.is_err());
        assert!(cached.resolve("Atlantis").await.is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 3);
    }
}
