use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ambient conditions for one timestamp, as supplied by the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherSample {
    pub timestamp: DateTime<FixedOffset>,
    /// Air temperature at 2 m (°C)
    pub temp_air_c: f64,
    /// Wind speed at 10 m (m/s)
    pub wind_speed_ms: f64,
    /// Total cloud cover (%)
    pub cloud_cover_pct: f64,
}

impl WeatherSample {
    /// Clamps wind and cloud cover into their physical ranges.
    /// Returns `None` when the temperature is unusable.
    pub fn sanitized(self) -> Option<Self> {
        if !self.temp_air_c.is_finite() {
            return None;
        }
        let wind_speed_ms = if self.wind_speed_ms.is_finite() {
            self.wind_speed_ms.max(0.0)
        } else {
            0.0
        };
        let cloud_cover_pct = if self.cloud_cover_pct.is_finite() {
            self.cloud_cover_pct.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Some(Self {
            wind_speed_ms,
            cloud_cover_pct,
            ..self
        })
    }

    /// Fraction of clear-sky GHI that passes the cloud deck.
    pub fn clear_fraction(&self) -> f64 {
        1.0 - self.cloud_cover_pct.clamp(0.0, 100.0) / 100.0
    }
}

// ─── Open-Meteo wire types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HourlyWeatherResponse {
    pub hourly: HourlyData,
}

/// Column-oriented hourly table. Values are `null` where the model has no data.
#[derive(Debug, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
}

// ─── Nominatim wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    /// Nominatim encodes coordinates as strings
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}
