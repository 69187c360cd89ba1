use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

const MAX_UTC_OFFSET_S: i32 = 18 * 3600;

// ─── Location ────────────────────────────────────────────────────────────────

/// Resolved site. Immutable once built; construct through [`Location::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// Geographic latitude (−90 … +90, north positive)
    pub latitude: f64,
    /// Geographic longitude (−180 … +180, east positive)
    pub longitude: f64,
    /// Site altitude above sea level (m)
    #[serde(default)]
    pub altitude_m: f64,
    /// Offset of the local civil day from UTC (s)
    pub utc_offset_seconds: i32,
}

impl Location {
    /// Validated location at sea level, local day on the nominal longitude zone.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::Longitude(longitude));
        }
        // Standard meridian zone, whole hours
        let utc_offset_seconds = (longitude / 15.0).round() as i32 * 3600;
        Ok(Self {
            latitude,
            longitude,
            altitude_m: 0.0,
            utc_offset_seconds,
        })
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Result<Self, ValidationError> {
        if !altitude_m.is_finite() {
            return Err(ValidationError::Altitude(altitude_m));
        }
        self.altitude_m = altitude_m;
        Ok(self)
    }

    pub fn with_utc_offset(mut self, seconds: i32) -> Result<Self, ValidationError> {
        if !(-MAX_UTC_OFFSET_S..=MAX_UTC_OFFSET_S).contains(&seconds) {
            return Err(ValidationError::UtcOffset(seconds));
        }
        self.utc_offset_seconds = seconds;
        Ok(self)
    }

    /// Re-checks a location that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Location::new(self.latitude, self.longitude)?
            .with_altitude(self.altitude_m)?
            .with_utc_offset(self.utc_offset_seconds)?;
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset, ValidationError> {
        FixedOffset::east_opt(self.utc_offset_seconds)
            .ok_or(ValidationError::UtcOffset(self.utc_offset_seconds))
    }

    /// Station pressure from altitude, standard atmosphere (Pa).
    pub fn pressure_pa(&self) -> f64 {
        100.0 * ((44331.514 - self.altitude_m) / 11880.516).powf(1.0 / 0.1902632)
    }
}

// ─── Derived samples ─────────────────────────────────────────────────────────

/// Sun position for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SolarPositionSample {
    pub timestamp: DateTime<FixedOffset>,
    /// Solar zenith angle (deg, 0 = overhead, ≥ 90 = below horizon)
    pub zenith_deg: f64,
    /// Solar azimuth (deg clockwise from north, [0, 360))
    pub azimuth_deg: f64,
    /// Extraterrestrial normal irradiance (W/m²)
    pub extraterrestrial_irradiance_w_m2: f64,
}

impl SolarPositionSample {
    pub fn is_below_horizon(&self) -> bool {
        self.zenith_deg >= 90.0
    }
}

/// Horizontal irradiance components for one timestamp.
/// `dhi == ghi - dni·cos(zenith)` holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct IrradianceSample {
    pub timestamp: DateTime<FixedOffset>,
    pub zenith_deg: f64,
    /// Global horizontal irradiance (W/m²)
    pub ghi_w_m2: f64,
    /// Direct normal irradiance (W/m²)
    pub dni_w_m2: f64,
    /// Diffuse horizontal irradiance (W/m²)
    pub dhi_w_m2: f64,
}

impl IrradianceSample {
    pub fn dark(timestamp: DateTime<FixedOffset>, zenith_deg: f64) -> Self {
        Self {
            timestamp,
            zenith_deg,
            ghi_w_m2: 0.0,
            dni_w_m2: 0.0,
            dhi_w_m2: 0.0,
        }
    }
}
