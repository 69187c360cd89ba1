/// ============================================================
///  Solar geometry
///
///   1. Day angle          – from the UTC day of year
///   2. Declination / EoT  – Spencer (1971) Fourier series
///   3. Hour angle         – true solar time from UT + longitude + EoT
///   4. Zenith / azimuth   – spherical trigonometry on (φ, δ, ω)
///   5. Extraterrestrial   – eccentricity-corrected solar constant
/// ============================================================

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use std::f64::consts::PI;

use crate::error::ValidationError;
use crate::models::solar::{Location, SolarPositionSample};

// ─── Physical constants ──────────────────────────────────────
pub const SOLAR_CONSTANT: f64 = 1361.0; // W/m²

/// Sun position for every timestamp, in input order.
pub fn compute(
    location: &Location,
    timestamps: &[DateTime<FixedOffset>],
) -> Result<Vec<SolarPositionSample>, ValidationError> {
    location.validate()?;
    Ok(timestamps
        .iter()
        .map(|ts| position(location.latitude, location.longitude, *ts))
        .collect())
}

/// Sun position for one instant.
pub fn position(lat_deg: f64, lon_deg: f64, timestamp: DateTime<FixedOffset>) -> SolarPositionSample {
    let utc = timestamp.with_timezone(&Utc);
    let doy = utc.ordinal() as f64;
    let ut_h = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;

    let b = day_angle(doy);
    let decl = declination(b);

    // True solar time (h) and hour angle (negative before noon)
    let tst_h = ut_h + lon_deg / 15.0 + equation_of_time_min(b) / 60.0;
    let omega = (15.0 * (tst_h - 12.0)).to_radians();

    let lat = lat_deg.to_radians();
    let cos_z = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos()).clamp(-1.0, 1.0);
    let zenith_deg = cos_z.acos().to_degrees();

    // Azimuth from north, clockwise
    let az_south = omega
        .sin()
        .atan2(omega.cos() * lat.sin() - decl.tan() * lat.cos());
    let azimuth_deg = (az_south.to_degrees() + 180.0).rem_euclid(360.0);

    SolarPositionSample {
        timestamp,
        zenith_deg,
        azimuth_deg,
        extraterrestrial_irradiance_w_m2: extraterrestrial_normal(b),
    }
}

#[inline]
fn day_angle(doy: f64) -> f64 {
    2.0 * PI * (doy - 1.0) / 365.0
}

/// Declination (rad), Spencer 1971
fn declination(b: f64) -> f64 {
    0.006918 - 0.399912 * b.cos() + 0.070257 * b.sin() - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin()
}

/// Equation of time (minutes), Spencer 1971
fn equation_of_time_min(b: f64) -> f64 {
    229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin())
}

/// Extraterrestrial normal irradiance (W/m²)
fn extraterrestrial_normal(b: f64) -> f64 {
    SOLAR_CONSTANT
        * (1.00011 + 0.034221 * b.cos() + 0.00128 * b.sin() + 0.000719 * (2.0 * b).cos()
            + 0.000077 * (2.0 * b).sin())
}
