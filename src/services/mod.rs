pub mod aggregator;
pub mod cache;
pub mod clear_sky;
pub mod geocoder;
pub mod irradiance;
pub mod power_service;
pub mod pv_model;
pub mod solar_geometry;
pub mod timeline;
pub mod weather_service;

/// Non-finite or negative model output collapses to 0.
pub fn sanitize(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 { x } else { 0.0 }
}
