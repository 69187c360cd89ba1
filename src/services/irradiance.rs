//! GHI → DNI/DHI split with the DISC model.
//!
//! Maxwell, E. L. (1987). "A quasi-physical model for converting hourly
//! global horizontal to direct normal insolation". SERI/TR-215-3087.
//! <https://www.nrel.gov/grid/solar-resource/disc.html>

use crate::models::solar::{IrradianceSample, SolarPositionSample};
use crate::models::weather::WeatherSample;
use crate::services::clear_sky::STANDARD_PRESSURE_PA;
use crate::services::sanitize;

/// Floor on cos(zenith) when forming the clearness index
const MIN_COS_ZENITH: f64 = 0.065;
/// Beyond this zenith DNI is forced to 0 (deg)
const MAX_ZENITH_DEG: f64 = 87.0;
const MAX_AIRMASS: f64 = 12.0;

/// Kasten (1966) relative air mass, used by DISC.
fn relative_airmass_kasten(zenith_deg: f64) -> f64 {
    1.0 / (zenith_deg.to_radians().cos() + 0.15 * (93.885 - zenith_deg).powf(-1.253))
}

/// Hourly clearness index kt, clipped to [0, 1].
pub fn clearness_index(ghi: f64, zenith_deg: f64, dni_extra: f64) -> f64 {
    let cos_z = zenith_deg.to_radians().cos().max(MIN_COS_ZENITH);
    let horizontal_extra = dni_extra * cos_z;
    if horizontal_extra <= 0.0 {
        return 0.0;
    }
    sanitize(ghi / horizontal_extra).min(1.0)
}

/// Direct-normal transmittance Kn for a clearness index and air mass.
fn disc_kn(kt: f64, am: f64) -> f64 {
    let am = am.min(MAX_AIRMASS);
    let (kt2, kt3) = (kt * kt, kt * kt * kt);

    let (a, b, c) = if kt <= 0.6 {
        (
            0.512 - 1.56 * kt + 2.286 * kt2 - 2.222 * kt3,
            0.37 + 0.962 * kt,
            -0.28 + 0.932 * kt - 2.048 * kt2,
        )
    } else {
        (
            -5.743 + 21.77 * kt - 27.49 * kt2 + 11.56 * kt3,
            41.4 - 118.5 * kt + 66.05 * kt2 + 31.9 * kt3,
            -47.01 + 184.2 * kt - 222.0 * kt2 + 73.81 * kt3,
        )
    };
    let delta_kn = a + b * (c * am).exp();
    let knc = 0.866 - 0.122 * am + 0.0121 * am.powi(2) - 0.000653 * am.powi(3)
        + 0.000014 * am.powi(4);

    knc - delta_kn
}

/// Splits one GHI value into a sample. DHI is derived, never modelled.
pub fn decompose_one(ghi: f64, position: &SolarPositionSample, pressure_pa: f64) -> IrradianceSample {
    let zenith = position.zenith_deg;
    let ghi = sanitize(ghi);
    let dni_extra = position.extraterrestrial_irradiance_w_m2;

    if position.is_below_horizon() || dni_extra <= 0.0 || ghi == 0.0 {
        return IrradianceSample::dark(position.timestamp, zenith);
    }

    let cos_z = zenith.to_radians().cos();
    let dni = if zenith > MAX_ZENITH_DEG {
        0.0
    } else {
        let kt = clearness_index(ghi, zenith, dni_extra);
        let am = relative_airmass_kasten(zenith) * pressure_pa / STANDARD_PRESSURE_PA;
        // Beam on the horizontal may not exceed the global value
        sanitize(disc_kn(kt, am) * dni_extra).min(ghi / cos_z)
    };
    let dhi = sanitize(ghi - dni * cos_z);

    IrradianceSample {
        timestamp: position.timestamp,
        zenith_deg: zenith,
        ghi_w_m2: ghi,
        dni_w_m2: dni,
        dhi_w_m2: dhi,
    }
}

/// DISC decomposition of a GHI series aligned with `positions`.
pub fn decompose(
    ghi: &[f64],
    positions: &[SolarPositionSample],
    pressure_pa: f64,
) -> Vec<IrradianceSample> {
    ghi.iter()
        .zip(positions)
        .map(|(g, p)| decompose_one(*g, p, pressure_pa))
        .collect()
}

/// Clear-sky GHI dimmed by the cloud cover reported for the same timestamp.
/// Timestamps without weather keep the clear-sky value.
pub fn cloud_attenuated(
    ghi_clear: &[f64],
    positions: &[SolarPositionSample],
    weather: &[WeatherSample],
) -> Vec<f64> {
    ghi_clear
        .iter()
        .zip(positions)
        .map(|(g, p)| {
            weather
                .iter()
                .find(|w| w.timestamp == p.timestamp)
                .map_or(*g, |w| g * w.clear_fraction())
        })
        .collect()
}
