//! Ineichen–Perez clear-sky irradiance.
//!
//! References:
//! - Ineichen, P. and Perez, R. (2002). "A new airmass independent formulation
//!   for the Linke turbidity coefficient"
//! - Kasten, F. and Young, A. T. (1989). "Revised optical air mass tables and
//!   approximation formula"

use crate::models::solar::{Location, SolarPositionSample};
use crate::services::sanitize;

/// Linke turbidity used for every site and season
pub const DEFAULT_LINKE_TURBIDITY: f64 = 3.0;
/// Sea-level standard pressure (Pa)
pub const STANDARD_PRESSURE_PA: f64 = 101_325.0;

/// Clear-sky components on the horizontal (W/m²). Only `ghi` feeds the
/// simulation; the beam split is derived by DISC downstream.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearSky {
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
}

/// Clear-sky GHI for each position, in input order.
pub fn compute(location: &Location, positions: &[SolarPositionSample]) -> Vec<f64> {
    let pressure = location.pressure_pa();
    positions
        .iter()
        .map(|p| {
            ineichen_ghi(
                p.zenith_deg,
                p.extraterrestrial_irradiance_w_m2,
                location.altitude_m,
                pressure,
                DEFAULT_LINKE_TURBIDITY,
            )
        })
        .collect()
}

/// Kasten–Young (1989) relative air mass; `None` with the sun below the horizon.
pub fn relative_airmass_kasten_young(zenith_deg: f64) -> Option<f64> {
    if !(0.0..90.0).contains(&zenith_deg) {
        return None;
    }
    Some(1.0 / (zenith_deg.to_radians().cos() + 0.50572 * (96.07995 - zenith_deg).powf(-1.6364)))
}

/// Ineichen–Perez global horizontal irradiance alone (W/m²).
pub fn ineichen_ghi(
    zenith_deg: f64,
    dni_extra: f64,
    altitude_m: f64,
    pressure_pa: f64,
    linke_turbidity: f64,
) -> f64 {
    let Some(am_rel) = relative_airmass_kasten_young(zenith_deg) else {
        return 0.0;
    };
    let am = am_rel * pressure_pa / STANDARD_PRESSURE_PA;
    let cos_z = zenith_deg.to_radians().cos().max(0.0);
    let fh1 = (-altitude_m / 8000.0).exp();
    let fh2 = (-altitude_m / 1250.0).exp();
    let cg1 = 5.09e-05 * altitude_m + 0.868;
    let cg2 = 3.92e-05 * altitude_m + 0.0387;

    sanitize(cg1 * dni_extra * cos_z * (-cg2 * am * (fh1 + fh2 * (linke_turbidity - 1.0))).exp())
}

/// Full Ineichen–Perez split including the clear-sky beam.
pub fn ineichen(
    zenith_deg: f64,
    dni_extra: f64,
    altitude_m: f64,
    pressure_pa: f64,
    linke_turbidity: f64,
) -> ClearSky {
    let Some(am_rel) = relative_airmass_kasten_young(zenith_deg) else {
        return ClearSky::default();
    };
    let am = am_rel * pressure_pa / STANDARD_PRESSURE_PA;
    let cos_z = zenith_deg.to_radians().cos().max(0.0);
    let tl = linke_turbidity;
    let fh1 = (-altitude_m / 8000.0).exp();

    let ghi = ineichen_ghi(zenith_deg, dni_extra, altitude_m, pressure_pa, tl);

    // Beam: min of the normal-beam law and the empirical correction
    let b = 0.664 + 0.163 / fh1;
    let bnci = dni_extra * (b * (-0.09 * am * (tl - 1.0)).exp()).max(0.0);
    let bnci_2 = if cos_z > 0.0 {
        ghi * ((1.0 - (0.1 - 0.2 * (-tl).exp()) / (0.1 + 0.882 / fh1)) / cos_z).clamp(0.0, 1e20)
    } else {
        0.0
    };
    let dni = bnci.min(bnci_2);
    let dhi = ghi - dni * cos_z;

    ClearSky {
        ghi: sanitize(ghi),
        dni: sanitize(dni),
        dhi: sanitize(dhi),
    }
}
