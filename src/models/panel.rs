use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Power temperature coefficient for typical c-Si (1/°C)
pub const GAMMA_PDC: f64 = -0.004;
/// PVWatts nominal inverter efficiency
pub const INVERTER_ETA_NOMINAL: f64 = 0.96;

/// Panel and inverter parameters as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PanelSpec {
    /// Total panel area (m²)
    pub area_m2: f64,
    /// Tilt from horizontal (deg, 0 = flat)
    pub tilt_deg: f64,
    /// Facing direction (deg clockwise from north, 180 = south)
    pub azimuth_deg: f64,
    /// Module efficiency as a fraction (0, 1]
    pub efficiency: f64,
    /// Inverter AC rating (W). Defaults to 96 % of the DC nameplate.
    #[serde(default)]
    pub inverter_rated_w: Option<f64>,
}

impl Default for PanelSpec {
    fn default() -> Self {
        Self {
            area_m2: 1.6,
            tilt_deg: 28.0,
            azimuth_deg: 180.0,
            efficiency: 0.20,
            inverter_rated_w: None,
        }
    }
}

/// Validated, immutable panel/inverter model for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PanelConfig {
    pub area_m2: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    pub efficiency: f64,
    /// DC nameplate, `area × efficiency × 1000 W/m²` (pdc0)
    pub rated_dc_power_w: f64,
    /// gamma_pdc (1/°C)
    pub temperature_coefficient_per_c: f64,
    /// AC clipping limit (W)
    pub inverter_rated_w: f64,
}

impl PanelConfig {
    pub fn new(spec: PanelSpec) -> Result<Self, ValidationError> {
        let PanelSpec {
            area_m2,
            tilt_deg,
            azimuth_deg,
            efficiency,
            inverter_rated_w,
        } = spec;

        if !area_m2.is_finite() || area_m2 <= 0.0 {
            return Err(ValidationError::PanelArea(area_m2));
        }
        if !efficiency.is_finite() || efficiency <= 0.0 || efficiency > 1.0 {
            return Err(ValidationError::PanelEfficiency(efficiency));
        }
        if !tilt_deg.is_finite() || !(0.0..=90.0).contains(&tilt_deg) {
            return Err(ValidationError::PanelTilt(tilt_deg));
        }
        if !azimuth_deg.is_finite() || !(0.0..360.0).contains(&azimuth_deg) {
            return Err(ValidationError::PanelAzimuth(azimuth_deg));
        }

        let rated_dc_power_w = area_m2 * efficiency * 1000.0;
        let inverter_rated_w = match inverter_rated_w {
            Some(w) if !w.is_finite() || w <= 0.0 => {
                return Err(ValidationError::InverterRating(w));
            }
            Some(w) => w,
            None => INVERTER_ETA_NOMINAL * rated_dc_power_w,
        };

        Ok(Self {
            area_m2,
            tilt_deg,
            azimuth_deg,
            efficiency,
            rated_dc_power_w,
            temperature_coefficient_per_c: GAMMA_PDC,
            inverter_rated_w,
        })
    }
}

impl TryFrom<PanelSpec> for PanelConfig {
    type Error = ValidationError;

    fn try_from(spec: PanelSpec) -> Result<Self, Self::Error> {
        PanelConfig::new(spec)
    }
}
