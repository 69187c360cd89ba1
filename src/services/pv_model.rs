/// ============================================================
///  Panel / inverter performance
///
///   1. Plane-of-array  – dni·cos z + dhi (no transposition, no IAM)
///   2. Cell temperature – SAPM, open-rack glass/glass
///   3. DC power        – P = pdc0 × (G_poa/1000) × (1 + γ (T_cell − 25))
///   4. AC power        – PVWatts inverter curve, clipped at the AC rating
/// ============================================================

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::models::panel::{INVERTER_ETA_NOMINAL, PanelConfig};
use crate::models::power::PowerSample;
use crate::models::solar::IrradianceSample;
use crate::models::weather::WeatherSample;
use crate::services::sanitize;

// ─── SAPM thermal parameters (open_rack_glass_glass) ─────────
const SAPM_A: f64 = -3.47;
const SAPM_B: f64 = -0.0594;
const SAPM_DELTA_T: f64 = 3.0;

/// PVWatts reference inverter efficiency
const INVERTER_ETA_REFERENCE: f64 = 0.9637;
/// Reference cell temperature for the DC model (°C)
const T_REF_C: f64 = 25.0;

/// Irradiance reaching the panel (W/m²).
pub fn plane_of_array(sample: &IrradianceSample) -> f64 {
    let cos_z = sample.zenith_deg.to_radians().cos().max(0.0);
    sanitize(sample.dni_w_m2 * cos_z + sample.dhi_w_m2)
}

/// SAPM cell temperature (°C). Equals ambient when `poa` is 0.
pub fn cell_temperature(poa: f64, temp_air_c: f64, wind_speed_ms: f64) -> f64 {
    let module_temp = poa * (SAPM_A + SAPM_B * wind_speed_ms).exp() + temp_air_c;
    module_temp + poa / 1000.0 * SAPM_DELTA_T
}

/// PVWatts DC output (W), never negative.
pub fn dc_power(poa: f64, cell_temp_c: f64, panel: &PanelConfig) -> f64 {
    let temp_factor = 1.0 + panel.temperature_coefficient_per_c * (cell_temp_c - T_REF_C);
    sanitize(panel.rated_dc_power_w * (poa / 1000.0) * temp_factor)
}

/// Part-load inverter efficiency at `zeta = dc / pdc0`.
pub fn inverter_efficiency(zeta: f64) -> f64 {
    if zeta <= 0.0 {
        return 0.0;
    }
    let eta = INVERTER_ETA_NOMINAL / INVERTER_ETA_REFERENCE * (-0.0162 * zeta - 0.0059 / zeta + 0.9858);
    eta.max(0.0)
}

/// AC output (W) in `[0, inverter_rated_w]`.
pub fn ac_power(dc: f64, panel: &PanelConfig) -> f64 {
    if dc <= 0.0 {
        return 0.0;
    }
    let zeta = dc / panel.rated_dc_power_w;
    sanitize(dc * inverter_efficiency(zeta)).min(panel.inverter_rated_w)
}

/// Power series for every irradiance sample that has weather at the same instant.
/// Samples without weather are left out.
pub fn simulate(
    irradiance: &[IrradianceSample],
    weather: &[WeatherSample],
    panel: &PanelConfig,
) -> Vec<PowerSample> {
    let by_time: HashMap<DateTime<FixedOffset>, WeatherSample> = weather
        .iter()
        .filter_map(|w| w.sanitized())
        .map(|w| (w.timestamp, w))
        .collect();

    irradiance
        .iter()
        .filter_map(|irr| {
            let w = by_time.get(&irr.timestamp)?;
            let poa = plane_of_array(irr);
            let cell_temp_c = cell_temperature(poa, w.temp_air_c, w.wind_speed_ms);
            let dc_power_w = dc_power(poa, cell_temp_c, panel);
            let ac_power_w = ac_power(dc_power_w, panel);

            #[cfg(feature = "verbose_log")]
            tracing::trace!(
                "[PV] {} | POA: {:.0} W/m² | Cell: {:.1}°C | DC: {:.0} W | AC: {:.0} W",
                irr.timestamp, poa, cell_temp_c, dc_power_w, ac_power_w
            );

            Some(PowerSample {
                timestamp: irr.timestamp,
                poa_irradiance_w_m2: poa,
                cell_temp_c,
                dc_power_w,
                ac_power_w,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::panel::PanelSpec;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn panel(area: f64, eff: f64, inverter: Option<f64>) -> PanelConfig {
        PanelConfig::new(PanelSpec {
            area_m2: area,
            tilt_deg: 30.0,
            azimuth_deg: 180.0,
            efficiency: eff,
            inverter_rated_w: inverter,
        })
        .unwrap()
    }

    fn t0() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    fn irr(ts: DateTime<FixedOffset>, ghi: f64, dni: f64, zenith_deg: f64) -> IrradianceSample {
        let dhi = ghi - dni * zenith_deg.to_radians().cos();
        IrradianceSample { timestamp: ts, zenith_deg, ghi_w_m2: ghi, dni_w_m2: dni, dhi_w_m2: dhi }
    }

    fn wx(ts: DateTime<FixedOffset>, temp: f64, wind: f64) -> WeatherSample {
        WeatherSample { timestamp: ts, temp_air_c: temp, wind_speed_ms: wind, cloud_cover_pct: 0.0 }
    }

    #[test]
    fn test_flat_poa_equals_ghi() {
        let s = irr(t0(), 900.0, 700.0, 25.0);
        assert_relative_eq!(plane_of_array(&s), 900.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cell_temperature() {
        assert_eq!(cell_temperature(0.0, 12.5, 3.0), 12.5);
        let calm = cell_temperature(1000.0, 25.0, 0.0);
        let windy = cell_temperature(1000.0, 25.0, 10.0);
        assert!(calm > windy && windy > 25.0);
        // e^-3.47 ≈ 0.0311 → ~31 K + 3 K above ambient at 1 kW/m², still air
        assert!((calm - 59.1).abs() < 0.5, "calm {calm}");
    }

    #[test]
    fn test_dc_power_temperature_derate() {
        let p = panel(10.0, 0.2, None);
        assert_relative_eq!(dc_power(1000.0, 25.0, &p), 2000.0);
        assert!(dc_power(1000.0, 50.0, &p) < 2000.0);
        assert!(dc_power(1000.0, 0.0, &p) > 2000.0);
        // absurd cell temperatures cannot drive the output negative
        assert_eq!(dc_power(1000.0, 400.0, &p), 0.0);
    }

    #[test]
    fn test_ac_curve_and_clipping() {
        let p = panel(10.0, 0.2, None);
        assert_eq!(ac_power(0.0, &p), 0.0);
        let half = ac_power(1000.0, &p);
        assert!(half > 950.0 && half < 1000.0, "half load {half}");
        // Nameplate DC input saturates at the 96 % AC rating
        assert_relative_eq!(ac_power(2000.0, &p), p.inverter_rated_w, epsilon = 1e-6);

        let small_inverter = panel(10.0, 0.2, Some(1200.0));
        assert_eq!(ac_power(1800.0, &small_inverter), 1200.0);
    }

    #[test]
    fn test_inverter_efficiency_shape() {
        assert_eq!(inverter_efficiency(0.0), 0.0);
        assert!(inverter_efficiency(0.05) < inverter_efficiency(0.5));
        assert_relative_eq!(inverter_efficiency(1.0), 0.96, epsilon = 1e-3);
    }

    #[test]
    fn test_full_sun_at_25c_stays_below_scaled_nameplate() {
        let p = panel(10.0, 0.2, None);
        let s = irr(t0(), 1000.0, 850.0, 10.0);
        let out = simulate(&[s], &[wx(t0(), 25.0, 1.0)], &p);
        let poa = out[0].poa_irradiance_w_m2;
        assert!(out[0].dc_power_w > 0.0);
        assert!(out[0].dc_power_w <= p.rated_dc_power_w * poa / 1000.0);
        assert!(out[0].ac_power_w <= p.inverter_rated_w);
    }

    #[test]
    fn test_left_join_skips_unmatched_timestamps() {
        let p = panel(1.6, 0.2, None);
        let t1 = t0() + Duration::hours(1);
        let t2 = t0() + Duration::hours(2);
        let irradiance = [irr(t0(), 800.0, 600.0, 30.0), irr(t1, 700.0, 500.0, 35.0), irr(t2, 600.0, 400.0, 40.0)];
        let weather = [wx(t0(), 20.0, 2.0), wx(t2, 21.0, 2.0), wx(t1, f64::NAN, 2.0)];

        let out = simulate(&irradiance, &weather, &p);
        let stamps: Vec<_> = out.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![t0(), t2]);
    }

    #[test]
    fn test_bounds_hold_for_extreme_inputs() {
        let p = panel(5.0, 0.22, Some(900.0));
        let samples: Vec<_> = (0..24)
            .map(|h| irr(t0() + Duration::hours(h), 100.0 * h as f64, 60.0 * h as f64, 10.0 + 3.0 * h as f64))
            .collect();
        let weather: Vec<_> = samples.iter().map(|s| wx(s.timestamp, -30.0, 0.0)).collect();
        for s in simulate(&samples, &weather, &p) {
            assert!(s.dc_power_w >= 0.0);
            assert!(s.ac_power_w >= 0.0 && s.ac_power_w <= 900.0);
        }
    }
}
