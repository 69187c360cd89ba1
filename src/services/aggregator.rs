use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use futures_util::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::error::{FetchError, SimulationError, ValidationError};
use crate::models::panel::PanelConfig;
use crate::models::power::{DailyEnergy, PerformanceSummary, PowerSample, SimulationResult};
use crate::models::solar::{IrradianceSample, Location, SolarPositionSample};
use crate::models::weather::WeatherSample;
use crate::services::weather_service::WeatherProvider;
use crate::services::{clear_sky, irradiance, pv_model, solar_geometry, timeline};

/// Cooperative abort signal, checked before each day is fetched and computed.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// In-flight weather fetches; values below 1 are treated as 1
    pub max_concurrent_fetches: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { max_concurrent_fetches: 4 }
    }
}

/// Sun positions and clear-sky GHI for one day. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct ClearSkyDay {
    pub date: NaiveDate,
    pub positions: Vec<SolarPositionSample>,
    pub ghi_clear: Vec<f64>,
}

pub fn clear_sky_day(location: &Location, date: NaiveDate) -> Result<ClearSkyDay, ValidationError> {
    let timestamps = timeline::day_timestamps(date, location.offset()?)?;
    let positions = solar_geometry::compute(location, &timestamps)?;
    let ghi_clear = clear_sky::compute(location, &positions);
    Ok(ClearSkyDay {
        date,
        positions,
        ghi_clear,
    })
}

/// Everything one day contributes to the result.
#[derive(Debug, Clone)]
pub struct DayOutcome {
    pub index: usize,
    pub irradiance: Vec<IrradianceSample>,
    pub weather: Vec<WeatherSample>,
    pub power: Vec<PowerSample>,
    pub energy: DailyEnergy,
}

/// Hourly-sum integration of AC power (kWh).
pub fn integrate_energy_kwh(power: &[PowerSample]) -> f64 {
    power
        .iter()
        .map(|p| p.ac_power_w * timeline::STEP_HOURS)
        .sum::<f64>()
        / 1000.0
}

/// Compute stage for one day, given what the fetch stage handed over.
/// A failed or empty fetch turns the day into a zero-energy gap.
pub fn simulate_day(
    index: usize,
    location: &Location,
    panel: &PanelConfig,
    clear: ClearSkyDay,
    fetched: Result<Vec<WeatherSample>, FetchError>,
) -> DayOutcome {
    let pressure = location.pressure_pa();
    let date = clear.date;

    let mut weather: Vec<WeatherSample> = match fetched {
        Ok(samples) => samples.into_iter().filter_map(WeatherSample::sanitized).collect(),
        Err(e) => {
            warn!("[GAP] {} | weather fetch failed: {}", date, e);
            return gap_day(index, &clear, pressure, Vec::new(), e.to_string());
        }
    };
    weather.sort_by_key(|w| w.timestamp);
    if weather.is_empty() {
        warn!("[GAP] {} | weather provider returned no usable samples", date);
        return gap_day(index, &clear, pressure, weather, FetchError::Empty(date).to_string());
    }

    let ghi = irradiance::cloud_attenuated(&clear.ghi_clear, &clear.positions, &weather);
    let irradiance = irradiance::decompose(&ghi, &clear.positions, pressure);
    let power = pv_model::simulate(&irradiance, &weather, panel);
    if power.is_empty() {
        warn!("[GAP] {} | weather timestamps do not match the day grid", date);
        return gap_day(index, &clear, pressure, weather, "weather not aligned with the day grid");
    }

    let energy_kwh = integrate_energy_kwh(&power);
    debug!("[DAY] {} | {} samples | {:.3} kWh", date, power.len(), energy_kwh);

    DayOutcome {
        index,
        irradiance,
        weather,
        power,
        energy: DailyEnergy::produced(date, energy_kwh),
    }
}

fn gap_day(
    index: usize,
    clear: &ClearSkyDay,
    pressure: f64,
    weather: Vec<WeatherSample>,
    reason: impl Into<String>,
) -> DayOutcome {
    DayOutcome {
        index,
        irradiance: irradiance::decompose(&clear.ghi_clear, &clear.positions, pressure),
        weather,
        power: Vec::new(),
        energy: DailyEnergy::gap(clear.date, reason),
    }
}

/// Drives the pipeline over `[start_date, start_date + num_days)`.
///
/// Weather is fetched with at most `options.max_concurrent_fetches` requests in
/// flight; each fetched day is handed to the pure compute stage as it arrives
/// and the outcomes are put back in date order before assembly.
pub async fn run<P: WeatherProvider + ?Sized>(
    location: &Location,
    start_date: NaiveDate,
    num_days: u32,
    panel: &PanelConfig,
    provider: &P,
    options: RunOptions,
    cancel: &CancelFlag,
) -> Result<SimulationResult, SimulationError> {
    location.validate()?;
    let days = timeline::day_list(start_date, num_days)?;

    info!(
        "[RUN] ({:.4}, {:.4}) | {} + {} days | pdc0 {:.0} W | AC limit {:.0} W",
        location.latitude, location.longitude, start_date, num_days,
        panel.rated_dc_power_w, panel.inverter_rated_w
    );

    let mut handoffs = stream::iter(days.iter().copied().enumerate())
        .map(|(index, date)| async move {
            if cancel.is_cancelled() {
                return None;
            }
            Some((index, date, provider.fetch(location, date).await))
        })
        .buffer_unordered(options.max_concurrent_fetches.max(1));

    let mut outcomes = Vec::with_capacity(days.len());
    while let Some(handoff) = handoffs.next().await {
        if cancel.is_cancelled() {
            warn!("[RUN] cancelled after {} of {} days", outcomes.len(), days.len());
            return Err(SimulationError::Cancelled);
        }
        let Some((index, date, fetched)) = handoff else {
            continue;
        };
        let clear = clear_sky_day(location, date)?;
        outcomes.push(simulate_day(index, location, panel, clear, fetched));
    }
    if cancel.is_cancelled() {
        return Err(SimulationError::Cancelled);
    }

    outcomes.sort_by_key(|o| o.index);
    let result = assemble(location, start_date, num_days, panel, outcomes);

    info!(
        "[RUN] done | total {:.2} kWh | peak {:.0} W | gaps {}",
        result.total_energy_kwh, result.summary.peak_ac_power_w, result.summary.gap_days
    );
    Ok(result)
}

/// Concatenates date-ordered day outcomes and reduces them to totals.
pub fn assemble(
    location: &Location,
    start_date: NaiveDate,
    num_days: u32,
    panel: &PanelConfig,
    outcomes: Vec<DayOutcome>,
) -> SimulationResult {
    let hours = outcomes.len() * timeline::HOURS_PER_DAY as usize;
    let mut power = Vec::with_capacity(hours);
    let mut irradiance = Vec::with_capacity(hours);
    let mut weather = Vec::with_capacity(hours);
    let mut daily_energy = Vec::with_capacity(outcomes.len());

    for day in outcomes {
        power.extend(day.power);
        irradiance.extend(day.irradiance);
        weather.extend(day.weather);
        daily_energy.push(day.energy);
    }

    let total_energy_kwh: f64 = daily_energy.iter().map(|d| d.energy_kwh).sum();
    let summary = summarize(&power, &daily_energy, total_energy_kwh, panel);

    SimulationResult {
        location: *location,
        start_date,
        num_days,
        power,
        irradiance,
        weather,
        daily_energy,
        total_energy_kwh,
        summary,
    }
}

fn summarize(
    power: &[PowerSample],
    daily: &[DailyEnergy],
    total_energy_kwh: f64,
    panel: &PanelConfig,
) -> PerformanceSummary {
    let kwp = panel.rated_dc_power_w / 1000.0;
    let gap_days = daily.iter().filter(|d| d.gap).count();
    let producing_days = daily.len() - gap_days;

    let capacity_factor_percent = if producing_days > 0 {
        total_energy_kwh / (kwp * timeline::HOURS_PER_DAY as f64 * producing_days as f64) * 100.0
    } else {
        0.0
    };

    PerformanceSummary {
        peak_ac_power_w: power.iter().map(|p| p.ac_power_w).fold(0.0, f64::max),
        specific_yield_kwh_kwp: total_energy_kwh / kwp,
        capacity_factor_percent,
        gap_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::panel::PanelSpec;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Mild, clear weather on every day except the listed ones.
    struct FakeWeather {
        missing: Vec<NaiveDate>,
        calls: AtomicUsize,
    }

    impl FakeWeather {
        fn new(missing: Vec<NaiveDate>) -> Self {
            Self { missing, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn fetch(&self, location: &Location, date: NaiveDate) -> Result<Vec<WeatherSample>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.missing.contains(&date) {
                return Err(FetchError::Status(503));
            }
            let ts = timeline::day_timestamps(date, location.offset()?)?;
            Ok(ts
                .into_iter()
                .map(|t| WeatherSample { timestamp: t, temp_air_c: 20.0, wind_speed_ms: 2.0, cloud_cover_pct: 0.0 })
                .collect())
        }
    }

    fn panel() -> PanelConfig {
        PanelConfig::new(PanelSpec { area_m2: 10.0, efficiency: 0.2, ..PanelSpec::default() }).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_gap_day_does_not_abort_range() {
        let loc = Location::new(45.07, 7.68).unwrap();
        let provider = FakeWeather::new(vec![date(2024, 6, 2)]);
        let result = run(&loc, date(2024, 6, 1), 3, &panel(), &provider, RunOptions::default(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(result.daily_energy.len(), 3);
        assert!(!result.daily_energy[0].gap && result.daily_energy[0].energy_kwh > 0.0);
        assert!(result.daily_energy[1].gap);
        assert_eq!(result.daily_energy[1].energy_kwh, 0.0);
        assert!(result.daily_energy[2].energy_kwh > 0.0);
        assert_eq!(result.gap_dates().collect::<Vec<_>>(), vec![date(2024, 6, 2)]);
        // Irradiance stays complete across the gap, power does not
        assert_eq!(result.irradiance.len(), 72);
        assert_eq!(result.power.len(), 48);
        assert_eq!(result.summary.gap_days, 1);
    }

    #[tokio::test]
    async fn test_series_are_chronological_under_concurrency() {
        let loc = Location::new(-33.9, 18.4).unwrap();
        let provider = FakeWeather::new(vec![]);
        let opts = RunOptions { max_concurrent_fetches: 8 };
        let result = run(&loc, date(2024, 12, 30), 5, &panel(), &provider, opts, &CancelFlag::new())
            .await
            .unwrap();

        assert!(result.power.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(result.irradiance.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(result.weather.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        let dates: Vec<_> = result.daily_energy.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2024, 12, 30), date(2024, 12, 31), date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let loc = Location::new(45.07, 7.68).unwrap();
        let provider = FakeWeather::new(vec![]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = run(&loc, date(2024, 1, 1), 365, &panel(), &provider, RunOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, SimulationError::Cancelled);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_range() {
        let loc = Location::new(45.07, 7.68).unwrap();
        let provider = FakeWeather::new(vec![]);
        let err = run(&loc, date(2024, 1, 1), 0, &panel(), &provider, RunOptions::default(), &CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::Configuration(ValidationError::DayCount { got: 0, .. })));
    }

    #[test]
    fn test_day_at_calendar_end_is_rejected() {
        let loc = Location::new(0.0, -75.0).unwrap();
        assert_eq!(
            clear_sky_day(&loc, NaiveDate::MAX).unwrap_err(),
            ValidationError::DateOverflow(NaiveDate::MAX)
        );
    }

    #[test]
    fn test_empty_weather_is_a_gap() {
        let loc = Location::new(0.0, 0.0).unwrap();
        let clear = clear_sky_day(&loc, date(2024, 3, 20)).unwrap();
        let out = simulate_day(0, &loc, &panel(), clear, Ok(Vec::new()));
        assert!(out.energy.gap);
        assert_eq!(out.irradiance.len(), 24);
        assert!(out.power.is_empty());
    }

    #[test]
    fn test_misaligned_weather_is_a_gap() {
        let loc = Location::new(0.0, 0.0).unwrap();
        let clear = clear_sky_day(&loc, date(2024, 3, 20)).unwrap();
        let stray = clear.positions[12].timestamp + chrono::Duration::minutes(17);
        let w = WeatherSample { timestamp: stray, temp_air_c: 25.0, wind_speed_ms: 1.0, cloud_cover_pct: 0.0 };
        let out = simulate_day(0, &loc, &panel(), clear, Ok(vec![w]));
        assert!(out.energy.gap);
        assert_eq!(out.weather.len(), 1);
    }

    #[test]
    fn test_overcast_day_yields_less() {
        let loc = Location::new(0.0, 0.0).unwrap();
        let day = date(2024, 3, 20);
        let weather = |cloud: f64| -> Vec<WeatherSample> {
            timeline::day_timestamps(day, loc.offset().unwrap())
                .unwrap()
                .into_iter()
                .map(|t| WeatherSample { timestamp: t, temp_air_c: 25.0, wind_speed_ms: 1.0, cloud_cover_pct: cloud })
                .collect()
        };
        let sunny = simulate_day(0, &loc, &panel(), clear_sky_day(&loc, day).unwrap(), Ok(weather(0.0)));
        let grey = simulate_day(0, &loc, &panel(), clear_sky_day(&loc, day).unwrap(), Ok(weather(90.0)));
        assert!(grey.energy.energy_kwh < sunny.energy.energy_kwh * 0.2);
        assert!(sunny.energy.energy_kwh > 5.0 && sunny.energy.energy_kwh < 18.0, "{}", sunny.energy.energy_kwh);
    }

    #[test]
    fn test_energy_is_hourly_sum() {
        let loc = Location::new(0.0, 0.0).unwrap();
        let clear = clear_sky_day(&loc, date(2024, 3, 20)).unwrap();
        let ts = clear.positions[0].timestamp;
        let p = |w: f64| PowerSample { timestamp: ts, poa_irradiance_w_m2: 0.0, cell_temp_c: 20.0, dc_power_w: w, ac_power_w: w };
        assert_eq!(integrate_energy_kwh(&[p(500.0), p(1500.0)]), 2.0);
        assert_eq!(integrate_energy_kwh(&[]), 0.0);
    }

    #[test]
    fn test_summary_kpis() {
        let loc = Location::new(0.0, 0.0).unwrap();
        let cfg = panel();
        let day = |i: usize, kwh: f64, gap: bool| DayOutcome {
            index: i,
            irradiance: vec![],
            weather: vec![],
            power: vec![],
            energy: if gap {
                DailyEnergy::gap(date(2024, 1, 1 + i as u32), "x")
            } else {
                DailyEnergy::produced(date(2024, 1, 1 + i as u32), kwh)
            },
        };
        let r = assemble(&loc, date(2024, 1, 1), 3, &cfg, vec![day(0, 4.8, false), day(1, 0.0, true), day(2, 9.6, false)]);
        assert_eq!(r.total_energy_kwh, 4.8 + 0.0 + 9.6);
        assert!((r.summary.specific_yield_kwh_kwp - 7.2).abs() < 1e-9);
        // 14.4 kWh over 2 kWp × 48 h
        assert!((r.summary.capacity_factor_percent - 15.0).abs() < 1e-9);
        assert_eq!(r.summary.gap_days, 1);
    }
}
