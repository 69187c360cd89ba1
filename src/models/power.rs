use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::panel::PanelSpec;
use crate::models::solar::{IrradianceSample, Location};
use crate::models::weather::WeatherSample;

/// Longest range a single run accepts (5 years of daily buckets).
pub const MAX_RANGE_DAYS: u32 = 1825;

// ─── Simulation output ───────────────────────────────────────────────────────

/// Panel and inverter state for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PowerSample {
    pub timestamp: DateTime<FixedOffset>,
    /// Plane-of-array irradiance driving the panel (W/m²)
    pub poa_irradiance_w_m2: f64,
    /// Cell temperature (°C)
    pub cell_temp_c: f64,
    /// DC power before the inverter (W)
    pub dc_power_w: f64,
    /// AC power after conversion and clipping (W)
    pub ac_power_w: f64,
}

/// Energy produced on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyEnergy {
    pub date: NaiveDate,
    pub energy_kwh: f64,
    /// Set when no usable weather reached the day; energy is then 0
    pub gap: bool,
    pub gap_reason: Option<String>,
}

impl DailyEnergy {
    pub fn produced(date: NaiveDate, energy_kwh: f64) -> Self {
        Self {
            date,
            energy_kwh,
            gap: false,
            gap_reason: None,
        }
    }

    pub fn gap(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            date,
            energy_kwh: 0.0,
            gap: true,
            gap_reason: Some(reason.into()),
        }
    }
}

/// Plant KPIs over the whole range.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PerformanceSummary {
    /// Highest AC output seen (W)
    pub peak_ac_power_w: f64,
    /// Specific yield = total kWh / kWp
    pub specific_yield_kwh_kwp: f64,
    /// Energy over nameplate energy across non-gap days (%)
    pub capacity_factor_percent: f64,
    /// Days recorded as gaps
    pub gap_days: usize,
}

/// Chronological series and energy totals for a full range.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SimulationResult {
    pub location: Location,
    pub start_date: NaiveDate,
    pub num_days: u32,
    pub power: Vec<PowerSample>,
    pub irradiance: Vec<IrradianceSample>,
    pub weather: Vec<WeatherSample>,
    pub daily_energy: Vec<DailyEnergy>,
    pub total_energy_kwh: f64,
    pub summary: PerformanceSummary,
}

impl SimulationResult {
    pub fn gap_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.daily_energy.iter().filter(|d| d.gap).map(|d| d.date)
    }
}

// ─── Named analysis ranges ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AnalysisRange {
    #[serde(rename = "Single Day")]
    SingleDay,
    #[serde(rename = "7 Days")]
    Week,
    #[serde(rename = "15 Days")]
    Fortnight,
    #[serde(rename = "30 Days")]
    Month,
    #[serde(rename = "90 Days")]
    Quarter,
    #[serde(rename = "1 Year")]
    Year,
    #[serde(rename = "5 Years")]
    FiveYears,
}

impl AnalysisRange {
    pub fn days(self) -> u32 {
        match self {
            AnalysisRange::SingleDay => 1,
            AnalysisRange::Week => 7,
            AnalysisRange::Fortnight => 15,
            AnalysisRange::Month => 30,
            AnalysisRange::Quarter => 90,
            AnalysisRange::Year => 365,
            AnalysisRange::FiveYears => MAX_RANGE_DAYS,
        }
    }
}

// ─── REST API types ──────────────────────────────────────────────────────────

/// Either `place` or both coordinates; either `range` or `num_days`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulationRequest {
    pub place: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub utc_offset_seconds: Option<i32>,
    pub start_date: NaiveDate,
    pub range: Option<AnalysisRange>,
    pub num_days: Option<i64>,
    pub panel: PanelSpec,
    /// Client-chosen handle for cancelling the run
    pub run_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SimulationResponse {
    pub run_id: String,
    pub place: Option<String>,
    pub result: SimulationResult,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GeocodeQuery {
    /// Free-text place name
    pub q: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub active_runs: usize,
    pub cache_enabled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}
