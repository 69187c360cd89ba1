use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::error::{EngineError, SimulationError, ValidationError};
use crate::models::panel::{PanelConfig, PanelSpec};
use crate::models::power::{AnalysisRange, SimulationRequest, SimulationResult};
use crate::models::solar::Location;
use crate::services::aggregator::{self, CancelFlag, RunOptions};
use crate::services::geocoder::Geocoder;
use crate::services::timeline;
use crate::services::weather_service::WeatherProvider;

/// ============================================================================
/// Engine boundary
///
/// One call per user-triggered recomputation. Weather provider and geocoder are
/// trait objects; caching and retries are decided by whoever builds the engine.
/// ============================================================================
pub struct Engine {
    provider: Arc<dyn WeatherProvider>,
    geocoder: Arc<dyn Geocoder>,
    options: RunOptions,
}

impl Engine {
    pub fn new(provider: Arc<dyn WeatherProvider>, geocoder: Arc<dyn Geocoder>, options: RunOptions) -> Self {
        Self {
            provider,
            geocoder,
            options,
        }
    }

    /// Simulates `num_days` days from `start_date` at an already resolved location.
    pub async fn simulate(
        &self,
        location: &Location,
        start_date: NaiveDate,
        num_days: u32,
        panel: &PanelConfig,
        cancel: &CancelFlag,
    ) -> Result<SimulationResult, SimulationError> {
        aggregator::run(location, start_date, num_days, panel, &*self.provider, self.options, cancel).await
    }

    /// Place-name front end: validates the panel and range, geocodes, simulates.
    pub async fn estimate(
        &self,
        place_name: &str,
        start_date: NaiveDate,
        num_days: i64,
        panel: PanelSpec,
        cancel: &CancelFlag,
    ) -> Result<SimulationResult, EngineError> {
        let panel = PanelConfig::new(panel)?;
        let num_days = timeline::checked_day_count(num_days)?;
        let location = self.geocoder.resolve(place_name).await?;
        info!("[ENGINE] \"{}\" resolved to ({:.4}, {:.4})", place_name.trim(), location.latitude, location.longitude);
        Ok(self.simulate(&location, start_date, num_days, &panel, cancel).await?)
    }

    /// Runs an API request end to end. Configuration is checked before any
    /// network traffic.
    pub async fn run_request(
        &self,
        req: &SimulationRequest,
        cancel: &CancelFlag,
    ) -> Result<SimulationResult, EngineError> {
        let panel = PanelConfig::new(req.panel)?;
        let num_days = resolve_day_count(req.range, req.num_days)?;
        let location = self.resolve_location(req).await?;
        Ok(self.simulate(&location, req.start_date, num_days, &panel, cancel).await?)
    }

    /// Explicit coordinates win over a place name.
    pub async fn resolve_location(&self, req: &SimulationRequest) -> Result<Location, EngineError> {
        let location = match (req.latitude, req.longitude, req.place.as_deref()) {
            (Some(lat), Some(lon), _) => Location::new(lat, lon)?,
            (_, _, Some(place)) => self.geocoder.resolve(place).await?,
            _ => return Err(ValidationError::MissingLocation.into()),
        };
        let location = match req.altitude_m {
            Some(alt) => location.with_altitude(alt)?,
            None => location,
        };
        let location = match req.utc_offset_seconds {
            Some(offset) => location.with_utc_offset(offset)?,
            None => location,
        };
        Ok(location)
    }

    pub async fn geocode(&self, place_name: &str) -> Result<Location, EngineError> {
        Ok(self.geocoder.resolve(place_name).await?)
    }
}

/// An explicit day count wins over a named range; neither means a single day.
pub fn resolve_day_count(range: Option<AnalysisRange>, num_days: Option<i64>) -> Result<u32, ValidationError> {
    match (num_days, range) {
        (Some(n), _) => timeline::checked_day_count(n),
        (None, Some(r)) => Ok(r.days()),
        (None, None) => Ok(AnalysisRange::SingleDay.days()),
    }
}
