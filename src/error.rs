use chrono::NaiveDate;
use thiserror::Error;

/// Rejected input, raised before any computation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("latitude {0}° is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0}° is outside [-180, 180]")]
    Longitude(f64),
    #[error("either a place name or both latitude and longitude are required")]
    MissingLocation,
    #[error("UTC offset {0} s is outside ±18 h")]
    UtcOffset(i32),
    #[error("altitude {0} m is not a finite number")]
    Altitude(f64),
    #[error("panel area must be > 0 m², got {0}")]
    PanelArea(f64),
    #[error("panel efficiency must be in (0, 1], got {0}")]
    PanelEfficiency(f64),
    #[error("panel tilt must be in [0, 90]°, got {0}")]
    PanelTilt(f64),
    #[error("panel azimuth must be in [0, 360)°, got {0}")]
    PanelAzimuth(f64),
    #[error("inverter rating must be > 0 W, got {0}")]
    InverterRating(f64),
    #[error("range must cover 1..={max} days, got {got}")]
    DayCount { got: i64, max: u32 },
    #[error("date range starting {0} runs past the supported calendar")]
    DateOverflow(NaiveDate),
    #[error("local midnight of {0} cannot be resolved to an instant")]
    UnresolvableTimestamp(NaiveDate),
}

/// Geocoder boundary failure.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no location matches \"{0}\"")]
    NotFound(String),
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder answered HTTP {0}")]
    Status(u16),
    #[error("geocoder returned an unusable location: {0}")]
    Invalid(#[from] ValidationError),
}

/// Weather provider boundary failure. Inside a run this only ever becomes a gap day.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather provider answered HTTP {0}")]
    Status(u16),
    #[error("weather payload could not be decoded: {0}")]
    Decode(String),
    #[error("no weather data for {0}")]
    Empty(NaiveDate),
    #[error("weather request not formed: {0}")]
    InvalidRequest(#[from] ValidationError),
}

impl FetchError {
    /// Worth another attempt: network trouble, throttling or a server-side fault.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Fatal outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ValidationError),
    #[error("simulation cancelled")]
    Cancelled,
}

/// Error surfaced to callers of the full estimate (geocode + simulate).
/// The Display text names the failing stage.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("location: {0}")]
    Location(#[from] GeocodeError),
    #[error("configuration: {0}")]
    Configuration(#[from] ValidationError),
    #[error("simulation cancelled")]
    Cancelled,
}

impl From<SimulationError> for EngineError {
    fn from(e: SimulationError) -> Self {
        match e {
            SimulationError::Configuration(v) => EngineError::Configuration(v),
            SimulationError::Cancelled => EngineError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_names_stage() {
        let e: EngineError = SimulationError::Configuration(ValidationError::PanelArea(0.0)).into();
        assert!(e.to_string().starts_with("configuration:"), "got {}", e);

        let e: EngineError = GeocodeError::NotFound("Atlantis".into()).into();
        assert_eq!(e.to_string(), "location: no location matches \"Atlantis\"");
    }
}
