use utoipa::OpenApi;

use crate::controllers::simulation_controller;
use crate::models::{panel, power, solar, weather};

#[derive(OpenApi)]
#[openapi(
    paths(
        simulation_controller::run_simulation,
        simulation_controller::cancel_simulation,
        simulation_controller::geocode,
        simulation_controller::health
    ),
    components(
        schemas(
            power::SimulationRequest,
            power::SimulationResponse,
            power::SimulationResult,
            power::PowerSample,
            power::DailyEnergy,
            power::PerformanceSummary,
            power::AnalysisRange,
            power::HealthStatus,
            power::ErrorBody,
            panel::PanelSpec,
            solar::Location,
            solar::IrradianceSample,
            weather::WeatherSample
        )
    ),
    tags(
        (name = "pv-yield-estimator", description = "PV yield estimation API")
    )
)]
pub struct ApiDoc;
