use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::{Router, routing::get, response::Html};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use pv_yield_estimator::api_docs::ApiDoc;
use pv_yield_estimator::config::Config;
use pv_yield_estimator::routes::simulation_routes::api_routes;
use pv_yield_estimator::services::aggregator::RunOptions;
use pv_yield_estimator::services::cache::{CachedGeocoder, CachedWeatherProvider};
use pv_yield_estimator::services::geocoder::{Geocoder, NominatimClient};
use pv_yield_estimator::services::power_service::Engine;
use pv_yield_estimator::services::weather_service::{OpenMeteoClient, WeatherProvider};
use pv_yield_estimator::shared_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Load configuration
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = Config::load(&path).map_err(|e| anyhow!("failed to load {}: {}", path, e))?;
    info!(
        "[CONFIG] {} | port {} | {} concurrent fetches | cache {}",
        path, config.server.port, config.weather.max_concurrent_fetches,
        if config.cache.enabled { "on" } else { "off" }
    );

    // 2. Collaborators
    let weather = OpenMeteoClient::new(config.weather.clone()).context("building weather client")?;
    let geocoder = NominatimClient::new(&config.geocoder).context("building geocoder client")?;
    let (provider, geocoder): (Arc<dyn WeatherProvider>, Arc<dyn Geocoder>) = if config.cache.enabled {
        (
            Arc::new(CachedWeatherProvider::new(weather, config.cache.max_entries)),
            Arc::new(CachedGeocoder::new(geocoder, config.cache.max_entries)),
        )
    } else {
        (Arc::new(weather), Arc::new(geocoder))
    };

    // 3. Engine and shared state
    let options = RunOptions {
        max_concurrent_fetches: config.weather.max_concurrent_fetches,
    };
    let state = AppState::new(Engine::new(provider, geocoder, options), config.cache.enabled);

    // 4. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .context("HTTP server stopped")?;
    Ok(())
}
