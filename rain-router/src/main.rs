use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rain_router::config::ServiceConfig;
use rain_router::network::NetworkGraph;
use rain_router::occurrences::OccurrenceStore;
use rain_router::planner::RouteEngine;
use rain_router::rainfall::{HttpRainfallSource, RainfallGridProvider};
use rain_router::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = ServiceConfig::from_env().map_err(|e| format!("configuration: {e}"))?;

    // The network is loaded once and shared for the process lifetime
    let graph = NetworkGraph::load(&config.graph_path).map_err(|e| e.to_string())?;

    let source = HttpRainfallSource::new(&config.rainfall)
        .map_err(|e| format!("failed to create rainfall client: {e}"))?;
    let provider = RainfallGridProvider::new(source, config.rainfall.clone(), config.grid);

    let engine = RouteEngine::new(Arc::new(graph), Arc::new(provider), config.route.clone())
        .map_err(|e| format!("{}: {e}", config.graph_path.display()))?;

    let occurrences = config.occurrences_dir.clone().map(OccurrenceStore::new);
    let state = AppState::new(engine, occurrences, config.deadline);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.bind))?;

    info!(addr = %config.bind, "rain router listening");
    info!("  GET  /health                - Health check");
    info!("  POST /route                 - Plan a route");
    info!("  POST /geojson               - Plan a rain-aware route from GeoJSON");
    info!("  GET  /cge_data/occurrences  - Daily occurrence report");

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server error: {e}"))
}
