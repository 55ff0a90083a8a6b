//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::TimePoint;
use crate::occurrences::OccurrenceError;
use crate::planner::{RouteError, RouteRequest};
use crate::rainfall::RainfallSource;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<S: RainfallSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/route", post(plan_route::<S>))
        .route("/geojson", post(geojson_route::<S>))
        .route("/cge_data/occurrences", get(occurrence_report::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Compute a route between two `[lon, lat]` points.
async fn plan_route<S: RainfallSource + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<RouteResponse>, AppError> {
    // Parse JSON manually so we can log the body on failure
    let dto: RouteRequestDto = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, body = %String::from_utf8_lossy(&body), "unparsable route request");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })?;

    let request = dto
        .into_request(TimePoint::now)
        .map_err(|e| AppError::BadRequest {
            message: e.to_string(),
        })?;

    Ok(Json(compute(&state, &request).await?))
}

/// Compute a rain-aware route from a GeoJSON `FeatureCollection`.
async fn geojson_route<S: RainfallSource + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let parsed = GeoJsonRoute::parse(&body).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;

    let response = compute(&state, &parsed.into_request()).await?;
    Ok(Json(response.to_feature_collection()))
}

/// The occurrence report for a day, or `null` if there is none.
async fn occurrence_report<S: RainfallSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<OccurrenceQuery>,
) -> Result<Json<Option<Value>>, AppError> {
    let store = state.occurrences.as_ref().ok_or_else(|| AppError::NotFound {
        message: "occurrence reports are not configured".to_string(),
    })?;

    let report = store.load(query.year, query.month, query.day).await?;
    Ok(Json(report))
}

/// Run the engine under the configured deadline.
async fn compute<S: RainfallSource>(
    state: &AppState<S>,
    request: &RouteRequest,
) -> Result<RouteResponse, AppError> {
    let route = tokio::time::timeout(state.deadline, state.engine.compute_route(request))
        .await
        .map_err(|_| AppError::Timeout {
            message: format!(
                "route computation exceeded {}ms",
                state.deadline.as_millis()
            ),
        })??;

    Ok(route.into())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unprocessable { message: String },
    Timeout { message: String },
    Internal { message: String },
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        let message = e.to_string();
        match e {
            RouteError::InvalidRequest(_) => AppError::BadRequest { message },
            RouteError::NoRoute { .. } => AppError::NotFound { message },
            RouteError::OutOfBounds { .. } => AppError::Unprocessable { message },
            RouteError::Interrupted { .. } => AppError::Internal { message },
        }
    }
}

impl From<OccurrenceError> for AppError {
    fn from(e: OccurrenceError) -> Self {
        match e {
            OccurrenceError::InvalidDate { .. } => AppError::BadRequest {
                message: e.to_string(),
            },
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unprocessable { message } => (StatusCode::UNPROCESSABLE_ENTITY, message),
            AppError::Timeout { message } => (StatusCode::GATEWAY_TIMEOUT, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use tempfile::tempdir;

    use crate::network::{Edge, NetworkGraph, Node};
    use crate::occurrences::OccurrenceStore;
    use crate::planner::{RouteConfig, RouteEngine};
    use crate::rainfall::{GridSpec, MockRainfallSource, RainfallConfig, RainfallGridProvider};

    /// Nodes 1 -> 2 -> 3 along a line, plus an isolated node 9.
    fn network() -> NetworkGraph {
        NetworkGraph::from_parts(
            vec![
                Node::new(1, 0.005, 0.005),
                Node::new(2, 0.005, 0.015),
                Node::new(3, 0.005, 0.025),
                Node::new(9, 0.035, 0.035),
            ],
            vec![Edge::new(1, 2, 1000.0, 90.0), Edge::new(2, 3, 1000.0, 90.0)],
        )
        .unwrap()
    }

    fn state(
        source: MockRainfallSource,
        occurrences: Option<OccurrenceStore>,
        deadline: Duration,
    ) -> AppState<MockRainfallSource> {
        let provider = RainfallGridProvider::new(
            source,
            RainfallConfig::default(),
            GridSpec::new(0.0, 0.0, 0.01, 0.01),
        );
        let engine = RouteEngine::new(
            Arc::new(network()),
            Arc::new(provider),
            RouteConfig::default(),
        )
        .unwrap();
        AppState::new(engine, occurrences, deadline)
    }

    async fn serve(state: AppState<MockRainfallSource>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn default_server() -> String {
        serve(state(MockRainfallSource::new(), None, Duration::from_secs(5))).await
    }

    async fn post(url: &str, body: impl Into<reqwest::Body>) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn health_check() {
        let base = default_server().await;
        let body = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn shortest_route() {
        let base = default_server().await;
        let (status, body) = post(
            &format!("{base}/route"),
            json!({"start": [0.005, 0.005], "end": [0.025, 0.005]}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodes"], json!([1, 2, 3]));
        assert_eq!(body["total_distance"], json!(2000.0));
        assert_eq!(body["degraded"], json!(false));
    }

    #[tokio::test]
    async fn unparsable_route_request() {
        let base = default_server().await;
        let (status, body) = post(&format!("{base}/route"), "{nope").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON"));
    }

    #[tokio::test]
    async fn invalid_coordinate_is_bad_request() {
        let base = default_server().await;
        let (status, _) = post(
            &format!("{base}/route"),
            json!({"start": [500.0, 0.0], "end": [0.0, 0.0]}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_destination_is_not_found() {
        let base = default_server().await;
        let (status, body) = post(
            &format!("{base}/route"),
            json!({"start": [0.005, 0.005], "end": [0.035, 0.035]}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("no route"));
    }

    #[tokio::test]
    async fn raster_too_small_is_unprocessable() {
        let source = MockRainfallSource::new().with_snapshot("202401151200", "0\n");
        let base = serve(state(source, None, Duration::from_secs(5))).await;
        let (status, _) = post(
            &format!("{base}/route"),
            json!({
                "start": [0.005, 0.005],
                "end": [0.025, 0.005],
                "mode": "rain",
                "time": "202401151200",
            })
            .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn slow_request_hits_deadline() {
        let source = MockRainfallSource::new().with_delay(Duration::from_millis(500));
        let base = serve(state(source, None, Duration::from_millis(50))).await;
        let (status, _) = post(
            &format!("{base}/route"),
            json!({
                "start": [0.005, 0.005],
                "end": [0.025, 0.005],
                "mode": "rain",
                "time": "202401151200",
            })
            .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn geojson_errors() {
        let base = default_server().await;
        let url = format!("{base}/geojson");

        let (status, body) = post(&url, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON");

        let (status, body) = post(&url, r#"{"type": "Feature"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid GeoJSON");

        let (status, body) = post(&url, r#"{"type": "FeatureCollection", "features": []}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing horario_saida in properties");
    }

    #[tokio::test]
    async fn geojson_route_degrades_without_rainfall() {
        let base = default_server().await;
        let doc = json!({
            "type": "FeatureCollection",
            "properties": {"horario_saida": "2024-01-15T12:00"},
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.005, 0.005]}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.025, 0.005]}},
            ],
        });
        let (status, body) = post(&format!("{base}/geojson"), doc.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "FeatureCollection");
        let feature = &body["features"][0];
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(
            feature["geometry"]["coordinates"],
            json!([[0.005, 0.005], [0.015, 0.005], [0.025, 0.005]])
        );
        assert_eq!(feature["properties"]["degraded"], json!(true));
    }

    #[tokio::test]
    async fn occurrence_reports() {
        let dir = tempdir().unwrap();
        let store = OccurrenceStore::new(dir.path());
        let path = store.path_for(2022, 1, 2);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"ocorrencias": 3}"#).unwrap();

        let base = serve(state(
            MockRainfallSource::new(),
            Some(store),
            Duration::from_secs(5),
        ))
        .await;

        let found: Value = reqwest::get(format!(
            "{base}/cge_data/occurrences?year=2022&month=1&day=2"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(found, json!({"ocorrencias": 3}));

        let missing: Value = reqwest::get(format!(
            "{base}/cge_data/occurrences?year=2022&month=1&day=3"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(missing, Value::Null);
    }

    #[tokio::test]
    async fn occurrences_unconfigured_is_not_found() {
        let base = default_server().await;
        let response = reqwest::get(format!(
            "{base}/cge_data/occurrences?year=2022&month=1&day=2"
        ))
        .await
        .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    #[test]
    fn route_errors_map_to_status() {
        use crate::network::NodeId;
        use crate::planner::Stage;

        let cases = [
            (
                RouteError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RouteError::NoRoute {
                    from: NodeId(1),
                    to: NodeId(2),
                    stage: Stage::NodeSnapped,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                RouteError::Interrupted {
                    stage: Stage::NodeSnapped,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }
}
