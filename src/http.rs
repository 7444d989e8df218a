//! HTTP routes over the importer and the query engine

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, Request, State,
    },
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::{
    contracts::{
        ImportRequest, ImportResult, NearestPageRequest, NearestPageResponse, NearestRequest,
        NearestResponse,
    },
    errors::StationError,
    ingest::Importer,
    query::StationQueries,
};

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone)]
pub struct AppState {
    pub importer: Importer,
    pub queries: StationQueries,
}

/// Build the application router. `/api` requires `X-API-Key` when a key
/// is given. Browsers may call it from any origin; preflight requests are
/// answered before the key check.
pub fn router(state: AppState, api_key: Option<String>) -> Router {
    let mut api = Router::new()
        .route("/station/import", post(import_stations))
        .route("/station/nearest", get(nearest_stations))
        .route("/station/nearest/paginated", get(nearest_stations_paginated))
        .with_state(state);

    if let Some(key) = api_key {
        api = api.layer(middleware::from_fn_with_state(
            Arc::<str>::from(key),
            require_api_key,
        ));
    }

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::HEAD])
        .allow_headers(Any)
}

impl IntoResponse for StationError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = json!({
            "error": true,
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

async fn require_api_key(
    State(expected): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, StationError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() {
        return Err(StationError::Unauthorized("API Key is required".to_string()));
    }
    if provided != &*expected {
        return Err(StationError::Unauthorized("Invalid API Key".to_string()));
    }

    Ok(next.run(request).await)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({ "message": "station locator" }))
}

async fn import_stations(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResult>, StationError> {
    let Json(request) =
        payload.map_err(|e| StationError::Validation(format!("Invalid request body: {e}")))?;

    let url = reqwest::Url::parse(request.url.trim())
        .map_err(|e| StationError::Validation(format!("Invalid url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StationError::Validation(
            "Invalid url: scheme must be http or https".to_string(),
        ));
    }

    state.importer.import_from_url(url.as_str()).await.map(Json)
}

async fn nearest_stations(
    State(state): State<AppState>,
    query: Result<Query<NearestRequest>, QueryRejection>,
) -> Result<Json<NearestResponse>, StationError> {
    let Query(request) = query.map_err(|e| StationError::Validation(e.body_text()))?;
    state.queries.find_nearest(&request).await.map(Json)
}

async fn nearest_stations_paginated(
    State(state): State<AppState>,
    query: Result<Query<NearestPageRequest>, QueryRejection>,
) -> Result<Json<NearestPageResponse>, StationError> {
    let Query(request) = query.map_err(|e| StationError::Validation(e.body_text()))?;
    state.queries.find_nearest_paginated(&request).await.map(Json)
}
