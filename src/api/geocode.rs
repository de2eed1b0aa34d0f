use axum::{
    Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::{
    errors::AppError,
    models::{
        app_state::AppState,
        geocode::{AutocompleteQuery, AutocompleteResponse, MapConfig, PlaceLocation},
    },
};

/// Address suggestions while the user types
#[utoipa::path(
    get,
    path = "/api/v1/geocode/autocomplete",
    params(AutocompleteQuery),
    responses(
        (status = 200, description = "Address suggestions", body = AutocompleteResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Maps provider failed")
    ),
    tag = "Maps",
    security(("bearer" = []))
)]
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<Json<AutocompleteResponse>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let predictions = state.maps.autocomplete(query.input.trim()).await?;

    Ok(Json(AutocompleteResponse { predictions }))
}

/// Coordinates for a selected suggestion
#[utoipa::path(
    get,
    path = "/api/v1/geocode/place/{place_id}",
    params(("place_id" = String, Path, description = "Id from an autocomplete suggestion")),
    responses(
        (status = 200, description = "Resolved location", body = PlaceLocation),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Maps provider failed")
    ),
    tag = "Maps",
    security(("bearer" = []))
)]
pub async fn place(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> Result<Json<PlaceLocation>, AppError> {
    if place_id.trim().is_empty() {
        return Err(AppError::ValidationError("place_id is required".to_string()));
    }

    Ok(Json(state.maps.place(&place_id).await?))
}

/// Map and heatmap display parameters
#[utoipa::path(
    get,
    path = "/api/v1/map/config",
    responses(
        (status = 200, description = "Map parameters", body = MapConfig)
    ),
    tag = "Maps"
)]
pub async fn map_config(State(state): State<AppState>) -> Json<MapConfig> {
    Json(MapConfig::new(
        state.maps.country().to_string(),
        state.config.maps.browser_key.clone(),
    ))
}
