use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        app_state::AppState,
        incident::{
            CRIME_TYPES, CreateIncidentRequest, CreateIncidentResponse, CrimeTypesResponse,
            HeatmapPoint, HeatmapResponse, HeatmapRow, Incident, IncidentStats, IncidentView,
            ListIncidentsResponse, OTHER_CRIME, StatsRow,
        },
    },
};

const INCIDENT_COLUMNS: &str = "id, user_id, title, description, alarm_level, severity, latitude, longitude, address, incident_date, incident_time, status, created_at";

/// Report an incident
#[utoipa::path(
    post,
    path = "/api/v1/incidents",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "Incident reported", body = CreateIncidentResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Incidents",
    security(("bearer" = []))
)]
pub async fn create_incident(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<CreateIncidentResponse>), AppError> {
    let new = payload.into_new_incident()?;

    let incident = sqlx::query_as::<_, Incident>(&format!(
        r#"
        INSERT INTO incidents (user_id, title, description, alarm_level, severity, latitude, longitude, address, incident_date, incident_time)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {INCIDENT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.alarm_level.as_str())
    .bind(new.severity)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(&new.address)
    .bind(new.incident_date)
    .bind(new.incident_time)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        "Incident {} reported by {} ({}, {})",
        incident.id,
        user_id,
        incident.title,
        incident.alarm_level
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateIncidentResponse {
            incident: incident.into(),
            message: "Incident reported successfully!".to_string(),
        }),
    ))
}

/// The caller's incidents, newest incident date first
#[utoipa::path(
    get,
    path = "/api/v1/incidents/mine",
    responses(
        (status = 200, description = "Own incidents", body = ListIncidentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Incidents",
    security(("bearer" = []))
)]
pub async fn list_my_incidents(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ListIncidentsResponse>, AppError> {
    let incidents = sqlx::query_as::<_, Incident>(&format!(
        r#"
        SELECT {INCIDENT_COLUMNS}
        FROM incidents
        WHERE user_id = $1
        ORDER BY incident_date DESC, incident_time DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    let incidents: Vec<IncidentView> = incidents.into_iter().map(IncidentView::from).collect();
    let count = incidents.len();

    Ok(Json(ListIncidentsResponse { incidents, count }))
}

/// One of the caller's incidents
#[utoipa::path(
    get,
    path = "/api/v1/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Incident details", body = IncidentView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such incident for this user"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Incidents",
    security(("bearer" = []))
)]
pub async fn get_incident(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<IncidentView>, AppError> {
    let incident = sqlx::query_as::<_, Incident>(&format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::IncidentNotFound)?;

    Ok(Json(incident.into()))
}

/// Weighted points for the incident heatmap
#[utoipa::path(
    get,
    path = "/api/v1/incidents/heatmap",
    responses(
        (status = 200, description = "Heatmap points", body = HeatmapResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Incidents",
    security(("bearer" = []))
)]
pub async fn heatmap(State(state): State<AppState>) -> Result<Json<HeatmapResponse>, AppError> {
    let rows = sqlx::query_as::<_, HeatmapRow>(
        "SELECT latitude, longitude, alarm_level FROM incidents",
    )
    .fetch_all(&state.db)
    .await?;

    let points: Vec<HeatmapPoint> = rows.into_iter().map(HeatmapPoint::from).collect();
    let count = points.len();

    Ok(Json(HeatmapResponse { points, count }))
}

/// Counts of the caller's incidents by status and month
#[utoipa::path(
    get,
    path = "/api/v1/incidents/stats",
    responses(
        (status = 200, description = "Dashboard counts", body = IncidentStats),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Incidents",
    security(("bearer" = []))
)]
pub async fn incident_stats(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<IncidentStats>, AppError> {
    let rows = sqlx::query_as::<_, StatsRow>(
        "SELECT incident_date, status FROM incidents WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(IncidentStats::from_incidents(
        rows.iter().map(|r| (r.incident_date, r.status.as_deref())),
    )))
}

/// Crime types offered by the report form
#[utoipa::path(
    get,
    path = "/api/v1/incidents/crime-types",
    responses(
        (status = 200, description = "Known crime types", body = CrimeTypesResponse)
    ),
    tag = "Incidents"
)]
pub async fn crime_types() -> Json<CrimeTypesResponse> {
    Json(CrimeTypesResponse {
        crime_types: CRIME_TYPES.iter().map(|t| t.to_string()).collect(),
        other: OTHER_CRIME.to_string(),
    })
}
