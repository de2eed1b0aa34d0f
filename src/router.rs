use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderValue, header},
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    api::{auth, geocode, incidents, oauth, profile},
    middleware::{
        auth::auth_middleware,
        gate::{CALLBACK_PATH, gate_middleware},
    },
    models::app_state::AppState,
};

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::verify_otp,
        auth::resend_otp,
        auth::login,
        auth::logout,
        auth::session,
        oauth::oauth_start,
        profile::get_profile,
        profile::complete_profile,
        profile::update_profile,
        profile::profile_options,
        incidents::create_incident,
        incidents::list_my_incidents,
        incidents::get_incident,
        incidents::heatmap,
        incidents::incident_stats,
        incidents::crime_types,
        geocode::autocomplete,
        geocode::place,
        geocode::map_config,
    ),
    components(
        schemas(
            crate::models::user::RegisterRequest,
            crate::models::user::RegisterResponse,
            crate::models::user::VerifyOtpRequest,
            crate::models::user::VerifyOtpResponse,
            crate::models::user::ResendOtpRequest,
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::SessionResponse,
            crate::models::user::MessageResponse,
            crate::models::profile::Profile,
            crate::models::profile::CompleteProfileRequest,
            crate::models::profile::UpdateProfileRequest,
            crate::models::profile::ProfileResponse,
            crate::models::profile::ProfileOptions,
            crate::models::incident::AlarmLevel,
            crate::models::incident::Incident,
            crate::models::incident::IncidentView,
            crate::models::incident::CreateIncidentRequest,
            crate::models::incident::CreateIncidentResponse,
            crate::models::incident::ListIncidentsResponse,
            crate::models::incident::HeatmapPoint,
            crate::models::incident::HeatmapResponse,
            crate::models::incident::IncidentStats,
            crate::models::incident::CrimeTypesResponse,
            crate::models::geocode::AddressPrediction,
            crate::models::geocode::AutocompleteResponse,
            crate::models::geocode::PlaceLocation,
            crate::models::geocode::MapConfig,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign up, sign in and sessions"),
        (name = "Profile", description = "Citizen profile"),
        (name = "Incidents", description = "Incident reports and heatmap"),
        (name = "Maps", description = "Address search and map display")
    ),
    info(
        title = "SmartCity API",
        version = "0.1.0",
        description = "Citizen incident reporting API"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    match sqlx::query("SELECT 1 as health_check")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => Json(json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(e) => Json(json!({
            "status": "unhealthy",
            "database": "disconnected",
            "error": e.to_string()
        })),
    }
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let methods = [
        http::Method::GET,
        http::Method::POST,
        http::Method::PUT,
        http::Method::PATCH,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION];

    if origins.iter().any(|s| s == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| {
            s.parse::<HeaderValue>()
                .map_err(|e| tracing::warn!("Failed to parse origin '{}': {}", s, e))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
}

fn api_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/resend-otp", post(auth::resend_otp))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/oauth/{provider}", get(oauth::oauth_start))
        .route("/profile/options", get(profile::profile_options))
        .route("/incidents/crime-types", get(incidents::crime_types))
        .route("/map/config", get(geocode::map_config));

    let protected = Router::new()
        .route("/auth/session", get(auth::session))
        .route(
            "/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/profile/complete", put(profile::complete_profile))
        .route("/incidents", post(incidents::create_incident))
        .route("/incidents/mine", get(incidents::list_my_incidents))
        .route("/incidents/heatmap", get(incidents::heatmap))
        .route("/incidents/stats", get(incidents::incident_stats))
        .route("/incidents/{id}", get(incidents::get_incident))
        .route("/geocode/autocomplete", get(geocode::autocomplete))
        .route("/geocode/place/{place_id}", get(geocode::place))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public).merge(protected)
}

/// The whole service: JSON API, docs, OAuth callback and the gated frontend
pub fn create_app(state: AppState) -> Router {
    let frontend = &state.config.frontend_dir;
    let pages = ServeDir::new(frontend)
        .fallback(ServeFile::new(format!("{}/index.html", frontend)));
    let cors = build_cors(&state.config.allow_origins);

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/v1", api_router(state.clone()))
        .route(CALLBACK_PATH, get(oauth::oauth_callback))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .fallback_service(pages)
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &http::Request<_>| {
                    tracing::info_span!(
                        "http-request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %Uuid::new_v4()
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
