use axum::{Extension, Json, extract::State};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::AppError,
    models::{
        app_state::AppState,
        profile::{
            CompleteProfileRequest, Profile, ProfileOptions, ProfileResponse, UpdateProfileRequest,
        },
    },
};

const PROFILE_COLUMNS: &str =
    "id, full_name, phone_number, city, occupation, education, birthdate, bio, avatar_url, updated_at";

/// Get current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "User profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile not created yet"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Profile",
    security(("bearer" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::ProfileNotFound)?;

    Ok(Json(profile.into()))
}

/// Fill in every required field, creating the profile if needed
#[utoipa::path(
    put,
    path = "/api/v1/profile/complete",
    request_body = CompleteProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Profile",
    security(("bearer" = []))
)]
pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<CompleteProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    let fields = payload.to_profile(user_id);

    let profile = sqlx::query_as::<_, Profile>(&format!(
        r#"
        INSERT INTO profiles (id, full_name, phone_number, city, occupation, education, birthdate, bio, avatar_url, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        ON CONFLICT (id) DO UPDATE SET
            full_name = EXCLUDED.full_name,
            phone_number = EXCLUDED.phone_number,
            city = EXCLUDED.city,
            occupation = EXCLUDED.occupation,
            education = EXCLUDED.education,
            birthdate = EXCLUDED.birthdate,
            bio = EXCLUDED.bio,
            avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
            updated_at = NOW()
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(fields.id)
    .bind(&fields.full_name)
    .bind(&fields.phone_number)
    .bind(&fields.city)
    .bind(&fields.occupation)
    .bind(&fields.education)
    .bind(&fields.birthdate)
    .bind(&fields.bio)
    .bind(&fields.avatar_url)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Profile completed for user {}", user_id);

    Ok(Json(profile.into()))
}

/// Update current user's profile
#[utoipa::path(
    patch,
    path = "/api/v1/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = ProfileResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Profile not created yet"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Profile",
    security(("bearer" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let profile = sqlx::query_as::<_, Profile>(&format!(
        r#"
        UPDATE profiles
        SET
            full_name = COALESCE($1, full_name),
            phone_number = COALESCE($2, phone_number),
            city = COALESCE($3, city),
            occupation = COALESCE($4, occupation),
            education = COALESCE($5, education),
            birthdate = COALESCE($6, birthdate),
            bio = COALESCE($7, bio),
            avatar_url = COALESCE($8, avatar_url),
            updated_at = NOW()
        WHERE id = $9
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(payload.full_name.as_deref().map(str::trim))
    .bind(payload.phone_number.as_deref().map(str::trim))
    .bind(payload.city.as_deref().map(str::trim))
    .bind(payload.occupation.as_deref().map(str::trim))
    .bind(payload.education.as_deref().map(str::trim))
    .bind(payload.birthdate.as_deref().map(str::trim))
    .bind(payload.bio.as_deref().map(str::trim))
    .bind(payload.avatar_url.as_deref())
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::ProfileNotFound)?;

    Ok(Json(profile.into()))
}

/// City and education choices for the profile form
#[utoipa::path(
    get,
    path = "/api/v1/profile/options",
    responses(
        (status = 200, description = "Form choices", body = ProfileOptions)
    ),
    tag = "Profile"
)]
pub async fn profile_options() -> Json<ProfileOptions> {
    Json(ProfileOptions::known())
}
