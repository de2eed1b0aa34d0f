use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::non_blank;

/// Citizen profile; one row per user, keyed by the user id
#[derive(Debug, Clone, Default, FromRow, Serialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub occupation: Option<String>,
    pub education: Option<String>,
    pub birthdate: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A profile is complete when none of the seven required fields is empty.
    /// `avatar_url` is optional.
    pub fn is_complete(&self) -> bool {
        [
            &self.full_name,
            &self.phone_number,
            &self.city,
            &self.occupation,
            &self.education,
            &self.birthdate,
            &self.bio,
        ]
        .iter()
        .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

/// Completeness of an optional profile row; no row means incomplete.
pub fn profile_complete(profile: Option<&Profile>) -> bool {
    profile.is_some_and(Profile::is_complete)
}

/// Fill in every required field (upsert)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteProfileRequest {
    #[validate(length(max = 150), custom(function = "non_blank"))]
    #[schema(example = "María Gómez")]
    pub full_name: String,

    #[validate(length(max = 20), custom(function = "non_blank"))]
    #[schema(example = "+57 300 123 4567")]
    pub phone_number: String,

    #[validate(custom(function = "non_blank"))]
    #[schema(example = "bogota")]
    pub city: String,

    #[validate(length(max = 100), custom(function = "non_blank"))]
    #[schema(example = "Ingeniera")]
    pub occupation: String,

    #[validate(custom(function = "non_blank"))]
    #[schema(example = "pregrado")]
    pub education: String,

    /// Date of birth, `YYYY-MM-DD`
    #[validate(custom(function = "non_blank"))]
    #[schema(example = "1990-04-12")]
    pub birthdate: String,

    #[validate(length(max = 1000), custom(function = "non_blank"))]
    #[schema(example = "Vecina del barrio Chapinero.")]
    pub bio: String,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

impl CompleteProfileRequest {
    /// Profile values as stored: required fields trimmed, avatar kept as sent
    pub fn to_profile(&self, id: Uuid) -> Profile {
        let trimmed = |v: &str| Some(v.trim().to_string());
        Profile {
            id,
            full_name: trimmed(&self.full_name),
            phone_number: trimmed(&self.phone_number),
            city: trimmed(&self.city),
            occupation: trimmed(&self.occupation),
            education: trimmed(&self.education),
            birthdate: trimmed(&self.birthdate),
            bio: trimmed(&self.bio),
            avatar_url: self.avatar_url.clone(),
            updated_at: None,
        }
    }
}

/// Partial profile update; absent fields keep their value
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 150), custom(function = "non_blank"))]
    pub full_name: Option<String>,

    #[validate(length(max = 20), custom(function = "non_blank"))]
    pub phone_number: Option<String>,

    #[validate(custom(function = "non_blank"))]
    pub city: Option<String>,

    #[validate(length(max = 100), custom(function = "non_blank"))]
    pub occupation: Option<String>,

    #[validate(custom(function = "non_blank"))]
    pub education: Option<String>,

    #[validate(custom(function = "non_blank"))]
    pub birthdate: Option<String>,

    #[validate(length(max = 1000), custom(function = "non_blank"))]
    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Profile response
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub complete: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let complete = profile.is_complete();
        Self { profile, complete }
    }
}

/// A selectable value with its label
#[derive(Debug, Serialize, ToSchema)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

/// Values offered by the profile form
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileOptions {
    pub cities: Vec<OptionItem>,
    pub education: Vec<OptionItem>,
}

pub const CITIES: &[(&str, &str)] = &[
    ("bogota", "Bogotá"),
    ("medellin", "Medellín"),
    ("cali", "Cali"),
    ("barranquilla", "Barranquilla"),
    ("cartagena", "Cartagena"),
];

pub const EDUCATION_LEVELS: &[(&str, &str)] = &[
    ("primaria", "Primaria"),
    ("secundaria", "Secundaria"),
    ("tecnico", "Técnico"),
    ("tecnologo", "Tecnólogo"),
    ("pregrado", "Pregrado Universitario"),
    ("especializacion", "Especialización"),
    ("maestria", "Maestría"),
    ("doctorado", "Doctorado"),
];

impl ProfileOptions {
    pub fn known() -> Self {
        let items = |pairs: &[(&'static str, &'static str)]| {
            pairs
                .iter()
                .map(|&(value, label)| OptionItem {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect::<Vec<_>>()
        };
        Self {
            cities: items(CITIES),
            education: items(EDUCATION_LEVELS),
        }
    }
}
