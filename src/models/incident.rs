use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;

use super::non_blank;

/// Status shown for incidents that have not been triaged yet
pub const DEFAULT_STATUS: &str = "Reportado";

/// Crime type that requires a free-text description of the type
pub const OTHER_CRIME: &str = "Otro";

pub const CRIME_TYPES: &[&str] = &[
    "Hurto",
    "Robo",
    "Asalto",
    "Vandalismo",
    "Agresión",
    "Fraude",
    "Acoso",
    "Extorsión",
    "Tráfico de drogas",
    OTHER_CRIME,
];

/// Three-tier alarm classification chosen by the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlarmLevel {
    /// Suspicions
    Leve,
    /// Non-recurring crimes
    Moderado,
    /// Violent crimes
    Alto,
}

impl AlarmLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlarmLevel::Leve => "leve",
            AlarmLevel::Moderado => "moderado",
            AlarmLevel::Alto => "alto",
        }
    }

    pub fn severity(self) -> i16 {
        match self {
            AlarmLevel::Leve => 1,
            AlarmLevel::Moderado => 2,
            AlarmLevel::Alto => 3,
        }
    }
}

/// Heatmap weight for a stored alarm level; unknown values weigh like "leve".
pub fn heat_weight(alarm_level: &str) -> u8 {
    match alarm_level {
        "alto" => 3,
        "moderado" => 2,
        _ => 1,
    }
}

/// Incident from database
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Incident {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub alarm_level: String,
    pub severity: i16,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    #[schema(value_type = String, example = "2025-03-14")]
    pub incident_date: NaiveDate,
    #[schema(value_type = String, example = "21:30:00")]
    pub incident_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Incident {
    pub fn display_status(&self) -> &str {
        display_status(self.status.as_deref())
    }
}

/// Status text for display; missing or blank status reads as "Reportado".
pub fn display_status(status: Option<&str>) -> &str {
    match status {
        Some(s) if !s.trim().is_empty() => s,
        _ => DEFAULT_STATUS,
    }
}

/// Report a new incident
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIncidentRequest {
    /// One of the known crime types
    #[schema(example = "Hurto")]
    pub crime_type: String,

    /// Required when `crime_type` is "Otro"
    #[validate(length(max = 100))]
    pub other_crime_type: Option<String>,

    #[validate(length(max = 2000), custom(function = "non_blank"))]
    #[schema(example = "Me robaron el celular saliendo de la estación.")]
    pub description: String,

    pub alarm_level: AlarmLevel,

    #[validate(range(min = -90.0, max = 90.0))]
    #[schema(example = 4.6097)]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    #[schema(example = -74.0817)]
    pub longitude: f64,

    #[validate(length(max = 300), custom(function = "non_blank"))]
    #[schema(example = "Cra. 7 #32-16, Bogotá, Colombia")]
    pub address: String,

    /// `YYYY-MM-DD`
    #[schema(example = "2025-03-14")]
    pub incident_date: String,

    /// `HH:MM` or `HH:MM:SS`
    #[schema(example = "21:30")]
    pub incident_time: String,
}

/// Row values derived from a submission, ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub alarm_level: AlarmLevel,
    pub severity: i16,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub incident_date: NaiveDate,
    pub incident_time: NaiveTime,
}

impl CreateIncidentRequest {
    /// Title shown for the incident: the free-text type for "Otro", else the crime type.
    pub fn title(&self) -> Result<String, AppError> {
        let crime_type = self.crime_type.trim();
        if crime_type == OTHER_CRIME {
            return self
                .other_crime_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::ValidationError("other_crime_type is required for \"Otro\"".into())
                });
        }
        if !CRIME_TYPES.contains(&crime_type) {
            return Err(AppError::ValidationError(format!(
                "Unknown crime type: {crime_type}"
            )));
        }
        Ok(crime_type.to_string())
    }

    pub fn into_new_incident(self) -> Result<NewIncident, AppError> {
        self.validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let title = self.title()?;
        let incident_date = NaiveDate::parse_from_str(self.incident_date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::ValidationError("incident_date must be YYYY-MM-DD".into()))?;
        let incident_time = parse_time(self.incident_time.trim())
            .ok_or_else(|| AppError::ValidationError("incident_time must be HH:MM".into()))?;

        Ok(NewIncident {
            title,
            description: self.description.trim().to_string(),
            severity: self.alarm_level.severity(),
            alarm_level: self.alarm_level,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address.trim().to_string(),
            incident_date,
            incident_time,
        })
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Incident as listed on the dashboard
#[derive(Debug, Serialize, ToSchema)]
pub struct IncidentView {
    #[serde(flatten)]
    pub incident: Incident,
    /// `status`, or "Reportado" when none was set
    pub display_status: String,
}

impl From<Incident> for IncidentView {
    fn from(incident: Incident) -> Self {
        let display_status = incident.display_status().to_string();
        Self {
            incident,
            display_status,
        }
    }
}

/// Incident creation response
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateIncidentResponse {
    pub incident: IncidentView,
    pub message: String,
}

/// The caller's incidents, newest first
#[derive(Debug, Serialize, ToSchema)]
pub struct ListIncidentsResponse {
    pub incidents: Vec<IncidentView>,
    pub count: usize,
}

/// Minimal row read for the heatmap
#[derive(Debug, Clone, FromRow)]
pub struct HeatmapRow {
    pub latitude: f64,
    pub longitude: f64,
    pub alarm_level: String,
}

/// Weighted heatmap point
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HeatmapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub weight: u8,
}

impl From<HeatmapRow> for HeatmapPoint {
    fn from(row: HeatmapRow) -> Self {
        Self {
            latitude: row.latitude,
            longitude: row.longitude,
            weight: heat_weight(&row.alarm_level),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HeatmapResponse {
    pub points: Vec<HeatmapPoint>,
    pub count: usize,
}

/// Counts for the dashboard charts
#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct IncidentStats {
    pub total: usize,
    /// Display status -> count
    pub by_status: BTreeMap<String, usize>,
    /// `YYYY-MM` -> count, ascending
    pub by_month: BTreeMap<String, usize>,
}

impl IncidentStats {
    pub fn from_incidents<'a, I>(incidents: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<&'a str>)>,
    {
        let mut stats = IncidentStats::default();
        for (date, status) in incidents {
            stats.total += 1;
            *stats
                .by_status
                .entry(display_status(status).to_string())
                .or_default() += 1;
            *stats
                .by_month
                .entry(date.format("%Y-%m").to_string())
                .or_default() += 1;
        }
        stats
    }
}

/// Minimal row read for the stats endpoint
#[derive(Debug, Clone, FromRow)]
pub struct StatsRow {
    pub incident_date: NaiveDate,
    pub status: Option<String>,
}

/// Crime types offered by the report form
#[derive(Debug, Serialize, ToSchema)]
pub struct CrimeTypesResponse {
    pub crime_types: Vec<String>,
    pub other: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateIncidentRequest {
        CreateIncidentRequest {
            crime_type: "Robo".to_string(),
            other_crime_type: None,
            description: "Robo de bicicleta".to_string(),
            alarm_level: AlarmLevel::Moderado,
            latitude: 4.6097,
            longitude: -74.0817,
            address: "Cra. 7 #32-16".to_string(),
            incident_date: "2025-03-14".to_string(),
            incident_time: "21:30".to_string(),
        }
    }

    #[test]
    fn severity_follows_alarm_level() {
        assert_eq!(AlarmLevel::Leve.severity(), 1);
        assert_eq!(AlarmLevel::Moderado.severity(), 2);
        assert_eq!(AlarmLevel::Alto.severity(), 3);
    }

    #[test]
    fn alarm_level_uses_lowercase_wire_names() {
        let level: AlarmLevel = serde_json::from_str("\"alto\"").unwrap();
        assert_eq!(level, AlarmLevel::Alto);
        assert!(serde_json::from_str::<AlarmLevel>("\"critico\"").is_err());
        assert_eq!(AlarmLevel::Moderado.as_str(), "moderado");
    }

    #[test]
    fn heat_weight_defaults_to_lowest() {
        assert_eq!(heat_weight("alto"), 3);
        assert_eq!(heat_weight("moderado"), 2);
        assert_eq!(heat_weight("leve"), 1);
        assert_eq!(heat_weight(""), 1);
    }

    #[test]
    fn title_is_crime_type_unless_other() {
        assert_eq!(request().title().unwrap(), "Robo");

        let mut other = request();
        other.crime_type = OTHER_CRIME.to_string();
        other.other_crime_type = Some("  Estafa telefónica ".to_string());
        assert_eq!(other.title().unwrap(), "Estafa telefónica");
    }

    #[test]
    fn other_without_description_is_rejected() {
        let mut other = request();
        other.crime_type = OTHER_CRIME.to_string();
        other.other_crime_type = Some("   ".to_string());
        assert!(matches!(other.title(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn unknown_crime_type_is_rejected() {
        let mut req = request();
        req.crime_type = "Piratería".to_string();
        assert!(req.title().is_err());
    }

    #[test]
    fn submission_derives_row_values() {
        let new = request().into_new_incident().unwrap();
        assert_eq!(new.title, "Robo");
        assert_eq!(new.severity, 2);
        assert_eq!(new.incident_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(new.incident_time, NaiveTime::from_hms_opt(21, 30, 0).unwrap());
    }

    #[test]
    fn time_accepts_seconds() {
        let mut req = request();
        req.incident_time = "08:05:09".to_string();
        let new = req.into_new_incident().unwrap();
        assert_eq!(new.incident_time, NaiveTime::from_hms_opt(8, 5, 9).unwrap());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut req = request();
        req.latitude = 91.0;
        assert!(req.into_new_incident().is_err());

        let mut req = request();
        req.longitude = -181.0;
        assert!(req.into_new_incident().is_err());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let mut req = request();
        req.incident_date = "14/03/2025".to_string();
        assert!(req.into_new_incident().is_err());
    }

    #[test]
    fn empty_address_is_rejected() {
        let mut req = request();
        req.address = String::new();
        assert!(req.into_new_incident().is_err());
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let mut req = request();
        req.address = "   ".to_string();
        assert!(matches!(req.into_new_incident(), Err(AppError::ValidationError(_))));

        let mut req = request();
        req.description = "\n\t ".to_string();
        assert!(matches!(req.into_new_incident(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn stored_text_is_trimmed() {
        let mut req = request();
        req.description = "  Robo de bicicleta \n".to_string();
        req.address = " Cra. 7 #32-16 ".to_string();
        let new = req.into_new_incident().unwrap();
        assert_eq!(new.description, "Robo de bicicleta");
        assert_eq!(new.address, "Cra. 7 #32-16");
    }

    #[test]
    fn display_status_defaults_to_reported() {
        assert_eq!(display_status(None), "Reportado");
        assert_eq!(display_status(Some("")), "Reportado");
        assert_eq!(display_status(Some("Resuelto")), "Resuelto");
    }

    #[test]
    fn stats_bucket_by_status_and_month() {
        let march = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let april = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let stats = IncidentStats::from_incidents([
            (march, None),
            (march, Some("Resuelto")),
            (april, None),
        ]);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["Reportado"], 2);
        assert_eq!(stats.by_status["Resuelto"], 1);
        assert_eq!(
            stats.by_month.iter().collect::<Vec<_>>(),
            vec![(&"2025-03".to_string(), &2), (&"2025-04".to_string(), &1)]
        );
    }
}
