use serde::Deserialize;

use crate::{
    config::MapsConfig,
    models::geocode::{AddressPrediction, PlaceLocation},
    utils::external::ExternalError,
};

const SERVICE: &str = "places";

/// Thin client over the Google Places web service
#[derive(Clone)]
pub struct MapsClient {
    http: reqwest::Client,
    config: MapsConfig,
}

#[derive(Debug, Deserialize)]
struct AutocompleteBody {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<PredictionBody>,
}

#[derive(Debug, Deserialize)]
struct PredictionBody {
    description: String,
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct DetailsBody {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    result: Option<PlaceBody>,
}

#[derive(Debug, Deserialize)]
struct PlaceBody {
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl MapsClient {
    pub fn new(http: reqwest::Client, config: MapsConfig) -> Self {
        Self { http, config }
    }

    pub fn country(&self) -> &str {
        &self.config.country
    }

    fn api_key(&self) -> Result<&str, ExternalError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(ExternalError::NotConfigured { service: SERVICE })
    }

    /// Address suggestions for partial input, limited to street addresses in
    /// the configured country.
    pub async fn autocomplete(&self, input: &str) -> Result<Vec<AddressPrediction>, ExternalError> {
        let key = self.api_key()?;
        let components = format!("country:{}", self.config.country);

        let body: AutocompleteBody = self
            .http
            .get(format!("{}/autocomplete/json", self.config.places_url))
            .query(&[
                ("input", input),
                ("components", components.as_str()),
                ("types", "address"),
                ("key", key),
            ])
            .send()
            .await
            .map_err(ExternalError::http(SERVICE))?
            .json()
            .await
            .map_err(ExternalError::http(SERVICE))?;

        predictions_from(body)
    }

    /// Resolve a suggestion to coordinates and its formatted address.
    pub async fn place(&self, place_id: &str) -> Result<PlaceLocation, ExternalError> {
        let key = self.api_key()?;

        let body: DetailsBody = self
            .http
            .get(format!("{}/details/json", self.config.places_url))
            .query(&[
                ("place_id", place_id),
                ("fields", "geometry,formatted_address"),
                ("key", key),
            ])
            .send()
            .await
            .map_err(ExternalError::http(SERVICE))?
            .json()
            .await
            .map_err(ExternalError::http(SERVICE))?;

        location_from(body)
    }
}

fn check_status(status: &str, error_message: Option<String>) -> Result<(), ExternalError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(ExternalError::Status {
            service: SERVICE,
            status: other.to_string(),
            message: error_message,
        }),
    }
}

fn predictions_from(body: AutocompleteBody) -> Result<Vec<AddressPrediction>, ExternalError> {
    check_status(&body.status, body.error_message)?;
    Ok(body
        .predictions
        .into_iter()
        .map(|p| AddressPrediction {
            description: p.description,
            place_id: p.place_id,
        })
        .collect())
}

fn location_from(body: DetailsBody) -> Result<PlaceLocation, ExternalError> {
    check_status(&body.status, body.error_message)?;
    let place = body.result.ok_or(ExternalError::MissingField {
        service: SERVICE,
        field: "result",
    })?;
    let location = place
        .geometry
        .ok_or(ExternalError::MissingField {
            service: SERVICE,
            field: "geometry",
        })?
        .location;

    Ok(PlaceLocation {
        latitude: location.lat,
        longitude: location.lng,
        address: place.formatted_address.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autocomplete_predictions_are_extracted() {
        let body: AutocompleteBody = serde_json::from_str(
            r#"{
                "status": "OK",
                "predictions": [
                    {"description": "Carrera 7, Bogotá, Colombia", "place_id": "abc", "types": ["route"]},
                    {"description": "Carrera 7, Chía, Colombia", "place_id": "def"}
                ]
            }"#,
        )
        .unwrap();

        let predictions = predictions_from(body).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].place_id, "abc");
        assert_eq!(predictions[1].description, "Carrera 7, Chía, Colombia");
    }

    #[test]
    fn zero_results_is_an_empty_list() {
        let body: AutocompleteBody =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "predictions": []}"#).unwrap();
        assert!(predictions_from(body).unwrap().is_empty());
    }

    #[test]
    fn denied_request_is_an_error() {
        let body: AutocompleteBody = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();

        match predictions_from(body) {
            Err(ExternalError::Status { status, message, .. }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message.as_deref(), Some("The provided API key is invalid."));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn place_details_give_coordinates_and_address() {
        let body: DetailsBody = serde_json::from_str(
            r#"{
                "status": "OK",
                "result": {
                    "formatted_address": "Cra. 7 #32-16, Bogotá, Colombia",
                    "geometry": {"location": {"lat": 4.6181, "lng": -74.0695}}
                }
            }"#,
        )
        .unwrap();

        let place = location_from(body).unwrap();
        assert_eq!(place.latitude, 4.6181);
        assert_eq!(place.longitude, -74.0695);
        assert_eq!(place.address, "Cra. 7 #32-16, Bogotá, Colombia");
    }

    #[test]
    fn place_without_geometry_is_an_error() {
        let body: DetailsBody = serde_json::from_str(
            r#"{"status": "OK", "result": {"formatted_address": "Bogotá"}}"#,
        )
        .unwrap();

        assert!(matches!(
            location_from(body),
            Err(ExternalError::MissingField { field: "geometry", .. })
        ));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let client = MapsClient::new(
            reqwest::Client::new(),
            MapsConfig {
                api_key: None,
                browser_key: None,
                places_url: "http://127.0.0.1:9".to_string(),
                country: "co".to_string(),
            },
        );

        assert!(matches!(
            client.autocomplete("Carrera 7").await,
            Err(ExternalError::NotConfigured { .. })
        ));
    }
}
