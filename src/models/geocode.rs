use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Address autocomplete query
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AutocompleteQuery {
    /// Partial address typed by the user
    #[validate(length(min = 1, max = 200))]
    pub input: String,
}

/// One autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AddressPrediction {
    #[schema(example = "Carrera 7 #32-16, Bogotá, Colombia")]
    pub description: String,
    pub place_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AutocompleteResponse {
    pub predictions: Vec<AddressPrediction>,
}

/// Coordinates and formatted address of a selected suggestion
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlaceLocation {
    #[schema(example = 4.6181)]
    pub latitude: f64,
    #[schema(example = -74.0695)]
    pub longitude: f64,
    pub address: String,
}

/// Display parameters for the incident map and its heatmap layer
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MapConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: u8,
    pub heatmap_radius: u32,
    pub heatmap_opacity: f32,
    /// Restrict address search to this ISO country code
    pub country: String,
    /// Key the browser uses to load the map tiles, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_key: Option<String>,
}

impl MapConfig {
    /// Bogotá, zoomed to city level
    pub fn new(country: String, browser_key: Option<String>) -> Self {
        Self {
            center_latitude: 4.6097,
            center_longitude: -74.0817,
            zoom: 12,
            heatmap_radius: 20,
            heatmap_opacity: 0.6,
            country,
            browser_key,
        }
    }
}
