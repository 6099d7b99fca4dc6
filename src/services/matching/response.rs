//! Deserialization types for the OSRM match service response.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#match-service>
use serde::Deserialize;

/// Body returned by the match service, on failure only `code` and `message` are set
#[derive(Debug, Deserialize)]
pub struct MatchResponse {
    /// `"Ok"` on success, otherwise e.g. `"NoMatch"`, `"InvalidQuery"` or `"TooBig"`
    pub code: String,
    pub message: Option<String>,
    /// One entry per input coordinate, `null` when the point could not be matched
    #[serde(default)]
    pub tracepoints: Vec<Option<Tracepoint>>,
    #[serde(default)]
    pub matchings: Vec<Matching>,
}

impl MatchResponse {
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

#[derive(Debug, Deserialize)]
pub struct Tracepoint {
    /// snapped coordinate as `[longitude, latitude]`
    pub location: [f64; 2],
    /// index of the matching this point belongs to
    pub matchings_index: usize,
    /// index of the waypoint inside the matching
    pub waypoint_index: usize,
    #[serde(default)]
    pub alternatives_count: usize,
    pub distance: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Matching {
    /// 0 (low) to 1 (high) confidence that the matching is correct
    pub confidence: f64,
    pub distance: f64,
    pub duration: f64,
    pub weight: Option<f64>,
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
pub struct Leg {
    pub distance: f64,
    pub duration: f64,
    pub weight: Option<f64>,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub annotation: Option<LegAnnotation>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub geometry: Geometry,
}

/// Step geometry, either an encoded polyline or a GeoJSON object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Encoded(String),
    GeoJson {
        #[serde(rename = "type")]
        kind: String,
        coordinates: serde_json::Value,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct LegAnnotation {
    /// OSM node ids along the leg
    #[serde(default)]
    pub nodes: Vec<u64>,
    /// distance in meters between consecutive nodes
    #[serde(default)]
    pub distance: Vec<f64>,
}

/// Body of a failed request
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub code: String,
    pub message: Option<String>,
}
