//! Viewer configuration supplied by the host page.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use formats::MAX_RECORDS;
use foundation::math::DEFAULT_LONGITUDE_OFFSET_DEG;
use scene::camera::OrbitSettings;
use serde::{Deserialize, Serialize};

use crate::layer::LayerKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub earthquakes_url: String,
    pub volcanoes_url: String,
    pub borders_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            earthquakes_url: "./database.csv".to_string(),
            volcanoes_url: "/data/volcanoes.csv".to_string(),
            borders_url: "/world_countries.json".to_string(),
        }
    }
}

impl SourceConfig {
    pub fn url(&self, kind: LayerKind) -> &str {
        match kind {
            LayerKind::Earthquakes => &self.earthquakes_url,
            LayerKind::Volcanoes => &self.volcanoes_url,
            LayerKind::Borders => &self.borders_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub max_earthquake_markers: usize,
    /// Rows above this count are subsampled before parsing.
    pub max_records: usize,
    pub earthquake_base_radius: f64,
    /// Radius added per magnitude unit above 6.
    pub magnitude_scale: f64,
    pub volcano_radius: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            max_earthquake_markers: 2000,
            max_records: MAX_RECORDS,
            earthquake_base_radius: 0.0025,
            magnitude_scale: 0.0015,
            volcano_radius: 0.006,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub damping_factor: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub zoom_speed: f64,
    pub enable_pan: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let orbit = OrbitSettings::default();
        Self {
            damping_factor: orbit.damping_factor,
            min_distance: orbit.min_distance,
            max_distance: orbit.max_distance,
            zoom_speed: orbit.zoom_speed,
            enable_pan: orbit.enable_pan,
        }
    }
}

impl CameraConfig {
    pub fn orbit_settings(&self) -> OrbitSettings {
        OrbitSettings {
            damping_factor: self.damping_factor,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            zoom_speed: self.zoom_speed,
            enable_pan: self.enable_pan,
            ..OrbitSettings::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub sources: SourceConfig,
    pub longitude_offset_deg: f64,
    pub globe_texture_url: String,
    pub markers: MarkerConfig,
    pub camera: CameraConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sources: SourceConfig::default(),
            longitude_offset_deg: DEFAULT_LONGITUDE_OFFSET_DEG,
            globe_texture_url: "img/earth-blue-marble.jpg".to_string(),
            markers: MarkerConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
