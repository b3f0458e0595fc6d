//! Offline inspection of the viewer's data sources.
//!
//! Every command reads local files, runs them through the same parsers and
//! layer builders the browser uses, and reports what the viewer would show.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use formats::{TabularReport, parse_countries, parse_earthquakes_with_limit, parse_volcanoes};
use foundation::GeoPoint;
use foundation::math::{Projection, Vec3};
use layers::config::ViewerConfig;
use layers::earthquakes::{EarthquakeLayer, strongest};
use layers::snapshot::SceneSnapshot;
use layers::{DataFetcher, FetchError, LayerError, LayerKind, Viewer, drive_toggle};
use serde::Serialize;

#[derive(Debug)]
pub enum ToolError {
    Io { path: PathBuf, source: std::io::Error },
    Config(serde_json::Error),
    Parse(String),
    Layer(LayerError),
    Json(serde_json::Error),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Io { path, source } => write!(f, "read {}: {source}", path.display()),
            ToolError::Config(err) => write!(f, "invalid config: {err}"),
            ToolError::Parse(msg) => write!(f, "parse error: {msg}"),
            ToolError::Layer(err) => write!(f, "layer error: {err}"),
            ToolError::Json(err) => write!(f, "json: {err}"),
        }
    }
}

impl std::error::Error for ToolError {}

/// Reads a local source file as text.
pub fn read_source(path: &Path) -> Result<String, ToolError> {
    tracing::info!("reading {}", path.display());
    fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig, ToolError> {
    match path {
        Some(path) => ViewerConfig::from_json(&read_source(path)?).map_err(ToolError::Config),
        None => Ok(ViewerConfig::default()),
    }
}

pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(ToolError::Json)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeSummary {
    pub report: TabularReport,
    pub markers: usize,
    pub strongest_magnitude: Option<f64>,
    pub strongest_place: Option<String>,
}

pub fn summarize_earthquakes(
    text: &str,
    config: &ViewerConfig,
) -> Result<EarthquakeSummary, ToolError> {
    let catalog = parse_earthquakes_with_limit(text, config.markers.max_records)
        .map_err(|e| ToolError::Parse(e.to_string()))?;
    let layer = EarthquakeLayer::new(config.sources.earthquakes_url.clone(), config.markers.clone());
    let top = strongest(&catalog.records, 1).into_iter().next();
    Ok(EarthquakeSummary {
        report: catalog.report,
        markers: layer.marker_specs(&catalog.records).len(),
        strongest_magnitude: top.map(|q| q.magnitude),
        strongest_place: top.map(|q| q.place.clone()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolcanoSummary {
    pub report: TabularReport,
    pub names: Vec<String>,
}

pub fn summarize_volcanoes(text: &str) -> Result<VolcanoSummary, ToolError> {
    let catalog = parse_volcanoes(text).map_err(|e| ToolError::Parse(e.to_string()))?;
    Ok(VolcanoSummary {
        report: catalog.report,
        names: catalog.records.into_iter().map(|v| v.name).collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderSummary {
    pub countries: usize,
    pub unnamed: usize,
    pub line_strips: usize,
    pub vertices: usize,
}

pub fn summarize_borders(text: &str) -> Result<BorderSummary, ToolError> {
    let countries = parse_countries(text).map_err(|e| ToolError::Parse(e.to_string()))?;
    let rings: Vec<_> = countries
        .iter()
        .flat_map(|c| c.geometry.outer_rings())
        .filter(|ring| ring.len() >= 2)
        .collect();
    Ok(BorderSummary {
        countries: countries.len(),
        unnamed: countries.iter().filter(|c| c.name.is_none()).count(),
        line_strips: rings.len(),
        vertices: rings.iter().map(|r| r.len()).sum(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub input: GeoPoint,
    pub longitude_offset_deg: f64,
    pub position: [f64; 3],
    pub normal: Option<[f64; 3]>,
}

pub fn project_point(lat: f64, lon: f64, radius: f64, config: &ViewerConfig) -> ProjectedPoint {
    let projection = Projection::new(config.longitude_offset_deg);
    let input = GeoPoint::new(lat, lon);
    let position = projection.project(input, radius);
    ProjectedPoint {
        input,
        longitude_offset_deg: projection.longitude_offset_deg(),
        position: position.vec3().as_array(),
        normal: projection.surface_normal(position).map(Vec3::as_array),
    }
}

/// Serves layer sources from local files, keyed by the configured URL.
pub struct FileFetcher {
    files: HashMap<String, PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    pub fn with(mut self, url: &str, path: PathBuf) -> Self {
        self.files.insert(url.to_string(), path);
        self
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DataFetcher for FileFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let Some(path) = self.files.get(url) else {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        };
        fs::read_to_string(path).map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Loads the given sources into a fresh viewer and extracts the frame the
/// host renderer would draw.
pub fn render_snapshot(
    config: ViewerConfig,
    sources: &[(LayerKind, PathBuf)],
) -> Result<SceneSnapshot, ToolError> {
    let mut fetcher = FileFetcher::new();
    for (kind, path) in sources {
        fetcher = fetcher.with(config.sources.url(*kind), path.clone());
    }

    let cell = std::cell::RefCell::new(Viewer::new(config));
    for (kind, _) in sources {
        pollster::block_on(drive_toggle(&cell, *kind, &fetcher)).map_err(ToolError::Layer)?;
    }
    cell.borrow_mut().advance_frame();
    let snapshot = cell.borrow().snapshot();
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUAKES: &str = "Date,Time,Latitude,Longitude,Depth,Magnitude,Location Source\n\
                          01/02/1965,13:44:18,19.246,145.616,131.6,6.0,ISCGEM\n\
                          01/04/1965,11:29:49,1.863,127.352,80.0,7.2,Molucca\n\
                          01/05/1965,18:05:58,bad,-173.972,20.0,6.2,X\n";

    #[test]
    fn earthquake_summary_reports_skips() {
        let summary = summarize_earthquakes(QUAKES, &ViewerConfig::default()).expect("summary");
        assert_eq!(summary.report.accepted, 2);
        assert_eq!(summary.report.skipped_invalid, 1);
        assert_eq!(summary.markers, 2);
        assert_eq!(summary.strongest_magnitude, Some(7.2));
        assert_eq!(summary.strongest_place.as_deref(), Some("Molucca"));
    }

    #[test]
    fn missing_source_names_the_path() {
        let path = Path::new("does/not/exist.csv");
        match read_source(path) {
            Err(ToolError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn volcano_summary_lists_names() {
        let summary = summarize_volcanoes("name,lat,lon\nEtna,37.7,15.0\nBad,x,1\n").expect("ok");
        assert_eq!(summary.names, vec!["Etna".to_string()]);
        assert_eq!(summary.report.skipped_invalid, 1);
    }

    #[test]
    fn border_summary_counts_rings() {
        let text = r#"{"features": [
            {"geometry": {"type": "MultiPolygon", "coordinates": [
                [[[0, 0], [1, 0], [1, 1], [0, 0]]],
                [[[5, 5], [6, 5], [6, 6], [5, 5]]]
            ]}}
        ]}"#;
        let summary = summarize_borders(text).expect("ok");
        assert_eq!(
            summary,
            BorderSummary {
                countries: 1,
                unnamed: 1,
                line_strips: 2,
                vertices: 8,
            }
        );
    }

    #[test]
    fn projects_with_configured_offset() {
        let point = project_point(0.0, 0.0, 1.0, &ViewerConfig::default());
        assert!((point.position[0] - 1.001).abs() < 1e-12);
        assert!(point.position[1].abs() < 1e-12);
        assert!(point.position[2].abs() < 1e-12);

        let config = ViewerConfig {
            longitude_offset_deg: 0.0,
            ..ViewerConfig::default()
        };
        let point = project_point(0.0, 0.0, 1.0, &config);
        assert!((point.position[2] - 1.001).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_a_fetch_failure() {
        let err = render_snapshot(
            ViewerConfig::default(),
            &[(LayerKind::Volcanoes, PathBuf::from("/definitely/not/here.csv"))],
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Layer(LayerError::Fetch(_))));
    }
}
