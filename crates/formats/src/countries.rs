use foundation::GeoPoint;
use serde_json::Value;
use tracing::{debug, info};

/// A closed sequence of `[lon, lat]` positions.
pub type Ring = Vec<GeoPoint>;

#[derive(Debug, Clone, PartialEq)]
pub enum CountryGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl CountryGeometry {
    /// Outer rings: one per polygon.
    pub fn outer_rings(&self) -> Vec<&Ring> {
        match self {
            CountryGeometry::Polygon(rings) => rings.first().into_iter().collect(),
            CountryGeometry::MultiPolygon(polys) => {
                polys.iter().filter_map(|rings| rings.first()).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryFeature {
    pub name: Option<String>,
    pub geometry: CountryGeometry,
}

#[derive(Debug)]
pub enum CountryParseError {
    Json(serde_json::Error),
    MissingFeatures,
}

impl std::fmt::Display for CountryParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountryParseError::Json(err) => write!(f, "JSON parse error: {err}"),
            CountryParseError::MissingFeatures => {
                write!(f, "GeoJSON document has no features array")
            }
        }
    }
}

impl std::error::Error for CountryParseError {}

const NAME_KEYS: [&str; 3] = ["name", "ADMIN", "NAME"];

/// Parses a country-border FeatureCollection.
///
/// Features without geometry, or with geometry other than Polygon and
/// MultiPolygon, are skipped. A document without a `features` array is an
/// error.
pub fn parse_countries(payload: &str) -> Result<Vec<CountryFeature>, CountryParseError> {
    let value: Value = serde_json::from_str(payload).map_err(CountryParseError::Json)?;
    let features = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or(CountryParseError::MissingFeatures)?;

    let mut out = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) else {
            debug!(index, "skipping country feature without geometry");
            continue;
        };
        match parse_geometry(geometry) {
            Ok(geometry) => out.push(CountryFeature {
                name: feature_name(feature),
                geometry,
            }),
            Err(reason) => debug!(index, %reason, "skipping country feature"),
        }
    }

    info!(
        countries = out.len(),
        skipped = features.len() - out.len(),
        "country borders parsed"
    );
    Ok(out)
}

fn feature_name(feature: &Value) -> Option<String> {
    let properties = feature.get("properties")?.as_object()?;
    NAME_KEYS
        .iter()
        .find_map(|key| properties.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn parse_geometry(value: &Value) -> Result<CountryGeometry, String> {
    let ty = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;
    let coords = value
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Polygon" => Ok(CountryGeometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => Ok(CountryGeometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::from_lon_lat(lon, lat))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array".to_string())?;
    arr.iter().map(parse_position).collect()
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_ring).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_polygon).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "Square"},
             "geometry": {"type": "Polygon", "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[2, 2], [3, 2], [3, 3], [2, 2]]
             ]}},
            {"type": "Feature", "properties": {"ADMIN": "Islands"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[20, 20], [21, 20], [21, 21], [20, 20]]],
                [[[30, -5], [31, -5], [31, -4], [30, -5]]]
             ]}},
            {"type": "Feature", "properties": {"name": "Capital"},
             "geometry": {"type": "Point", "coordinates": [1, 2]}},
            {"type": "Feature", "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {}}
        ]
    }"#;

    #[test]
    fn keeps_only_polygonal_features() {
        let countries = parse_countries(SAMPLE).expect("parse");
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].name.as_deref(), Some("Square"));
        assert_eq!(countries[1].name.as_deref(), Some("Islands"));
    }

    #[test]
    fn outer_rings_skip_holes() {
        let countries = parse_countries(SAMPLE).expect("parse");
        let square = countries[0].geometry.outer_rings();
        assert_eq!(square.len(), 1);
        assert_eq!(square[0].len(), 5);
        assert_eq!(square[0][1], GeoPoint::new(0.0, 10.0));

        let islands = countries[1].geometry.outer_rings();
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[1][0], GeoPoint::new(-5.0, 30.0));
    }

    #[test]
    fn missing_features_is_an_error() {
        let err = parse_countries(r#"{"type": "FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, CountryParseError::MissingFeatures));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = parse_countries("{not json").unwrap_err();
        assert!(matches!(err, CountryParseError::Json(_)));
    }

    #[test]
    fn malformed_coordinates_skip_the_feature() {
        let payload = r#"{"features": [
            {"geometry": {"type": "Polygon", "coordinates": [[["a", 0]]]}},
            {"geometry": {"type": "Polygon", "coordinates": [[[1, 1], [2, 2], [1, 1]]]}}
        ]}"#;
        let countries = parse_countries(payload).expect("parse");
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].name, None);
    }
}
