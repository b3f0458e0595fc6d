use formats::{EarthquakeRecord, parse_earthquakes_with_limit};
use foundation::math::stable_total_cmp_f64;
use tracing::info;

use crate::config::MarkerConfig;
use crate::error::LayerError;
use crate::layer::{BuildContext, Layer, LayerGroup, LayerKind};
use crate::markers::{MarkerSpec, build_disc_group};
use crate::symbology::EARTHQUAKE_STYLE;

/// Magnitude at which markers start to grow.
pub const MARKER_GROWTH_MAGNITUDE: f64 = 6.0;

/// Disc radius for a quake: constant below magnitude 6, linear above.
pub fn marker_radius(magnitude: f64, base: f64, scale: f64) -> f64 {
    base + (magnitude - MARKER_GROWTH_MAGNITUDE).max(0.0) * scale
}

/// The `cap` strongest quakes, strongest first. Equal magnitudes keep
/// source order.
pub fn strongest(records: &[EarthquakeRecord], cap: usize) -> Vec<&EarthquakeRecord> {
    let mut sorted: Vec<&EarthquakeRecord> = records.iter().collect();
    sorted.sort_by(|a, b| stable_total_cmp_f64(b.magnitude, a.magnitude));
    sorted.truncate(cap);
    sorted
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeLayer {
    url: String,
    markers: MarkerConfig,
}

impl EarthquakeLayer {
    pub fn new(url: impl Into<String>, markers: MarkerConfig) -> Self {
        Self {
            url: url.into(),
            markers,
        }
    }

    pub fn marker_specs(&self, records: &[EarthquakeRecord]) -> Vec<MarkerSpec> {
        strongest(records, self.markers.max_earthquake_markers)
            .into_iter()
            .map(|quake| MarkerSpec {
                location: quake.location(),
                radius: marker_radius(
                    quake.magnitude,
                    self.markers.earthquake_base_radius,
                    self.markers.magnitude_scale,
                ),
            })
            .collect()
    }
}

impl Layer for EarthquakeLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Earthquakes
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn build(&self, source: &str, ctx: &mut BuildContext<'_>) -> Result<LayerGroup, LayerError> {
        let catalog = parse_earthquakes_with_limit(source, self.markers.max_records)?;
        let specs = self.marker_specs(&catalog.records);
        let group = build_disc_group(ctx, self.kind(), &EARTHQUAKE_STYLE, &specs)?;
        info!(
            parsed = catalog.records.len(),
            markers = group.count,
            "earthquake markers built"
        );
        Ok(group)
    }
}
