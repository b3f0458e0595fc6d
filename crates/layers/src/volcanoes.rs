use formats::parse_volcanoes;
use tracing::info;

use crate::error::LayerError;
use crate::layer::{BuildContext, Layer, LayerGroup, LayerKind};
use crate::markers::{MarkerSpec, build_disc_group};
use crate::symbology::VOLCANO_STYLE;

/// Every valid volcano gets a fixed-size gold disc.
#[derive(Debug, Clone, PartialEq)]
pub struct VolcanoLayer {
    url: String,
    radius: f64,
}

impl VolcanoLayer {
    pub fn new(url: impl Into<String>, radius: f64) -> Self {
        Self {
            url: url.into(),
            radius,
        }
    }
}

impl Layer for VolcanoLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Volcanoes
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn build(&self, source: &str, ctx: &mut BuildContext<'_>) -> Result<LayerGroup, LayerError> {
        let catalog = parse_volcanoes(source)?;
        let specs: Vec<MarkerSpec> = catalog
            .records
            .iter()
            .map(|volcano| MarkerSpec {
                location: volcano.location(),
                radius: self.radius,
            })
            .collect();
        let group = build_disc_group(ctx, self.kind(), &VOLCANO_STYLE, &specs)?;
        info!(markers = group.count, "volcano markers built");
        Ok(group)
    }
}
