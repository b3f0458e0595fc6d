use formats::parse_countries;
use foundation::math::Vec3;
use scene::components::Drawable3D;
use scene::resources::Geometry;
use tracing::info;

use crate::error::LayerError;
use crate::layer::{BuildContext, Layer, LayerGroup, LayerKind, spawn_group};
use crate::symbology::BORDER_STYLE;

/// Country outlines: one line strip per polygon outer ring.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderLayer {
    url: String,
}

impl BorderLayer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Layer for BorderLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Borders
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn build(&self, source: &str, ctx: &mut BuildContext<'_>) -> Result<LayerGroup, LayerError> {
        let countries = parse_countries(source)?;
        let radius = ctx.globe.radius + BORDER_STYLE.lift;

        let strips: Vec<Vec<Vec3>> = countries
            .iter()
            .flat_map(|country| country.geometry.outer_rings())
            .filter(|ring| ring.len() >= 2)
            .map(|ring| {
                ring.iter()
                    .map(|point| ctx.projection.project(*point, radius).vec3())
                    .collect()
            })
            .collect();
        if strips.is_empty() {
            return Err(LayerError::Empty);
        }

        let group = spawn_group(ctx, self.kind())?;
        let material = ctx.world.create_material(BORDER_STYLE.line_material());
        let count = strips.len();
        for points in strips {
            let geometry = ctx.world.create_geometry(Geometry::Polyline { points });
            let node = ctx.world.spawn();
            let attached = ctx
                .world
                .set_drawable(node, Drawable3D::line(geometry, material))
                .and_then(|()| ctx.world.add_child(group, node));
            if let Err(err) = attached {
                let _ = ctx.world.despawn_recursive(node);
                let _ = ctx.world.despawn_recursive(group);
                return Err(LayerError::Build(err));
            }
        }

        info!(countries = countries.len(), lines = count, "country borders built");
        Ok(LayerGroup { node: group, count })
    }
}
