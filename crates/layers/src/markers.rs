use foundation::GeoPoint;
use foundation::math::Vec3;
use scene::components::{Drawable3D, Transform};
use scene::resources::Geometry;

use crate::error::LayerError;
use crate::layer::{BuildContext, LayerGroup, LayerKind, spawn_group};
use crate::symbology::{LayerStyle, MARKER_SEGMENTS};

/// One disc marker: where it sits and how large it is.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerSpec {
    pub location: GeoPoint,
    pub radius: f64,
}

/// Builds a group of disc markers sharing one geometry and one material.
///
/// Each disc sits at its projected position and faces the globe's local
/// origin. On failure the partial group is despawned.
pub(crate) fn build_disc_group(
    ctx: &mut BuildContext<'_>,
    kind: LayerKind,
    style: &LayerStyle,
    markers: &[MarkerSpec],
) -> Result<LayerGroup, LayerError> {
    if markers.is_empty() {
        return Err(LayerError::Empty);
    }

    let group = spawn_group(ctx, kind)?;
    let geometry = ctx.world.create_geometry(Geometry::Circle {
        radius: 1.0,
        segments: MARKER_SEGMENTS,
    });
    let material = ctx.world.create_material(style.marker_material());

    for marker in markers {
        let position = ctx
            .projection
            .project(marker.location, ctx.globe.radius + style.lift)
            .vec3();
        let node = ctx.world.spawn();
        ctx.world.set_transform(
            node,
            Transform::translate(position)
                .looking_at(Vec3::ZERO)
                .with_scale(marker.radius),
        );
        let attached = ctx
            .world
            .set_drawable(node, Drawable3D::mesh(geometry, material))
            .and_then(|()| ctx.world.add_child(group, node));
        if let Err(err) = attached {
            let _ = ctx.world.despawn_recursive(node);
            let _ = ctx.world.despawn_recursive(group);
            return Err(LayerError::Build(err));
        }
    }

    Ok(LayerGroup {
        node: group,
        count: markers.len(),
    })
}
