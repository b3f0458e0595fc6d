//! Double-click annotation: a small star outline on the clicked surface point
//! and a yellow stick along the surface normal.
//!
//! At most one annotation exists; placing a new one disposes the previous
//! one's nodes and resources.

use foundation::GeoPoint;
use foundation::math::{Projection, SURFACE_EPSILON, Vec3};
use scene::components::Drawable3D;
use scene::entity::NodeId;
use scene::picking::GlobeHit;
use scene::prefabs::Globe;
use scene::resources::{DisposeReport, Geometry, Material, MaterialKind};
use scene::{SceneError, World};
use tracing::info;

pub const STICK_LENGTH: f64 = 0.3;
pub const STICK_COLOR: u32 = 0xffff00;
pub const CONSTELLATION_COLOR: u32 = 0xffffff;
const CONSTELLATION_OUTER: f64 = 0.05;
const CONSTELLATION_INNER: f64 = 0.02;
const CONSTELLATION_POINTS: usize = 5;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Annotation {
    pub node: NodeId,
    pub location: GeoPoint,
    /// Clicked point in globe-local space.
    pub anchor: Vec3,
    /// Outward unit normal in globe-local space.
    pub normal: Vec3,
}

/// Replaces `previous` with a new annotation at `hit`.
pub fn place_annotation(
    world: &mut World,
    globe: &Globe,
    projection: &Projection,
    hit: &GlobeHit,
    previous: Option<Annotation>,
) -> Result<(Annotation, DisposeReport), SceneError> {
    let mut released = DisposeReport::default();
    if let Some(previous) = previous {
        if world.contains(previous.node) {
            released += world.despawn_recursive(previous.node)?;
        }
    }

    let anchor = hit.local_point;
    let normal = anchor.try_normalize().unwrap_or(Vec3::Y);
    let location = projection
        .unproject(anchor)
        .unwrap_or(GeoPoint::new(0.0, 0.0));

    let node = world.spawn_named("Annotation");
    world.add_child(globe.node, node)?;

    let stick = world.create_geometry(Geometry::Polyline {
        points: vec![anchor, anchor + normal * STICK_LENGTH],
    });
    let stick_material = world.create_material(Material::new(MaterialKind::Line, STICK_COLOR));
    let star = world.create_geometry(Geometry::Polyline {
        points: star_outline(anchor + normal * SURFACE_EPSILON, normal),
    });
    let star_material =
        world.create_material(Material::new(MaterialKind::Line, CONSTELLATION_COLOR));

    for drawable in [
        Drawable3D::line(stick, stick_material),
        Drawable3D::line(star, star_material),
    ] {
        let child = world.spawn();
        world.set_drawable(child, drawable)?;
        world.add_child(node, child)?;
    }

    info!(
        latitude = location.latitude,
        longitude = location.longitude,
        "annotation placed"
    );
    Ok((
        Annotation {
            node,
            location,
            anchor,
            normal,
        },
        released,
    ))
}

/// Closed five-pointed star in the tangent plane at `center`.
fn star_outline(center: Vec3, normal: Vec3) -> Vec<Vec3> {
    let east = Vec3::Y
        .cross(normal)
        .try_normalize()
        .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
    let north = normal.cross(east);

    let corners = CONSTELLATION_POINTS * 2;
    let mut points: Vec<Vec3> = (0..corners)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::PI / CONSTELLATION_POINTS as f64;
            let r = if i % 2 == 0 {
                CONSTELLATION_OUTER
            } else {
                CONSTELLATION_INNER
            };
            center + north * (r * angle.cos()) + east * (r * angle.sin())
        })
        .collect();
    points.push(points[0]);
    points
}
