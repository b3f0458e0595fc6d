use foundation::math::Vec3;

use crate::World;
use crate::components::{Drawable3D, Transform};
use crate::entity::NodeId;
use crate::resources::{
    Geometry, Material, MaterialId, MaterialKind, Texture, TextureId, TextureStatus,
};

/// Base color shown when the globe texture cannot be loaded.
pub const GLOBE_FALLBACK_COLOR: u32 = 0x1a75ff;

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeOptions {
    pub radius: f64,
    pub segments: u32,
    pub texture_url: String,
}

impl Default for GlobeOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            segments: 64,
            texture_url: "img/earth-blue-marble.jpg".to_string(),
        }
    }
}

/// Handle to the spawned globe mesh. Overlay groups are attached as its
/// children so they follow its rotation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Globe {
    pub node: NodeId,
    pub radius: f64,
    pub material: MaterialId,
    pub texture: TextureId,
}

impl Globe {
    pub fn center(&self, world: &World) -> Vec3 {
        world
            .world_transform(self.node)
            .map(|t| t.position)
            .unwrap_or(Vec3::ZERO)
    }
}

pub fn spawn_globe(world: &mut World, options: &GlobeOptions) -> Globe {
    let node = world.spawn_named("Globe");
    world.set_transform(node, Transform::identity());

    let geometry = world.create_geometry(Geometry::Sphere {
        radius: options.radius,
        width_segments: options.segments,
        height_segments: options.segments,
    });
    let texture = world.create_texture(Texture::new(options.texture_url.clone()));
    let material =
        world.create_material(Material::new(MaterialKind::Standard, 0xffffff).with_map(texture));

    // Resources were created just above, so this cannot fail.
    if let Err(err) = world.set_drawable(node, Drawable3D::mesh(geometry, material)) {
        tracing::error!("globe drawable rejected: {err}");
    }

    Globe {
        node,
        radius: options.radius,
        material,
        texture,
    }
}

pub fn mark_texture_loaded(world: &mut World, globe: &Globe) {
    if let Some(texture) = world.resources_mut().texture_mut(globe.texture) {
        texture.status = TextureStatus::Loaded;
    }
    tracing::info!("globe texture loaded");
}

/// Switches the globe to its flat fallback color.
pub fn mark_texture_failed(world: &mut World, globe: &Globe) {
    if let Some(texture) = world.resources_mut().texture_mut(globe.texture) {
        texture.status = TextureStatus::Failed;
    }
    if let Some(material) = world.resources_mut().material_mut(globe.material) {
        material.color = GLOBE_FALLBACK_COLOR;
    }
    tracing::error!("globe texture failed to load; using fallback color");
}

#[cfg(test)]
mod tests {
    use super::{GLOBE_FALLBACK_COLOR, GlobeOptions, mark_texture_failed, spawn_globe};
    use crate::World;
    use crate::resources::{Geometry, TextureStatus};

    #[test]
    fn spawns_globe_drawable() {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());

        let drawables = world.visible_drawables();
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].0, globe.node);

        let geometry = world.resources().geometry(drawables[0].2.geometry);
        assert!(matches!(geometry, Some(Geometry::Sphere { radius, .. }) if *radius == 1.0));
    }

    #[test]
    fn failed_texture_switches_to_fallback_color() {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());
        mark_texture_failed(&mut world, &globe);

        let material = world.resources().material(globe.material).expect("material");
        assert_eq!(material.color, GLOBE_FALLBACK_COLOR);
        let texture = world.resources().texture(globe.texture).expect("texture");
        assert_eq!(texture.status, TextureStatus::Failed);
    }

    #[test]
    fn teardown_releases_globe_texture() {
        let mut world = World::new();
        spawn_globe(&mut world, &GlobeOptions::default());
        let report = world.teardown();
        assert_eq!(report.textures, 1);
        assert_eq!(report.materials, 1);
        assert_eq!(report.geometries, 1);
    }
}
