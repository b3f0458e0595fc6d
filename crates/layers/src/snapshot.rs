//! Flat, serializable view of what the host renderer should draw this frame.

use std::collections::BTreeMap;

use runtime::frame::Frame;
use scene::World;
use scene::camera::OrbitCamera;
use scene::components::DrawKind;
use scene::resources::{Geometry, Material, TextureStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSnapshot {
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub fov_y_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

/// One drawable node with its world transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub node: u32,
    pub geometry: u32,
    pub material: u32,
    pub position: [f64; 3],
    /// `[x, y, z, w]`.
    pub rotation: [f64; 4],
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSnapshot {
    #[serde(flatten)]
    pub material: Material,
    /// Texture URL, present once the texture has loaded.
    pub map: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneSnapshot {
    pub frame: u64,
    pub camera: Option<CameraSnapshot>,
    pub meshes: Vec<Instance>,
    pub lines: Vec<Instance>,
    /// Every geometry referenced by an instance, by id.
    pub geometries: BTreeMap<u32, Geometry>,
    pub materials: BTreeMap<u32, MaterialSnapshot>,
}

impl SceneSnapshot {
    pub fn extract(world: &World, camera: &OrbitCamera, frame: Frame) -> Self {
        let mut out = SceneSnapshot {
            frame: frame.index,
            camera: Some(CameraSnapshot {
                position: camera.position().as_array(),
                target: camera.target.as_array(),
                fov_y_deg: camera.settings.fov_y_deg,
                aspect: camera.aspect(),
                near: camera.settings.near,
                far: camera.settings.far,
            }),
            ..SceneSnapshot::default()
        };

        let resources = world.resources();
        for (node, transform, drawable) in world.visible_drawables() {
            let geometry = drawable.geometry.0.index();
            let material = drawable.material.0.index();
            let instance = Instance {
                node: node.index(),
                geometry,
                material,
                position: transform.position.as_array(),
                rotation: transform.rotation.as_array(),
                scale: transform.scale,
            };
            match drawable.kind {
                DrawKind::Mesh => out.meshes.push(instance),
                DrawKind::Line => out.lines.push(instance),
            }

            if let Some(g) = resources.geometry(drawable.geometry) {
                out.geometries.entry(geometry).or_insert_with(|| g.clone());
            }
            if let Some(m) = resources.material(drawable.material) {
                out.materials.entry(material).or_insert_with(|| MaterialSnapshot {
                    material: *m,
                    map: m
                        .map
                        .and_then(|t| resources.texture(t))
                        .filter(|t| t.status == TextureStatus::Loaded)
                        .map(|t| t.url.clone()),
                });
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
