use crate::resources::{GeometryId, MaterialId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawKind {
    /// Filled triangles (globe, marker discs).
    Mesh,
    /// Line strip through the geometry's vertices.
    Line,
}

/// A drawable attached to a node: one geometry rendered with one material.
///
/// Geometries and materials are owned by the world's resource registry and
/// may be shared between many drawables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Drawable3D {
    pub kind: DrawKind,
    pub geometry: GeometryId,
    pub material: MaterialId,
}

impl Drawable3D {
    pub fn mesh(geometry: GeometryId, material: MaterialId) -> Self {
        Self {
            kind: DrawKind::Mesh,
            geometry,
            material,
        }
    }

    pub fn line(geometry: GeometryId, material: MaterialId) -> Self {
        Self {
            kind: DrawKind::Line,
            geometry,
            material,
        }
    }
}
