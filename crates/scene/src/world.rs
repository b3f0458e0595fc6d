use std::fmt;

use foundation::handles::HandleAllocator;

use crate::components::{Drawable3D, Transform, Visibility};
use crate::entity::NodeId;
use crate::resources::{
    DisposeReport, Geometry, GeometryId, Material, MaterialId, ResourceRegistry, Texture,
    TextureId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    UnknownNode(NodeId),
    UnknownGeometry(GeometryId),
    UnknownMaterial(MaterialId),
    /// Attaching would make a node its own ancestor.
    Cycle { parent: NodeId, child: NodeId },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::UnknownNode(id) => write!(f, "unknown scene node {}", id.index()),
            SceneError::UnknownGeometry(id) => write!(f, "unknown geometry {}", id.0.index()),
            SceneError::UnknownMaterial(id) => write!(f, "unknown material {}", id.0.index()),
            SceneError::Cycle { parent, child } => write!(
                f,
                "cannot attach node {} under its descendant {}",
                child.index(),
                parent.index()
            ),
        }
    }
}

impl std::error::Error for SceneError {}

#[derive(Debug, Clone)]
struct Node {
    id: NodeId,
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform: Transform,
    visibility: Visibility,
    drawable: Option<Drawable3D>,
}

/// Scene graph: a forest of nodes plus the resources their drawables use.
#[derive(Debug, Default)]
pub struct World {
    handles: HandleAllocator,
    nodes: Vec<Option<Node>>,
    resources: ResourceRegistry,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a detached root node.
    pub fn spawn(&mut self) -> NodeId {
        let id = NodeId(self.handles.alloc());
        let idx = id.index() as usize;
        if self.nodes.len() <= idx {
            self.nodes.resize_with(idx + 1, || None);
        }
        self.nodes[idx] = Some(Node {
            id,
            name: None,
            parent: None,
            children: Vec::new(),
            transform: Transform::identity(),
            visibility: Visibility::visible(),
            drawable: None,
        });
        id
    }

    pub fn spawn_named(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.spawn();
        if let Some(node) = self.node_mut(id) {
            node.name = Some(name.into());
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.handles.live_count()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.name.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Attaches `child` under `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::UnknownNode(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::UnknownNode(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }

        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Makes `id` a root again. No-op for roots and unknown nodes.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.parent(id) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.node_mut(id) {
            node.transform = transform;
        }
    }

    pub fn transform(&self, id: NodeId) -> Option<Transform> {
        Some(self.node(id)?.transform)
    }

    /// Transform from the node's local space to world space.
    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        let node = self.node(id)?;
        match node.parent {
            Some(parent) => Some(self.world_transform(parent)?.compose(&node.transform)),
            None => Some(node.transform),
        }
    }

    pub fn set_visibility(&mut self, id: NodeId, visibility: Visibility) {
        if let Some(node) = self.node_mut(id) {
            node.visibility = visibility;
        }
    }

    /// The node's own flag, ignoring ancestors.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).map(|n| n.visibility.visible).unwrap_or(false)
    }

    /// Visible only if the node and every ancestor are visible.
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(node) = self.node(id) else {
                return false;
            };
            if !node.visibility.visible {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Attaches a drawable, taking references on its geometry and material.
    pub fn set_drawable(&mut self, id: NodeId, drawable: Drawable3D) -> Result<(), SceneError> {
        if !self.contains(id) {
            return Err(SceneError::UnknownNode(id));
        }
        if self.resources.geometry(drawable.geometry).is_none() {
            return Err(SceneError::UnknownGeometry(drawable.geometry));
        }
        if self.resources.material(drawable.material).is_none() {
            return Err(SceneError::UnknownMaterial(drawable.material));
        }

        self.resources.retain_geometry(drawable.geometry);
        self.resources.retain_material(drawable.material);
        let previous = self.node_mut(id).and_then(|n| n.drawable.replace(drawable));
        if let Some(previous) = previous {
            self.release_drawable(previous);
        }
        Ok(())
    }

    pub fn drawable(&self, id: NodeId) -> Option<Drawable3D> {
        self.node(id)?.drawable
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    pub fn create_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.resources.create_geometry(geometry)
    }

    pub fn create_material(&mut self, material: Material) -> MaterialId {
        self.resources.create_material(material)
    }

    pub fn create_texture(&mut self, texture: Texture) -> TextureId {
        self.resources.create_texture(texture)
    }

    /// Every drawable whose node is effectively visible, with its world
    /// transform. Ordered by node index.
    pub fn visible_drawables(&self) -> Vec<(NodeId, Transform, Drawable3D)> {
        let mut out = Vec::new();
        for node in self.nodes.iter().flatten() {
            let id = node.id;
            let Some(drawable) = node.drawable else {
                continue;
            };
            if !self.is_effectively_visible(id) {
                continue;
            }
            let Some(transform) = self.world_transform(id) else {
                continue;
            };
            out.push((id, transform, drawable));
        }
        out
    }

    /// Removes `id` and its whole subtree, releasing every resource reference
    /// the subtree's drawables hold.
    pub fn despawn_recursive(&mut self, id: NodeId) -> Result<DisposeReport, SceneError> {
        if !self.contains(id) {
            return Err(SceneError::UnknownNode(id));
        }
        self.detach(id);

        let mut report = DisposeReport::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.handles.is_live(current.0) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(current.index() as usize).and_then(Option::take)
            else {
                continue;
            };
            self.handles.free(current.0);
            report.nodes += 1;
            stack.extend(node.children.iter().copied());
            if let Some(drawable) = node.drawable {
                report += self.release_drawable(drawable);
            }
        }
        tracing::debug!(
            nodes = report.nodes,
            geometries = report.geometries,
            materials = report.materials,
            textures = report.textures,
            "despawned subtree"
        );
        Ok(report)
    }

    /// Releases every node and resource in the scene.
    pub fn teardown(&mut self) -> DisposeReport {
        let roots: Vec<NodeId> = self
            .nodes
            .iter()
            .flatten()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect();

        let mut report = DisposeReport::default();
        for root in roots {
            if let Ok(r) = self.despawn_recursive(root) {
                report += r;
            }
        }
        report += self.resources.dispose_all();
        tracing::info!(
            nodes = report.nodes,
            geometries = report.geometries,
            materials = report.materials,
            textures = report.textures,
            "scene torn down"
        );
        report
    }

    fn release_drawable(&mut self, drawable: Drawable3D) -> DisposeReport {
        let mut report = self.resources.release_geometry(drawable.geometry);
        report += self.resources.release_material(drawable.material);
        report
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        if !self.handles.is_live(id.0) {
            return None;
        }
        self.nodes.get(id.index() as usize)?.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if !self.handles.is_live(id.0) {
            return None;
        }
        self.nodes.get_mut(id.index() as usize)?.as_mut()
    }
}
