//! GPU-resident resources (geometries, materials, textures).
//!
//! The registry mirrors what the host renderer has uploaded. Drawables hold
//! references to geometries and materials, materials hold a reference to
//! their texture; a resource is disposed exactly once, when its last
//! reference is released or when the whole scene is torn down.

use foundation::handles::{Handle, HandleAllocator};
use foundation::math::Vec3;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub Handle);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    /// Flat disc in the local XY plane, facing `+Z`.
    Circle { radius: f64, segments: u32 },
    Polyline { points: Vec<Vec3> },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Blending {
    Normal,
    Additive,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Unlit.
    Basic,
    /// Lit by the scene's ambient and directional lights.
    Standard,
    Line,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Material {
    pub kind: MaterialKind,
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
    pub transparent: bool,
    pub blending: Blending,
    pub double_sided: bool,
    pub depth_write: bool,
    #[serde(skip)]
    pub map: Option<TextureId>,
}

impl Material {
    pub fn new(kind: MaterialKind, color: u32) -> Self {
        Self {
            kind,
            color,
            opacity: 1.0,
            transparent: false,
            blending: Blending::Normal,
            double_sided: false,
            depth_write: true,
            map: None,
        }
    }

    /// Transparent with the given opacity.
    pub fn translucent(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = true;
        self
    }

    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn without_depth_write(mut self) -> Self {
        self.depth_write = false;
        self
    }

    pub fn with_map(mut self, texture: TextureId) -> Self {
        self.map = Some(texture);
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureStatus {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Texture {
    pub url: String,
    pub status: TextureStatus,
}

impl Texture {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: TextureStatus::Pending,
        }
    }
}

/// Counts of what a disposal released.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisposeReport {
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl std::ops::AddAssign for DisposeReport {
    fn add_assign(&mut self, other: Self) {
        self.nodes += other.nodes;
        self.geometries += other.geometries;
        self.materials += other.materials;
        self.textures += other.textures;
    }
}

#[derive(Debug)]
struct Slot<T> {
    handle: Handle,
    value: T,
    refs: u32,
}

#[derive(Debug)]
struct Store<T> {
    handles: HandleAllocator,
    slots: Vec<Option<Slot<T>>>,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            handles: HandleAllocator::new(),
            slots: Vec::new(),
        }
    }
}

impl<T> Store<T> {
    fn insert(&mut self, value: T) -> Handle {
        let handle = self.handles.alloc();
        let idx = handle.index() as usize;
        if self.slots.len() <= idx {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx] = Some(Slot {
            handle,
            value,
            refs: 0,
        });
        handle
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        if !self.handles.is_live(handle) {
            return None;
        }
        self.slots.get(handle.index() as usize)?.as_ref()
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Slot<T>> {
        if !self.handles.is_live(handle) {
            return None;
        }
        self.slots.get_mut(handle.index() as usize)?.as_mut()
    }

    fn retain(&mut self, handle: Handle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference; returns the value once the last one is gone.
    fn release(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs > 0 {
            return None;
        }
        self.remove(handle)
    }

    fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.handles.free(handle) {
            return None;
        }
        self.slots
            .get_mut(handle.index() as usize)?
            .take()
            .map(|slot| slot.value)
    }

    fn live_handles(&self) -> Vec<Handle> {
        self.slots.iter().flatten().map(|slot| slot.handle).collect()
    }

    fn len(&self) -> usize {
        self.handles.live_count()
    }
}

/// Owner of every GPU-resident resource in a [`crate::World`].
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    geometries: Store<Geometry>,
    materials: Store<Material>,
    textures: Store<Texture>,
    disposed: DisposeReport,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_geometry(&mut self, geometry: Geometry) -> GeometryId {
        GeometryId(self.geometries.insert(geometry))
    }

    /// The material takes a reference on its texture, if any.
    pub fn create_material(&mut self, material: Material) -> MaterialId {
        if let Some(texture) = material.map {
            self.textures.retain(texture.0);
        }
        MaterialId(self.materials.insert(material))
    }

    pub fn create_texture(&mut self, texture: Texture) -> TextureId {
        TextureId(self.textures.insert(texture))
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.slot(id.0).map(|s| &s.value)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.slot(id.0).map(|s| &s.value)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.slot_mut(id.0).map(|s| &mut s.value)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.slot(id.0).map(|s| &s.value)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.slot_mut(id.0).map(|s| &mut s.value)
    }

    pub(crate) fn retain_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.retain(id.0)
    }

    pub(crate) fn retain_material(&mut self, id: MaterialId) -> bool {
        self.materials.retain(id.0)
    }

    pub(crate) fn release_geometry(&mut self, id: GeometryId) -> DisposeReport {
        let mut report = DisposeReport::default();
        if self.geometries.release(id.0).is_some() {
            report.geometries += 1;
        }
        self.disposed += report;
        report
    }

    pub(crate) fn release_material(&mut self, id: MaterialId) -> DisposeReport {
        let mut report = DisposeReport::default();
        if let Some(material) = self.materials.release(id.0) {
            report.materials += 1;
            if let Some(texture) = material.map
                && self.textures.release(texture.0).is_some()
            {
                report.textures += 1;
            }
        }
        self.disposed += report;
        report
    }

    /// Disposes everything still alive, referenced or not.
    pub fn dispose_all(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();
        for handle in self.geometries.live_handles() {
            if self.geometries.remove(handle).is_some() {
                report.geometries += 1;
            }
        }
        for handle in self.materials.live_handles() {
            if self.materials.remove(handle).is_some() {
                report.materials += 1;
            }
        }
        for handle in self.textures.live_handles() {
            if self.textures.remove(handle).is_some() {
                report.textures += 1;
            }
        }
        self.disposed += report;
        report
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Running total of everything disposed by this registry.
    pub fn disposed(&self) -> DisposeReport {
        self.disposed
    }
}
