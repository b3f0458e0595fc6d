use scene::resources::{Blending, Material, MaterialKind};

/// How a layer's markers or lines are drawn.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
    pub blending: Blending,
    /// Extra lift above the globe surface, on top of the projection's own.
    pub lift: f64,
}

impl LayerStyle {
    pub const fn new(color: u32, opacity: f32, blending: Blending, lift: f64) -> Self {
        Self {
            color,
            opacity,
            blending,
            lift,
        }
    }

    /// Unlit, double-sided disc material that never writes depth.
    pub fn marker_material(&self) -> Material {
        Material::new(MaterialKind::Basic, self.color)
            .translucent(self.opacity)
            .with_blending(self.blending)
            .double_sided()
            .without_depth_write()
    }

    pub fn line_material(&self) -> Material {
        Material::new(MaterialKind::Line, self.color).translucent(self.opacity)
    }
}

pub const EARTHQUAKE_STYLE: LayerStyle = LayerStyle::new(0xff0000, 0.6, Blending::Normal, 0.0);
pub const VOLCANO_STYLE: LayerStyle = LayerStyle::new(0xffd700, 0.8, Blending::Additive, 0.0);
pub const BORDER_STYLE: LayerStyle = LayerStyle::new(
    0x00ff00,
    0.3,
    Blending::Normal,
    foundation::math::SURFACE_EPSILON,
);

/// Segment count of the shared marker disc.
pub const MARKER_SEGMENTS: u32 = 16;
