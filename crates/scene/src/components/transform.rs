use foundation::math::{Quat, Vec3};

/// Local transform relative to the parent node.
///
/// Scale is uniform; markers are discs scaled by their radius.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Orients local `+Z` toward `target` (given in the parent's space).
    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.rotation = Quat::look_rotation(target - self.position, Vec3::Y);
        self
    }

    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation.rotate(point * self.scale)
    }

    pub fn apply_inverse(&self, point: Vec3) -> Vec3 {
        let local = self.rotation.conjugate().rotate(point - self.position);
        if self.scale == 0.0 {
            local
        } else {
            local * (1.0 / self.scale)
        }
    }

    /// `self ∘ child`: the child's transform expressed in this node's parent space.
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            position: self.apply(child.position),
            rotation: self.rotation.compose(child.rotation),
            scale: self.scale * child.scale,
        }
    }
}
