use serde::{Deserialize, Serialize};

use super::Vec3;

/// Unit quaternion `[x, y, z, w]` describing a rotation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let Some(axis) = axis.try_normalize() else {
            return Self::IDENTITY;
        };
        let (s, c) = (0.5 * angle_rad).sin_cos();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: c,
        }
    }

    /// Rotation that turns local `+Z` toward `forward`, keeping local `+Y`
    /// as close to `up` as possible.
    ///
    /// A flat marker built in the XY plane and rotated by
    /// `look_rotation(target - position, up)` faces `target`.
    pub fn look_rotation(forward: Vec3, up: Vec3) -> Self {
        let Some(z) = forward.try_normalize() else {
            return Self::IDENTITY;
        };
        let x = match up.cross(z).try_normalize() {
            Some(x) => x,
            // forward is parallel to up; any perpendicular axis will do.
            None => {
                let alt = if z.x.abs() < 0.9 {
                    Vec3::new(1.0, 0.0, 0.0)
                } else {
                    Vec3::new(0.0, 0.0, 1.0)
                };
                match alt.cross(z).try_normalize() {
                    Some(x) => x,
                    None => return Self::IDENTITY,
                }
            }
        };
        let y = z.cross(x);
        Self::from_basis(x, y, z)
    }

    /// Quaternion from an orthonormal basis (matrix columns `x`, `y`, `z`).
    fn from_basis(x: Vec3, y: Vec3, z: Vec3) -> Self {
        let (m00, m01, m02) = (x.x, y.x, z.x);
        let (m10, m11, m12) = (x.y, y.y, z.y);
        let (m20, m21, m22) = (x.z, y.z, z.z);
        let trace = m00 + m11 + m22;

        let q = if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Self {
                w: 0.25 / s,
                x: (m21 - m12) * s,
                y: (m02 - m20) * s,
                z: (m10 - m01) * s,
            }
        } else if m00 > m11 && m00 > m22 {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            Self {
                w: (m21 - m12) / s,
                x: 0.25 * s,
                y: (m01 + m10) / s,
                z: (m02 + m20) / s,
            }
        } else if m11 > m22 {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            Self {
                w: (m02 - m20) / s,
                x: (m01 + m10) / s,
                y: 0.25 * s,
                z: (m12 + m21) / s,
            }
        } else {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            Self {
                w: (m10 - m01) / s,
                x: (m02 + m20) / s,
                y: (m12 + m21) / s,
                z: 0.25 * s,
            }
        };
        q.normalized()
    }

    pub fn normalized(self) -> Self {
        let n = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if n <= 0.0 || !n.is_finite() {
            return Self::IDENTITY;
        }
        Self {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
            w: self.w / n,
        }
    }

    pub fn conjugate(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Hamilton product `self * other` (apply `other` first).
    pub fn compose(self, other: Self) -> Self {
        Self {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    pub fn as_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::Quat;
    use crate::math::Vec3;

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let d = a.distance(b);
        assert!(d <= eps, "expected {a:?} ~= {b:?} (diff {d})");
    }

    #[test]
    fn axis_angle_quarter_turn_about_y() {
        let q = Quat::from_axis_angle(Vec3::Y, std::f64::consts::FRAC_PI_2);
        assert_vec_close(q.rotate(Vec3::new(0.0, 0.0, 1.0)), Vec3::new(1.0, 0.0, 0.0), 1e-12);
    }

    #[test]
    fn look_rotation_points_local_z_at_target() {
        let position = Vec3::new(0.3, -0.8, 0.5);
        let q = Quat::look_rotation(Vec3::ZERO - position, Vec3::Y);
        let forward = q.rotate(Vec3::new(0.0, 0.0, 1.0));
        let expected = (Vec3::ZERO - position).try_normalize().expect("dir");
        assert_vec_close(forward, expected, 1e-9);
    }

    #[test]
    fn look_rotation_handles_forward_parallel_to_up() {
        let q = Quat::look_rotation(Vec3::new(0.0, -1.0, 0.0), Vec3::Y);
        let forward = q.rotate(Vec3::new(0.0, 0.0, 1.0));
        assert_vec_close(forward, Vec3::new(0.0, -1.0, 0.0), 1e-9);
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0), 0.7);
        let v = Vec3::new(0.2, 0.4, -0.9);
        assert_vec_close(q.conjugate().rotate(q.rotate(v)), v, 1e-12);
        assert_vec_close(q.compose(q.conjugate()).rotate(v), v, 1e-12);
    }
}
