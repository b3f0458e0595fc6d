//! Orbit camera with damped rotate, pan and zoom around a target point.
//!
//! Pointer and wheel input only accumulate deltas; [`OrbitCamera::update`]
//! applies a `damping_factor` share of them each frame and decays the rest,
//! which gives the inertial feel of the globe. The render loop calls
//! `update` once per frame.

use foundation::math::{Vec2, Vec3};

use crate::picking::Ray;

const MIN_POLAR: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitSettings {
    pub damping_factor: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
    pub pan_speed: f64,
    pub enable_pan: bool,
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            damping_factor: 0.05,
            min_distance: 1.2,
            max_distance: 10.0,
            rotate_speed: 1.0,
            zoom_speed: 2.5,
            pan_speed: 1.0,
            enable_pan: true,
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Spherical coordinates around the target: `phi` is the polar angle from
/// `+Y`, `theta` the azimuth from `+Z` toward `+X`.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Spherical {
    radius: f64,
    phi: f64,
    theta: f64,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub settings: OrbitSettings,
    pub target: Vec3,
    position: Vec3,
    aspect: f64,
    viewport: Vec2,
    delta_theta: f64,
    delta_phi: f64,
    scale: f64,
    pan_offset: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(OrbitSettings::default())
    }
}

impl OrbitCamera {
    /// Camera at `(0, 0, 5)` looking at the origin.
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            settings,
            target: Vec3::ZERO,
            position: Vec3::new(0.0, 0.0, 5.0),
            aspect: 16.0 / 9.0,
            viewport: Vec2::new(1280.0, 720.0),
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn distance(&self) -> f64 {
        self.position.distance(self.target)
    }

    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    /// Resize notification from the host; updates the projection aspect.
    pub fn set_viewport(&mut self, width_px: f64, height_px: f64) {
        let width = width_px.max(1.0);
        let height = height_px.max(1.0);
        self.viewport = Vec2::new(width, height);
        self.aspect = width / height;
    }

    /// Drag with the rotate button, in pixels.
    pub fn rotate(&mut self, delta_x_px: f64, delta_y_px: f64) {
        let h = self.viewport.y;
        let k = 2.0 * std::f64::consts::PI * self.settings.rotate_speed / h;
        self.delta_theta -= delta_x_px * k;
        self.delta_phi -= delta_y_px * k;
    }

    /// Drag with the pan button, in pixels. Pans in the plane perpendicular to
    /// world up, so the camera keeps orbiting the same latitude band.
    pub fn pan(&mut self, delta_x_px: f64, delta_y_px: f64) {
        if !self.settings.enable_pan {
            return;
        }
        let (_, right, _) = self.basis();
        let half_fov = (0.5 * self.settings.fov_y_deg).to_radians();
        let unit =
            2.0 * self.distance() * half_fov.tan() / self.viewport.y * self.settings.pan_speed;

        let forward_flat = Vec3::Y.cross(right);
        self.pan_offset =
            self.pan_offset + right * (-delta_x_px * unit) + forward_flat * (delta_y_px * unit);
    }

    /// Wheel input; negative `delta_y` zooms in.
    pub fn zoom(&mut self, wheel_delta_y: f64) {
        let step = 0.95_f64.powf(self.settings.zoom_speed);
        if wheel_delta_y < 0.0 {
            self.scale *= step;
        } else if wheel_delta_y > 0.0 {
            self.scale /= step;
        }
    }

    /// Applies damped input. Returns true while the camera is still moving.
    pub fn update(&mut self) -> bool {
        let damping = self.settings.damping_factor;
        let mut spherical = Spherical::from_offset(self.position - self.target);

        spherical.theta += self.delta_theta * damping;
        spherical.phi += self.delta_phi * damping;
        spherical.phi = spherical.phi.clamp(MIN_POLAR, std::f64::consts::PI - MIN_POLAR);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.settings.min_distance, self.settings.max_distance);

        self.target = self.target + self.pan_offset * damping;
        let previous = self.position;
        self.position = self.target + spherical.to_offset();

        self.delta_theta *= 1.0 - damping;
        self.delta_phi *= 1.0 - damping;
        self.pan_offset = self.pan_offset * (1.0 - damping);
        self.scale = 1.0;

        previous.distance(self.position) > 1e-9
    }

    /// Forward, right and up unit vectors of the camera.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let right = forward
            .cross(Vec3::Y)
            .try_normalize()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Ray through normalized device coordinates (`[-1, 1]`, `+y` up).
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let (forward, right, up) = self.basis();
        let half_h = (0.5 * self.settings.fov_y_deg).to_radians().tan();
        let half_w = half_h * self.aspect;
        let dir = forward + right * (ndc.x * half_w) + up * (ndc.y * half_h);
        Ray::new(self.position, dir)
    }

    /// Ray through a pixel position (origin top-left).
    pub fn ray_from_pixel(&self, x_px: f64, y_px: f64) -> Ray {
        let ndc = Vec2::new(
            (x_px / self.viewport.x) * 2.0 - 1.0,
            -(y_px / self.viewport.y) * 2.0 + 1.0,
        );
        self.ray_from_ndc(ndc)
    }
}
