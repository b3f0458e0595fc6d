use foundation::math::Vec3;

use crate::World;
use crate::prefabs::Globe;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlobeHit {
    /// Hit point in world space.
    pub point: Vec3,
    /// Hit point in the globe's local space (where overlays live).
    pub local_point: Vec3,
    /// Outward unit normal in world space.
    pub normal: Vec3,
    pub distance: f64,
}

/// Intersects a ray with the globe sphere, honoring the globe's current
/// transform. Returns the nearest hit in front of the ray origin.
pub fn pick_globe(world: &World, globe: &Globe, ray: Ray) -> Option<GlobeHit> {
    let dir = ray.dir.try_normalize()?;
    let transform = world.world_transform(globe.node)?;
    let center = transform.position;
    let radius = globe.radius * transform.scale;

    let oc = ray.origin - center;
    let b = oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let mut t = -b - sqrt_disc;
    if t < 0.0 {
        // Origin inside the sphere: take the exit point.
        t = -b + sqrt_disc;
    }
    if t < 0.0 {
        return None;
    }

    let point = ray.origin + dir * t;
    let normal = (point - center).try_normalize()?;
    Some(GlobeHit {
        point,
        local_point: transform.apply_inverse(point),
        normal,
        distance: t,
    })
}

/// Screen picking wrapper.
///
/// The caller supplies the screen->ray mapping via `make_ray`.
pub fn pick_screen<F>(
    world: &World,
    globe: &Globe,
    x_px: f64,
    y_px: f64,
    make_ray: F,
) -> Option<GlobeHit>
where
    F: FnOnce(f64, f64) -> Ray,
{
    pick_globe(world, globe, make_ray(x_px, y_px))
}

#[cfg(test)]
mod tests {
    use super::{Ray, pick_globe, pick_screen};
    use crate::World;
    use crate::camera::OrbitCamera;
    use crate::components::Transform;
    use crate::prefabs::{GlobeOptions, spawn_globe};
    use foundation::math::{Quat, Vec3};

    #[test]
    fn ray_hits_near_side_of_globe() {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = pick_globe(&world, &globe, ray).expect("hit");
        assert!(hit.point.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-12);
        assert!(hit.normal.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-12);
        assert!((hit.distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn ray_missing_globe_returns_none() {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());
        let ray = Ray::new(Vec3::new(0.0, 2.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(pick_globe(&world, &globe, ray).is_none());
        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(pick_globe(&world, &globe, away).is_none());
    }

    #[test]
    fn local_point_accounts_for_globe_rotation() {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());
        world.set_transform(
            globe.node,
            Transform::identity()
                .with_rotation(Quat::from_axis_angle(Vec3::Y, std::f64::consts::FRAC_PI_2)),
        );
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = pick_globe(&world, &globe, ray).expect("hit");
        // World +Z is local -X after a quarter turn about +Y.
        assert!(hit.local_point.distance(Vec3::new(-1.0, 0.0, 0.0)) < 1e-12);
    }

    #[test]
    fn screen_center_from_default_camera_hits_front() {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());
        let camera = OrbitCamera::default();
        let hit = pick_screen(&world, &globe, 640.0, 360.0, |x, y| camera.ray_from_pixel(x, y))
            .expect("hit");
        assert!(hit.point.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-9);
    }
}
