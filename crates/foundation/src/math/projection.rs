//! Latitude/longitude to globe-space projection.
//!
//! Every overlay (earthquake discs, volcano discs, border lines, click
//! annotations) goes through the same [`Projection`] so that they line up with
//! each other and with the globe texture.
//!
//! Convention (globe space, Y up):
//! - longitude 0° lies on `+Z` before the offset is applied
//! - `y = r·sin(lat)`
//! - `x = r·cos(lat)·sin(lon + offset)`
//! - `z = r·cos(lat)·cos(lon + offset)`
//!
//! where `r = radius + SURFACE_EPSILON`.

use serde::{Deserialize, Serialize};

use super::Vec3;
use crate::geo::{GeoPoint, wrap_longitude_deg};

/// Longitude correction that aligns geographic 0° with the base texture's
/// prime meridian.
pub const DEFAULT_LONGITUDE_OFFSET_DEG: f64 = 90.0;

/// Lift above the sphere so overlays do not z-fight with the globe mesh.
pub const SURFACE_EPSILON: f64 = 0.001;

/// A point on (or just above) the globe, in globe-local coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePosition(pub Vec3);

impl SurfacePosition {
    pub fn vec3(self) -> Vec3 {
        self.0
    }
}

/// Projects `(lat, lon)` in degrees onto a sphere of `radius`.
pub fn project(lat_deg: f64, lon_deg: f64, radius: f64, longitude_offset_deg: f64) -> Vec3 {
    let lat = lat_deg.to_radians();
    let lon = (lon_deg + longitude_offset_deg).to_radians();
    let r = radius + SURFACE_EPSILON;

    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    Vec3::new(r * cos_lat * sin_lon, r * sin_lat, r * cos_lat * cos_lon)
}

/// The projection service shared by every layer of a session.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    longitude_offset_deg: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(DEFAULT_LONGITUDE_OFFSET_DEG)
    }
}

impl Projection {
    pub fn new(longitude_offset_deg: f64) -> Self {
        Self {
            longitude_offset_deg,
        }
    }

    pub fn longitude_offset_deg(&self) -> f64 {
        self.longitude_offset_deg
    }

    /// Only affects positions projected after the call; existing overlays
    /// keep the geometry they were built with.
    pub fn set_longitude_offset(&mut self, offset_deg: f64) {
        self.longitude_offset_deg = offset_deg;
    }

    pub fn project(&self, point: GeoPoint, radius: f64) -> SurfacePosition {
        SurfacePosition(project(
            point.latitude,
            point.longitude,
            radius,
            self.longitude_offset_deg,
        ))
    }

    /// Inverse of [`Projection::project`] for any non-zero globe-space point.
    ///
    /// The radius is discarded. At the poles the longitude is arbitrary and
    /// comes back as whatever `atan2` yields.
    pub fn unproject(&self, position: Vec3) -> Option<GeoPoint> {
        let r = position.length();
        if r <= 0.0 || !r.is_finite() {
            return None;
        }
        let lat = (position.y / r).clamp(-1.0, 1.0).asin().to_degrees();
        let lon_with_offset = position.x.atan2(position.z).to_degrees();
        let lon = wrap_longitude_deg(lon_with_offset - self.longitude_offset_deg);
        Some(GeoPoint::new(lat, lon))
    }

    /// Outward unit normal of the sphere at a projected position.
    pub fn surface_normal(&self, position: SurfacePosition) -> Option<Vec3> {
        position.0.try_normalize()
    }
}
