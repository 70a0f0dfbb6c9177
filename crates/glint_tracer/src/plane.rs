//! Infinite plane primitive.

use crate::intersection::{lambda_in_range, Intersect, SurfaceHit};
use glint_math::{safe_normalize, BoundingBox, DVec3, Ray, EPSILON};

/// An infinite plane through `point` with a constant `normal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    point: DVec3,
    normal: DVec3,
}

impl Plane {
    /// Create a plane. The normal is normalized.
    pub fn new(point: DVec3, normal: DVec3) -> Self {
        Self {
            point,
            normal: safe_normalize(normal),
        }
    }

    pub fn point(&self) -> DVec3 {
        self.point
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }
}

impl Default for Plane {
    /// The ground plane z = 0.
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::Z)
    }
}

impl Intersect for Plane {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        let denom = ray.direction().dot(self.normal);

        // Ray (nearly) parallel to the plane
        if denom.abs() < EPSILON {
            return None;
        }

        let lambda = (self.point - ray.origin()).dot(self.normal) / denom;
        if !lambda_in_range(lambda, max_lambda) {
            return None;
        }

        Some(SurfaceHit::new(lambda, self.normal, DVec3::ZERO))
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::UNIVERSE
    }
}
