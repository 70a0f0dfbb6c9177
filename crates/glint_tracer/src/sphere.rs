//! Sphere primitive for ray tracing.

use crate::intersection::{lambda_in_range, Intersect, SurfaceHit};
use glint_math::{safe_normalize, BoundingBox, DVec3, Ray};

/// A sphere primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
}

impl Sphere {
    /// Create a new sphere. Negative radii are clamped to zero.
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Default for Sphere {
    /// Unit sphere at the origin.
    fn default() -> Self {
        Self::new(DVec3::ZERO, 1.0)
    }
}

impl Intersect for Sphere {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        // |o + l*d - c|^2 = r^2 with |d| = 1 (or 0 for a degenerate ray)
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        if a == 0.0 {
            return None;
        }
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !lambda_in_range(root, max_lambda) {
            root = (h + sqrtd) / a;
            if !lambda_in_range(root, max_lambda) {
                return None;
            }
        }

        let normal = safe_normalize(ray.at(root) - self.center);
        Some(SurfaceHit::new(root, normal, DVec3::ZERO))
    }

    fn bounding_box(&self) -> BoundingBox {
        let r = DVec3::splat(self.radius);
        BoundingBox::new(self.center - r, self.center + r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_from_outside() {
        let sphere = Sphere::default();
        let ray = Ray::between(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO);

        let hit = sphere.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.lambda - 4.0).abs() < 1e-12);
        assert!((ray.at(hit.lambda) - DVec3::new(0.0, 0.0, 1.0)).length() < 1e-12);
        assert!((hit.normal - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_sphere_hit_from_inside_takes_far_root() {
        let sphere = Sphere::new(DVec3::ZERO, 2.0);
        let ray = Ray::new(DVec3::ZERO, DVec3::X);

        let hit = sphere.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.lambda - 2.0).abs() < 1e-12);
        assert!((hit.normal - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_sphere_max_lambda() {
        let sphere = Sphere::default();
        let ray = Ray::between(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO);

        // Near root at 4 is out of range, far root at 6 as well
        assert!(sphere.closest_intersection(&ray, 4.0).is_none());
        assert!(!sphere.any_intersection(&ray, 4.0));

        // Near root excluded only by being equal to the bound
        assert!(sphere.any_intersection(&ray, 4.0 + 1e-9));
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);
        assert!(sphere.closest_intersection(&ray, f64::INFINITY).is_none());

        // Sphere behind the ray
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        assert!(!sphere.any_intersection(&ray, f64::INFINITY));
    }

    #[test]
    fn test_any_matches_closest() {
        let sphere = Sphere::new(DVec3::new(0.3, -0.2, 0.1), 1.3);
        for i in 0..64 {
            let phi = i as f64 * 0.37;
            let origin = DVec3::new(3.0 * phi.cos(), 3.0 * phi.sin(), (i % 5) as f64 - 2.0);
            let ray = Ray::new(origin, DVec3::new(-phi.cos(), -(phi * 1.3).sin(), 0.2));
            for max_lambda in [0.5, 2.0, 3.5, f64::INFINITY] {
                assert_eq!(
                    sphere.any_intersection(&ray, max_lambda),
                    sphere.closest_intersection(&ray, max_lambda).is_some()
                );
            }
        }
    }

    #[test]
    fn test_sphere_bounding_box() {
        let sphere = Sphere::new(DVec3::new(1.0, 2.0, 3.0), 0.5);
        let bbox = sphere.bounding_box();
        assert_eq!(bbox.min, DVec3::new(0.5, 1.5, 2.5));
        assert_eq!(bbox.max, DVec3::new(1.5, 2.5, 3.5));
    }
}
