use crate::{safe_normalize, DVec3};

/// A ray in 3D space with an origin and a unit direction.
///
/// The direction is normalized on construction. A zero (or near-zero) input
/// direction degrades to the zero vector instead of producing NaNs, so such a
/// ray simply never hits anything.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray. `direction` does not need to be normalized.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: safe_normalize(direction),
        }
    }

    /// Create a ray from `from` through `to`.
    pub fn between(from: DVec3, to: DVec3) -> Self {
        Self::new(from, to - from)
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Get the unit direction of the ray.
    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// Get the point along the ray at parameter `lambda`.
    ///
    /// Returns: origin + lambda * direction
    #[inline]
    pub fn at(&self, lambda: f64) -> DVec3 {
        self.origin + self.direction * lambda
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: DVec3::ZERO,
            direction: DVec3::Z,
        }
    }
}
