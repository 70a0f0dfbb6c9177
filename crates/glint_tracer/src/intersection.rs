//! Intersect trait and intersection records.

use glint_math::{BoundingBox, DVec3, Ray};

/// Stable index of a renderable inside its scene.
///
/// Intersections refer to what they hit through this id instead of holding a
/// reference, so they never keep geometry alive and can be copied freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderableId(pub usize);

/// Geometric result of a single ray/shape test, before the scene attaches
/// the ray and the id of the shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Distance along the ray, always in `(0, max_lambda)`
    pub lambda: f64,
    /// Unit surface normal at the hit point
    pub normal: DVec3,
    /// Barycentric or texture coordinates, zero when the shape has none
    pub uvw: DVec3,
}

impl SurfaceHit {
    pub fn new(lambda: f64, normal: DVec3, uvw: DVec3) -> Self {
        Self { lambda, normal, uvw }
    }
}

/// A ray hitting a renderable of the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayIntersection {
    /// The ray that produced this intersection
    pub ray: Ray,
    /// The renderable that was hit
    pub renderable: RenderableId,
    /// Parameter along the ray where the intersection occurs
    pub lambda: f64,
    /// `ray.origin + lambda * ray.direction`
    pub position: DVec3,
    /// Unit surface normal
    pub normal: DVec3,
    pub uvw: DVec3,
}

impl RayIntersection {
    pub fn new(ray: Ray, renderable: RenderableId, hit: SurfaceHit) -> Self {
        Self {
            ray,
            renderable,
            lambda: hit.lambda,
            position: ray.at(hit.lambda),
            normal: hit.normal,
            uvw: hit.uvw,
        }
    }
}

/// Shapes that can be tested against rays.
///
/// Hits are only ever reported for `0 < lambda < max_lambda`; a zero or
/// negative lambda would let a ray intersect the surface it starts on.
pub trait Intersect: Send + Sync {
    /// Find the nearest hit with `lambda` in `(0, max_lambda)`.
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit>;

    /// Is there any hit with `lambda` in `(0, max_lambda)`?
    ///
    /// Used for shadow rays, where the hit itself does not matter.
    fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        self.closest_intersection(ray, max_lambda).is_some()
    }

    /// Prepare acceleration structures. Called once before rendering.
    fn initialize(&mut self) {}

    /// Axis-aligned bounds of the shape.
    fn bounding_box(&self) -> BoundingBox;
}

/// True for a valid hit distance in `(0, max_lambda)`.
#[inline]
pub(crate) fn lambda_in_range(lambda: f64, max_lambda: f64) -> bool {
    lambda > 0.0 && lambda < max_lambda
}
