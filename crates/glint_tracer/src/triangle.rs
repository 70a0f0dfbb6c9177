//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::intersection::{lambda_in_range, Intersect, SurfaceHit};
use glint_math::{safe_normalize, BoundingBox, DVec3, Ray};

/// Determinant threshold below which a ray counts as parallel to the triangle.
const DETERMINANT_EPSILON: f64 = 1e-14;

/// Raw result of a ray-triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub lambda: f64,
    /// Weights of the three vertices; they sum to one
    pub barycentric: DVec3,
}

/// Möller-Trumbore test against the triangle `(p0, p1, p2)`.
///
/// Accepts hits on the edges, rejects hits outside `(0, max_lambda)`.
pub fn intersect_triangle(
    p0: DVec3,
    p1: DVec3,
    p2: DVec3,
    ray: &Ray,
    max_lambda: f64,
) -> Option<TriangleHit> {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;

    let h = ray.direction().cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle (or the triangle is degenerate)
    if a.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - p0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction().dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let lambda = f * edge2.dot(q);
    if !lambda_in_range(lambda, max_lambda) {
        return None;
    }

    Some(TriangleHit {
        lambda,
        barycentric: DVec3::new(1.0 - u - v, u, v),
    })
}

/// A single triangle with optional per-vertex texture coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    vertices: [DVec3; 3],
    uvw: [DVec3; 3],
    /// Pre-computed face normal (unit length, or zero when degenerate)
    normal: DVec3,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3) -> Self {
        Self::with_uvw(v0, v1, v2, [DVec3::ZERO; 3])
    }

    /// Create a triangle carrying texture coordinates for each vertex.
    pub fn with_uvw(v0: DVec3, v1: DVec3, v2: DVec3, uvw: [DVec3; 3]) -> Self {
        Self {
            vertices: [v0, v1, v2],
            uvw,
            normal: safe_normalize((v1 - v0).cross(v2 - v0)),
        }
    }

    pub fn vertices(&self) -> &[DVec3; 3] {
        &self.vertices
    }

    /// Face normal following the counter-clockwise winding of the vertices.
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// Raw Möller-Trumbore result with barycentric weights.
    pub fn intersect(&self, ray: &Ray, max_lambda: f64) -> Option<TriangleHit> {
        let [p0, p1, p2] = self.vertices;
        intersect_triangle(p0, p1, p2, ray, max_lambda)
    }
}

impl Intersect for Triangle {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        let hit = self.intersect(ray, max_lambda)?;

        // Normal always points against the ray
        let normal = if ray.direction().dot(self.normal) > 0.0 {
            -self.normal
        } else {
            self.normal
        };

        let b = hit.barycentric;
        let uvw = self.uvw[0] * b.x + self.uvw[1] * b.y + self.uvw[2] * b.z;

        Some(SurfaceHit::new(hit.lambda, normal, uvw))
    }

    fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        self.intersect(ray, max_lambda).is_some()
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices)
    }
}
