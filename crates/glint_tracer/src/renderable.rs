//! Renderables: a shape paired with a material.

use crate::bvh_mesh::BvhTriangleMesh;
use crate::intersection::{Intersect, SurfaceHit};
use crate::material::Material;
use crate::mesh::TriangleMesh;
use crate::plane::Plane;
use crate::sphere::Sphere;
use crate::triangle::Triangle;
use glint_math::{BoundingBox, Ray};
use std::sync::Arc;

/// Every kind of geometry the tracer understands.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
    Plane(Plane),
    TriangleMesh(TriangleMesh),
    BvhTriangleMesh(BvhTriangleMesh),
}

impl Intersect for Shape {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        match self {
            Shape::Sphere(s) => s.closest_intersection(ray, max_lambda),
            Shape::Triangle(s) => s.closest_intersection(ray, max_lambda),
            Shape::Plane(s) => s.closest_intersection(ray, max_lambda),
            Shape::TriangleMesh(s) => s.closest_intersection(ray, max_lambda),
            Shape::BvhTriangleMesh(s) => s.closest_intersection(ray, max_lambda),
        }
    }

    fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        match self {
            Shape::Sphere(s) => s.any_intersection(ray, max_lambda),
            Shape::Triangle(s) => s.any_intersection(ray, max_lambda),
            Shape::Plane(s) => s.any_intersection(ray, max_lambda),
            Shape::TriangleMesh(s) => s.any_intersection(ray, max_lambda),
            Shape::BvhTriangleMesh(s) => s.any_intersection(ray, max_lambda),
        }
    }

    fn initialize(&mut self) {
        if let Shape::BvhTriangleMesh(mesh) = self {
            mesh.initialize();
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        match self {
            Shape::Sphere(s) => s.bounding_box(),
            Shape::Triangle(s) => s.bounding_box(),
            Shape::Plane(s) => s.bounding_box(),
            Shape::TriangleMesh(s) => s.bounding_box(),
            Shape::BvhTriangleMesh(s) => s.bounding_box(),
        }
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Self {
        Shape::Sphere(s)
    }
}

impl From<Triangle> for Shape {
    fn from(s: Triangle) -> Self {
        Shape::Triangle(s)
    }
}

impl From<Plane> for Shape {
    fn from(s: Plane) -> Self {
        Shape::Plane(s)
    }
}

impl From<TriangleMesh> for Shape {
    fn from(s: TriangleMesh) -> Self {
        Shape::TriangleMesh(s)
    }
}

impl From<BvhTriangleMesh> for Shape {
    fn from(s: BvhTriangleMesh) -> Self {
        Shape::BvhTriangleMesh(s)
    }
}

/// Something the scene can draw.
///
/// Materials are shared, so many renderables can point at one.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub shape: Shape,
    pub material: Arc<Material>,
}

impl Renderable {
    pub fn new(shape: impl Into<Shape>, material: Arc<Material>) -> Self {
        Self {
            shape: shape.into(),
            material,
        }
    }

    /// Convenience for a renderable that owns its material.
    pub fn with_material(shape: impl Into<Shape>, material: impl Into<Material>) -> Self {
        Self::new(shape, Arc::new(material.into()))
    }
}

impl Intersect for Renderable {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        self.shape.closest_intersection(ray, max_lambda)
    }

    fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        self.shape.any_intersection(ray, max_lambda)
    }

    fn initialize(&mut self) {
        self.shape.initialize();
    }

    fn bounding_box(&self) -> BoundingBox {
        self.shape.bounding_box()
    }
}
