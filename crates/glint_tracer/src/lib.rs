//! glint tracer - CPU Whitted-style ray tracing.
//!
//! Closest-hit ray casting with shadow rays and bounded recursive reflection
//! over spheres, planes, triangles and BVH-accelerated triangle meshes.
//! Rows of the image are rendered in parallel with rayon.

mod intersection;
mod sphere;
mod plane;
mod triangle;
mod mesh;
mod bvh;
mod bvh_mesh;
mod renderable;
mod material;
mod light;
mod camera;
mod scene;
mod image_buffer;
pub mod ingest;
pub mod settings;

pub use intersection::{Intersect, RayIntersection, RenderableId, SurfaceHit};
pub use sphere::Sphere;
pub use plane::Plane;
pub use triangle::{Triangle, TriangleHit};
pub use mesh::TriangleMesh;
pub use bvh::{Bvh, BvhNode, NodeContent, TraversalScratch, LEAF_SIZE, MAX_LEAF_SIZE};
pub use bvh_mesh::BvhTriangleMesh;
pub use renderable::{Renderable, Shape};
pub use material::{Color, ConstantMaterial, CookTorranceMaterial, Material, PhongMaterial, Shade};
pub use light::{Light, LightRig};
pub use camera::{Camera, CameraSettings};
pub use scene::{RenderStats, Scene, SceneError, TraceResult, DEFAULT_LIGHT_INTENSITY};
pub use image_buffer::ImageBuffer;
pub use ingest::{IngestError, MeshInput};
pub use settings::{ConfigError, RenderSettings};

/// Re-export the math types from glint_math
pub use glint_math::{BoundingBox, DMat4, DVec3, DVec4, Ray, Vec4, EPSILON};
