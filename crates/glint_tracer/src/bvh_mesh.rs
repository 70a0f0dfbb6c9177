//! Triangle mesh accelerated by a BVH.

use crate::bvh::{Bvh, TraversalScratch};
use crate::intersection::{Intersect, SurfaceHit};
use crate::mesh::TriangleMesh;
use crate::triangle::TriangleHit;
use glint_math::{BoundingBox, Ray};
use std::cell::RefCell;

thread_local! {
    /// Traversal buffers for the current worker thread.
    static SCRATCH: RefCell<TraversalScratch> = RefCell::new(TraversalScratch::new());
}

/// A triangle mesh that only tests the triangles its BVH reports.
///
/// The tree is built by [`Intersect::initialize`]; before that the mesh
/// behaves like an empty one.
#[derive(Debug, Clone, Default)]
pub struct BvhTriangleMesh {
    mesh: TriangleMesh,
    bvh: Option<Bvh>,
}

impl BvhTriangleMesh {
    pub fn new(mesh: TriangleMesh) -> Self {
        Self { mesh, bvh: None }
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Mutable access to the mesh data. Drops any built tree.
    pub fn mesh_mut(&mut self) -> &mut TriangleMesh {
        self.bvh = None;
        &mut self.mesh
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.bvh.is_some()
    }

    /// Run `f` over the candidate triangles for `ray`.
    fn with_candidates<R>(&self, ray: &Ray, max_lambda: f64, f: impl FnOnce(&[u32]) -> R) -> Option<R> {
        let bvh = self.bvh.as_ref()?;
        Some(SCRATCH.with(|scratch| {
            let mut scratch = scratch.borrow_mut();
            f(bvh.collect_candidates(ray, max_lambda, &mut scratch))
        }))
    }
}

impl From<TriangleMesh> for BvhTriangleMesh {
    fn from(mesh: TriangleMesh) -> Self {
        Self::new(mesh)
    }
}

impl Intersect for BvhTriangleMesh {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        let closest = self.with_candidates(ray, max_lambda, |candidates| {
            let mut closest: Option<(usize, TriangleHit)> = None;
            let mut closest_lambda = max_lambda;
            for &tri in candidates {
                if let Some(hit) = self.mesh.intersect_triangle(tri as usize, ray, closest_lambda) {
                    closest_lambda = hit.lambda;
                    closest = Some((tri as usize, hit));
                }
            }
            closest
        })??;

        Some(self.mesh.surface_hit(closest.0, &closest.1))
    }

    fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        self.with_candidates(ray, max_lambda, |candidates| {
            candidates
                .iter()
                .any(|&tri| self.mesh.intersect_triangle(tri as usize, ray, max_lambda).is_some())
        })
        .unwrap_or(false)
    }

    fn initialize(&mut self) {
        self.bvh = Some(Bvh::build(
            self.mesh.vertex_positions(),
            self.mesh.triangle_indices(),
        ));
    }

    fn bounding_box(&self) -> BoundingBox {
        self.mesh.bounding_box()
    }
}
