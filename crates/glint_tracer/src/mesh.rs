//! Indexed triangle mesh, intersected by brute force.

use crate::intersection::{Intersect, SurfaceHit};
use crate::triangle::{intersect_triangle, TriangleHit};
use glint_math::{safe_normalize, BoundingBox, DVec3, Ray};

/// A mesh of shared vertices and index triples.
///
/// Vertex normals and texture coordinates are optional, but when present
/// there is exactly one per vertex.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    positions: Vec<DVec3>,
    normals: Vec<DVec3>,
    uvws: Vec<DVec3>,
    indices: Vec<[u32; 3]>,
    bbox: BoundingBox,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from flat vertex data. `normals` may be empty.
    pub fn from_parts(positions: Vec<DVec3>, normals: Vec<DVec3>, indices: Vec<[u32; 3]>) -> Self {
        let bbox = BoundingBox::from_points(positions.iter().copied());
        Self {
            positions,
            normals,
            uvws: Vec::new(),
            indices,
            bbox,
        }
    }

    /// Add a vertex with its normal, returning its index.
    ///
    /// Once any vertex carries texture coordinates, vertices added here get zero.
    pub fn add_vertex(&mut self, position: DVec3, normal: DVec3) -> u32 {
        if !self.uvws.is_empty() {
            self.uvws.push(DVec3::ZERO);
        }
        self.push_vertex(position, normal)
    }

    /// Add a vertex with a normal and texture coordinates, returning its index.
    ///
    /// Earlier vertices without texture coordinates get zero.
    pub fn add_vertex_with_uvw(&mut self, position: DVec3, normal: DVec3, uvw: DVec3) -> u32 {
        self.uvws.resize(self.positions.len(), DVec3::ZERO);
        self.uvws.push(uvw);
        self.push_vertex(position, normal)
    }

    fn push_vertex(&mut self, position: DVec3, normal: DVec3) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        self.bbox.expand_by_point(position);
        (self.positions.len() - 1) as u32
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push([i0, i1, i2]);
    }

    pub fn reserve_vertices(&mut self, additional: usize) {
        self.positions.reserve(additional);
        self.normals.reserve(additional);
    }

    pub fn reserve_triangles(&mut self, additional: usize) {
        self.indices.reserve(additional);
    }

    pub fn vertex_positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn vertex_normals(&self) -> &[DVec3] {
        &self.normals
    }

    pub fn vertex_uvws(&self) -> &[DVec3] {
        &self.uvws
    }

    pub fn triangle_indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Corner positions of triangle `tri`.
    #[inline]
    pub fn triangle_vertices(&self, tri: usize) -> [DVec3; 3] {
        let [i0, i1, i2] = self.indices[tri];
        [
            self.positions[i0 as usize],
            self.positions[i1 as usize],
            self.positions[i2 as usize],
        ]
    }

    /// Exact ray test against a single triangle of the mesh.
    #[inline]
    pub fn intersect_triangle(&self, tri: usize, ray: &Ray, max_lambda: f64) -> Option<TriangleHit> {
        let [p0, p1, p2] = self.triangle_vertices(tri);
        intersect_triangle(p0, p1, p2, ray, max_lambda)
    }

    /// Turn the winning triangle hit into a surface hit.
    ///
    /// The normal is the vertex normal interpolated with the barycentric
    /// weights, or the face normal when the mesh has no vertex normals.
    pub fn surface_hit(&self, tri: usize, hit: &TriangleHit) -> SurfaceHit {
        let [i0, i1, i2] = self.indices[tri].map(|i| i as usize);
        let b = hit.barycentric;

        let normal = if self.normals.len() == self.positions.len() {
            safe_normalize(self.normals[i0] * b.x + self.normals[i1] * b.y + self.normals[i2] * b.z)
        } else {
            let [p0, p1, p2] = self.triangle_vertices(tri);
            safe_normalize((p1 - p0).cross(p2 - p0))
        };

        let uvw = if self.uvws.len() == self.positions.len() {
            self.uvws[i0] * b.x + self.uvws[i1] * b.y + self.uvws[i2] * b.z
        } else {
            DVec3::ZERO
        };

        SurfaceHit::new(hit.lambda, normal, uvw)
    }
}

impl Intersect for TriangleMesh {
    fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<SurfaceHit> {
        let mut closest: Option<(usize, TriangleHit)> = None;
        let mut closest_lambda = max_lambda;

        for tri in 0..self.indices.len() {
            if let Some(hit) = self.intersect_triangle(tri, ray, closest_lambda) {
                closest_lambda = hit.lambda;
                closest = Some((tri, hit));
            }
        }

        closest.map(|(tri, hit)| self.surface_hit(tri, &hit))
    }

    fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        (0..self.indices.len()).any(|tri| self.intersect_triangle(tri, ray, max_lambda).is_some())
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/// Two triangles forming the square `[-1, 1]^2` at height `z`, normals +Z.
#[cfg(test)]
pub(crate) fn test_quad(z: f64) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    let a = mesh.add_vertex(DVec3::new(-1.0, -1.0, z), DVec3::Z);
    let b = mesh.add_vertex(DVec3::new(1.0, -1.0, z), DVec3::Z);
    let c = mesh.add_vertex(DVec3::new(1.0, 1.0, z), DVec3::Z);
    let d = mesh.add_vertex(DVec3::new(-1.0, 1.0, z), DVec3::Z);
    mesh.add_triangle(a, b, c);
    mesh.add_triangle(a, c, d);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_closest_of_two_layers() {
        let mut mesh = test_quad(0.0);
        let upper = test_quad(1.0);
        let offset = mesh.vertex_count() as u32;
        for (p, n) in upper.vertex_positions().iter().zip(upper.vertex_normals()) {
            mesh.add_vertex(*p, *n);
        }
        for [i0, i1, i2] in upper.triangle_indices() {
            mesh.add_triangle(i0 + offset, i1 + offset, i2 + offset);
        }

        let ray = Ray::new(DVec3::new(0.1, 0.2, 5.0), -DVec3::Z);
        let hit = mesh.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.lambda - 4.0).abs() < 1e-12);
        assert!(mesh.any_intersection(&ray, 4.5));
        assert!(!mesh.any_intersection(&ray, 3.5));
    }

    #[test]
    fn test_interpolated_normal() {
        let mut mesh = TriangleMesh::new();
        let a = mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0), DVec3::X);
        let b = mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0), DVec3::Y);
        let c = mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0), DVec3::Z);
        mesh.add_triangle(a, b, c);

        // At the first vertex the normal is that vertex's normal
        let ray = Ray::new(DVec3::new(1e-6, 1e-6, 1.0), -DVec3::Z);
        let hit = mesh.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.normal - DVec3::X).length() < 1e-3);

        // At the centroid it is the normalized average
        let ray = Ray::new(DVec3::new(1.0 / 3.0, 1.0 / 3.0, 1.0), -DVec3::Z);
        let hit = mesh.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.normal - DVec3::ONE.normalize()).length() < 1e-9);
    }

    #[test]
    fn test_uvw_with_mixed_vertices() {
        let mut mesh = TriangleMesh::new();
        let a = mesh.add_vertex(DVec3::ZERO, DVec3::Z);
        let b = mesh.add_vertex_with_uvw(DVec3::X, DVec3::Z, DVec3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(DVec3::Y, DVec3::Z);
        let d = mesh.add_vertex_with_uvw(DVec3::new(1.0, 1.0, 0.0), DVec3::Z, DVec3::new(1.0, 1.0, 0.0));
        mesh.add_triangle(a, b, c);
        mesh.add_triangle(b, d, c);

        assert_eq!(mesh.vertex_uvws().len(), mesh.vertex_count());
        assert_eq!(mesh.vertex_uvws()[0], DVec3::ZERO);
        assert_eq!(mesh.vertex_uvws()[2], DVec3::ZERO);

        // First triangle: only b has coordinates, weight 0.25 at this point
        let ray = Ray::new(DVec3::new(0.25, 0.5, 1.0), -DVec3::Z);
        let hit = mesh.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.uvw - DVec3::new(0.25, 0.0, 0.0)).length() < 1e-12);

        // Second triangle at d
        let ray = Ray::new(DVec3::new(1.0 - 1e-9, 1.0 - 1e-9, 1.0), -DVec3::Z);
        let hit = mesh.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.uvw - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_uvw_absent_when_never_given() {
        let mut mesh = TriangleMesh::new();
        for p in [DVec3::ZERO, DVec3::X, DVec3::Y] {
            mesh.add_vertex(p, DVec3::Z);
        }
        assert!(mesh.vertex_uvws().is_empty());
    }

    #[test]
    fn test_face_normal_without_vertex_normals() {
        let mesh = TriangleMesh::from_parts(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            Vec::new(),
            vec![[0, 1, 2]],
        );
        let ray = Ray::new(DVec3::new(0.2, 0.2, 1.0), -DVec3::Z);
        let hit = mesh.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert!((hit.normal - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = TriangleMesh::new();
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        assert!(mesh.closest_intersection(&ray, f64::INFINITY).is_none());
        assert!(mesh.bounding_box().is_empty());
    }
}
