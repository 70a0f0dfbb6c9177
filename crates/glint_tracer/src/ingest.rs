//! Bringing host meshes and lights into a scene.
//!
//! Hosts hand over meshes as attribute buffers plus index buffers with a
//! draw type, the way a GPU would receive them. Only triangle geometry is
//! traced; points and lines are ignored.

use crate::bvh_mesh::BvhTriangleMesh;
use crate::light::{Light, LightRig};
use crate::material::Material;
use crate::mesh::TriangleMesh;
use crate::renderable::Renderable;
use crate::scene::Scene;
use glint_math::{safe_normalize, DMat4, DMat4Ext, DVec3};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while converting a mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("mesh has no position buffer")]
    MissingPositions,

    #[error("positions must have 3 components, got {0}")]
    PositionComponents(usize),

    #[error("mesh has no normal buffer")]
    MissingNormals,

    #[error("normals must have 3 components, got {0}")]
    NormalComponents(usize),

    #[error("{positions} positions but {normals} normals")]
    VertexNormalMismatch { positions: usize, normals: usize },

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestError>;

/// Flat per-vertex attribute data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBuffer {
    /// Values per vertex
    pub components: usize,
    pub data: Vec<f64>,
}

impl AttributeBuffer {
    pub fn new(components: usize, data: Vec<f64>) -> Self {
        Self { components, data }
    }

    /// A 3-component buffer from vectors.
    pub fn from_vec3s(values: &[DVec3]) -> Self {
        Self::new(3, values.iter().flat_map(|v| v.to_array()).collect())
    }

    /// Number of complete vertices in the buffer.
    pub fn len(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.data.len() / self.components
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn vec3s(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.data.chunks_exact(3).map(DVec3::from_slice)
    }
}

/// Primitive kind of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawType {
    Points,
    Lines,
    Triangles,
}

/// How consecutive indices form primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Every three indices form a triangle
    #[default]
    None,
    /// Each index after the second forms a triangle with the two before it
    Strip,
    /// Each index after the second forms a triangle with the first and previous
    Fan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexBuffer {
    pub draw_type: DrawType,
    pub connectivity: Connectivity,
    pub indices: Vec<u32>,
}

impl IndexBuffer {
    pub fn triangles(indices: Vec<u32>) -> Self {
        Self {
            draw_type: DrawType::Triangles,
            connectivity: Connectivity::None,
            indices,
        }
    }

    /// Call `f` for every triangle the buffer describes.
    ///
    /// Strips alternate winding so that all triangles face the same way.
    pub fn for_each_triangle(&self, mut f: impl FnMut(u32, u32, u32)) {
        if self.draw_type != DrawType::Triangles {
            return;
        }
        let ib = &self.indices;
        match self.connectivity {
            Connectivity::None => {
                for tri in ib.chunks_exact(3) {
                    f(tri[0], tri[1], tri[2]);
                }
            }
            Connectivity::Strip => {
                for i in 0..ib.len().saturating_sub(2) {
                    if i % 2 == 0 {
                        f(ib[i], ib[i + 1], ib[i + 2]);
                    } else {
                        f(ib[i + 1], ib[i], ib[i + 2]);
                    }
                }
            }
            Connectivity::Fan => {
                for i in 1..ib.len().saturating_sub(1) {
                    f(ib[0], ib[i], ib[i + 1]);
                }
            }
        }
    }
}

/// A mesh as supplied by a host application.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInput {
    pub positions: Option<AttributeBuffer>,
    pub normals: Option<AttributeBuffer>,
    /// Model to world transform
    pub world_matrix: DMat4,
    pub index_buffers: Vec<IndexBuffer>,
}

impl Default for MeshInput {
    fn default() -> Self {
        Self {
            positions: None,
            normals: None,
            world_matrix: DMat4::IDENTITY,
            index_buffers: Vec::new(),
        }
    }
}

/// Convert a host mesh into a world-space BVH mesh.
///
/// The BVH itself is built later, when the scene is prepared.
pub fn build_bvh_mesh(input: &MeshInput) -> IngestResult<BvhTriangleMesh> {
    let positions = input.positions.as_ref().ok_or(IngestError::MissingPositions)?;
    if positions.components != 3 {
        return Err(IngestError::PositionComponents(positions.components));
    }
    let normals = input.normals.as_ref().ok_or(IngestError::MissingNormals)?;
    if normals.components != 3 {
        return Err(IngestError::NormalComponents(normals.components));
    }
    let vertex_count = positions.len();
    if normals.len() != vertex_count {
        return Err(IngestError::VertexNormalMismatch {
            positions: vertex_count,
            normals: normals.len(),
        });
    }

    let normal_matrix = input.world_matrix.normal_matrix();
    let mut mesh = TriangleMesh::new();
    mesh.reserve_vertices(vertex_count);
    for (p, n) in positions.vec3s().zip(normals.vec3s()) {
        mesh.add_vertex(
            input.world_matrix.transform_point_homogeneous(p),
            safe_normalize(normal_matrix * n),
        );
    }

    for ib in &input.index_buffers {
        mesh.reserve_triangles(ib.indices.len() / 3);
        let mut out_of_range = None;
        ib.for_each_triangle(|i0, i1, i2| {
            if let Some(&bad) = [i0, i1, i2].iter().find(|&&i| i as usize >= vertex_count) {
                out_of_range.get_or_insert(bad);
            } else {
                mesh.add_triangle(i0, i1, i2);
            }
        });
        if let Some(index) = out_of_range {
            return Err(IngestError::IndexOutOfRange { index, vertex_count });
        }
    }

    debug!(
        "Ingested mesh with {} vertices and {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(BvhTriangleMesh::new(mesh))
}

/// Add every convertible mesh to `scene`, sharing `material`.
///
/// Meshes that fail to convert are skipped with a warning. Returns the number
/// of meshes added.
pub fn add_meshes(scene: &mut Scene, inputs: &[MeshInput], material: Arc<Material>) -> usize {
    let mut added = 0;
    for (index, input) in inputs.iter().enumerate() {
        match build_bvh_mesh(input) {
            Ok(mesh) => {
                scene.add_renderable(Renderable::new(mesh, material.clone()));
                added += 1;
            }
            Err(e) => warn!("Skipping mesh {index}: {e}"),
        }
    }
    added
}

/// Kind of a host light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSourceKind {
    Point,
    Directional,
    Spot,
    Area,
}

/// A light as supplied by a host application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub kind: LightSourceKind,
    pub position: DVec3,
    /// Color intensity on a 0..100 scale
    pub intensity: DVec3,
}

/// Convert host lights into tracer lights.
///
/// Only point lights are supported; other kinds are skipped with a warning.
/// When nothing usable remains, the three lights of `rig` are used instead.
pub fn lights_from_sources(sources: &[LightSource], rig: &LightRig) -> Vec<Light> {
    let lights: Vec<Light> = sources
        .iter()
        .filter_map(|source| {
            if source.kind != LightSourceKind::Point {
                warn!("Only point lights are supported, ignoring {:?} light", source.kind);
                return None;
            }
            let diffuse = source.intensity / 100.0;
            Some(Light::new(source.position, diffuse * 0.2, diffuse, diffuse * 0.4))
        })
        .collect();

    if lights.is_empty() {
        debug!("No usable input lights, using the default rig");
        return rig.lights();
    }
    lights
}
