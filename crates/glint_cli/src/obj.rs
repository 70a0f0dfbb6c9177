//! OBJ loading via tobj.

use anyhow::{Context, Result};
use glint_tracer::ingest::{AttributeBuffer, IndexBuffer, MeshInput};
use glint_tracer::DVec3;
use std::path::Path;

/// Load every model of an OBJ file as a mesh input.
///
/// Models without normals get smooth normals averaged from their faces.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Vec<MeshInput>> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("Failed to load OBJ file {}", path.display()))?;

    if models.is_empty() {
        anyhow::bail!("No models found in OBJ file {}", path.display());
    }

    Ok(models
        .iter()
        .map(|model| {
            let mesh = &model.mesh;
            log::info!(
                "Loaded model '{}': {} vertices, {} triangles, normals: {}",
                model.name,
                mesh.positions.len() / 3,
                mesh.indices.len() / 3,
                !mesh.normals.is_empty()
            );

            let positions: Vec<f64> = mesh.positions.iter().map(|&v| v as f64).collect();
            let normals = if mesh.normals.is_empty() {
                smooth_normals(&positions, &mesh.indices)
            } else {
                mesh.normals.iter().map(|&v| v as f64).collect()
            };

            MeshInput {
                positions: Some(AttributeBuffer::new(3, positions)),
                normals: Some(AttributeBuffer::new(3, normals)),
                index_buffers: vec![IndexBuffer::triangles(mesh.indices.clone())],
                ..Default::default()
            }
        })
        .collect())
}

/// Per-vertex normals accumulated from the faces around each vertex.
fn smooth_normals(positions: &[f64], indices: &[u32]) -> Vec<f64> {
    let vertex_count = positions.len() / 3;
    let vertex = |i: usize| DVec3::from_slice(&positions[i * 3..i * 3 + 3]);
    let mut normals = vec![DVec3::ZERO; vertex_count];

    for face in indices.chunks_exact(3) {
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }
        let face_normal = (vertex(i1) - vertex(i0)).cross(vertex(i2) - vertex(i0));
        // Area weighted
        for i in [i0, i1, i2] {
            normals[i] += face_normal;
        }
    }

    normals
        .into_iter()
        .flat_map(|n| n.normalize_or_zero().to_array())
        .collect()
}
