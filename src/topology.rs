//! Mesh topology cleanup: degenerate-face removal, unused-vertex compaction,
//! the inverse "unweld" operation, and the emptiness pass over the scene
//! hierarchy. Every pass here is idempotent.

use crate::mesh::{Mesh, Primitive, SceneNode, Vertex};
use log::debug;

/// Remove triangles with zero area: a repeated position, or three exactly
/// collinear positions (zero cross product of the two edge deltas).
///
/// A face that loses all its triangle runs is dropped entirely rather than
/// kept malformed.
pub fn remove_degenerate_faces(primitive: &mut Primitive) {
    let vertices = std::mem::take(&mut primitive.vertices);
    let mut dropped = 0usize;
    for surface in &mut primitive.surfaces {
        surface.faces.retain_mut(|face| {
            let mut kept = Vec::with_capacity(face.indices.len());
            for tri in face.indices.chunks_exact(3) {
                let p0 = vertices[tri[0]].pos;
                let p1 = vertices[tri[1]].pos;
                let p2 = vertices[tri[2]].pos;
                let repeated = p0 == p1 || p1 == p2 || p0 == p2;
                let collinear = (p1 - p0).cross(&(p2 - p1)).norm_squared() == 0.0;
                if repeated || collinear {
                    dropped += 1;
                    continue;
                }
                kept.extend_from_slice(tri);
            }
            face.indices = kept;
            !face.indices.is_empty()
        });
    }
    primitive.vertices = vertices;
    if dropped > 0 {
        debug!("cleanup: removed {} degenerate triangle(s)", dropped);
    }
}

/// Drop every vertex not referenced by any face, renumbering face indices
/// with a stable ascending old-to-new mapping so relative vertex order is
/// preserved.
pub fn compact_vertices(primitive: &mut Primitive) {
    let vertex_count = primitive.vertices.len();
    let mut used = vec![false; vertex_count];
    for face in primitive.faces_iter() {
        for &index in &face.indices {
            used[index] = true;
        }
    }

    // old index -> new index, ascending over used indices
    let mut remap = vec![usize::MAX; vertex_count];
    let mut next = 0usize;
    for (old, &is_used) in used.iter().enumerate() {
        if is_used {
            remap[old] = next;
            next += 1;
        }
    }
    if next == vertex_count {
        return; // nothing unreferenced
    }

    for face in primitive.faces_iter_mut() {
        for index in &mut face.indices {
            *index = remap[*index];
        }
    }

    let mut old_vertices = std::mem::take(&mut primitive.vertices);
    primitive.vertices = old_vertices
        .drain(..)
        .zip(used)
        .filter_map(|(vertex, is_used)| is_used.then_some(vertex))
        .collect();
    primitive.invalidate_bounding_box();
    debug!("cleanup: compacted {} unused vertex/vertices", vertex_count - next);
}

/// The inverse of welding: clone the referenced vertex for every face corner
/// so that no vertex is shared between corners afterwards.
///
/// Required before per-face flat-shaded attributes (distinct face colors,
/// classification-driven tinting) can be assigned without bleeding into
/// neighbouring faces.
pub fn unweld(primitive: &mut Primitive) {
    let mut new_vertices: Vec<Vertex> = Vec::new();
    for surface in &mut primitive.surfaces {
        for face in &mut surface.faces {
            for index in &mut face.indices {
                new_vertices.push(primitive.vertices[*index].clone());
                *index = new_vertices.len() - 1;
            }
        }
    }
    primitive.vertices = new_vertices;
    primitive.invalidate_bounding_box();
}

/// Propagate emptiness upward through the hierarchy: faceless surfaces leave
/// their primitive, surfaceless primitives leave their mesh, and the return
/// value says whether `node` itself is empty (no non-empty meshes and no
/// non-empty children).
pub fn prune_empty(node: &mut SceneNode) -> bool {
    for mesh in &mut node.meshes {
        prune_empty_mesh(mesh);
    }
    node.meshes.retain(|m| !m.is_empty());

    node.children.retain_mut(|child| !prune_empty(child));

    node.meshes.is_empty() && node.children.is_empty()
}

fn prune_empty_mesh(mesh: &mut Mesh) {
    for primitive in &mut mesh.primitives {
        primitive.surfaces.retain(|s| !s.is_empty());
    }
    mesh.primitives.retain(|p| !p.surfaces.is_empty());
}
