//! Validation errors

use std::fmt::Display;

/// All the possible contract violations we might encounter when a primitive
/// arrives from an upstream converter.
///
/// Cleanup, welding, and tessellation never return these: they handle
/// degeneracies locally (see the crate docs). These only surface from the
/// explicit [`validate`](crate::mesh::Primitive::validate) entry point, and a
/// failure indicates an upstream invariant breach rather than an expected
/// runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    /// (IndexOutOfRange) A face references a vertex index beyond the primitive's vertex array
    IndexOutOfRange {
        surface: usize,
        face: usize,
        index: usize,
        vertex_count: usize,
    },
    /// (TooFewIndices) A face carries fewer than 3 indices
    TooFewIndices { surface: usize, face: usize, count: usize },
    /// (RaggedFace) A face's index count is not a multiple of 3
    RaggedFace { surface: usize, face: usize, count: usize },
}

impl Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::IndexOutOfRange {
                surface,
                face,
                index,
                vertex_count,
            } => write!(
                f,
                "(IndexOutOfRange) surface {} face {} references vertex {} (vertex count = {})",
                surface, face, index, vertex_count
            ),
            MeshError::TooFewIndices { surface, face, count } => write!(
                f,
                "(TooFewIndices) surface {} face {} has {} indices, need at least 3",
                surface, face, count
            ),
            MeshError::RaggedFace { surface, face, count } => write!(
                f,
                "(RaggedFace) surface {} face {} has {} indices, not a multiple of 3",
                surface, face, count
            ),
        }
    }
}
