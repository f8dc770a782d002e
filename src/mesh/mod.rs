//! The indexed data model the preparation pipeline operates on: vertices with
//! optional attributes, faces holding triangle-index runs, surfaces,
//! primitives, and the small scene hierarchy used by the emptiness pass.

use crate::bounding::Aabb;
use crate::errors::MeshError;
use crate::float_types::Real;
use nalgebra::{Point2, Point3, Vector3};
use std::sync::OnceLock;

/// A vertex with position and optional per-vertex attributes.
///
/// Two vertices with numerically identical attributes are still distinct
/// entries in a primitive's vertex array until explicitly welded; faces refer
/// to vertices only by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub pos: Point3<Real>,
    pub normal: Option<Vector3<Real>>,
    pub uv: Option<Point2<Real>>,
    pub color: Option<[u8; 4]>,
    pub batch_id: Option<f32>,
}

impl Vertex {
    /// Create a new [`Vertex`] with no attributes.
    ///
    /// Non-finite position components are sanitised to `0.0` so a single bad
    /// import value cannot poison downstream distance tests.
    pub fn new(mut pos: Point3<Real>) -> Self {
        for c in pos.coords.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }
        Vertex {
            pos,
            normal: None,
            uv: None,
            color: None,
            batch_id: None,
        }
    }

    pub fn with_normal(mut self, normal: Vector3<Real>) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_uv(mut self, uv: Point2<Real>) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_batch_id(mut self, batch_id: f32) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Euclidean distance between vertex positions.
    #[inline]
    pub fn distance_to(&self, other: &Vertex) -> Real {
        (self.pos - other.pos).norm()
    }
}

/// An ordered run of vertex indices, grouped in threes: each consecutive
/// triple is one triangle. Faces belong to a [`Surface`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Face {
    pub indices: Vec<usize>,
    /// Feature id carried through from the importer, if any.
    pub id: Option<u64>,
    /// Classification id used downstream for flat-shaded colouring.
    pub classification: Option<u32>,
    /// Cached face normal, filled in by the normal calculator.
    pub normal: Option<Vector3<Real>>,
}

impl Face {
    pub fn new(indices: Vec<usize>) -> Self {
        Face {
            indices,
            ..Default::default()
        }
    }

    pub fn triangle(a: usize, b: usize, c: usize) -> Self {
        Self::new(vec![a, b, c])
    }

    /// Iterate over the triangle runs of this face.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Return an iterator over paired indices each forming an edge of the face.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.indices
            .iter()
            .zip(self.indices.iter().cycle().skip(1))
            .map(|(&a, &b)| (a, b))
    }
}

/// An ordered sequence of faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    pub faces: Vec<Face>,
}

impl Surface {
    pub fn new(faces: Vec<Face>) -> Self {
        Surface { faces }
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.indices.len() / 3).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// A vertex array plus the surfaces indexing into it.
///
/// Invariant: every index appearing in any face of any surface is a valid
/// offset into `vertices`; after cleanup, every vertex is referenced by at
/// least one face.
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub vertices: Vec<Vertex>,
    pub surfaces: Vec<Surface>,
    pub material: Option<usize>,

    /// Lazily calculated AABB that spans `vertices`.
    bounding_box: OnceLock<Aabb>,
}

impl Primitive {
    pub fn new(vertices: Vec<Vertex>, surfaces: Vec<Surface>) -> Self {
        Primitive {
            vertices,
            surfaces,
            material: None,
            bounding_box: OnceLock::new(),
        }
    }

    /// AABB spanning all vertices, or `None` for a primitive with no vertices.
    pub fn bounding_box(&self) -> Option<Aabb> {
        if self.vertices.is_empty() {
            return None;
        }
        Some(*self.bounding_box.get_or_init(|| {
            let positions: Vec<Point3<Real>> = self.vertices.iter().map(|v| v.pos).collect();
            Aabb::from_points(&positions).expect("vertices checked non-empty")
        }))
    }

    /// Invalidates the cached bounding box. Must be called after any mutation
    /// of vertex positions or the vertex array itself.
    pub fn invalidate_bounding_box(&mut self) {
        self.bounding_box = OnceLock::new();
    }

    /// Iterate over every face of every surface.
    pub fn faces_iter(&self) -> impl Iterator<Item = &Face> {
        self.surfaces.iter().flat_map(|s| s.faces.iter())
    }

    pub fn faces_iter_mut(&mut self) -> impl Iterator<Item = &mut Face> {
        self.surfaces.iter_mut().flat_map(|s| s.faces.iter_mut())
    }

    pub fn face_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.faces.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.triangle_count()).sum()
    }

    /// Check the contract boundary with upstream converters: every face has at
    /// least 3 indices, a multiple of 3, all within the vertex array.
    ///
    /// A failure here is an upstream invariant breach, not an expected runtime
    /// condition; the cleanup routines assume a valid primitive.
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.vertices.len();
        for (si, surface) in self.surfaces.iter().enumerate() {
            for (fi, face) in surface.faces.iter().enumerate() {
                let count = face.indices.len();
                if count < 3 {
                    return Err(MeshError::TooFewIndices {
                        surface: si,
                        face: fi,
                        count,
                    });
                }
                if count % 3 != 0 {
                    return Err(MeshError::RaggedFace {
                        surface: si,
                        face: fi,
                        count,
                    });
                }
                for &index in &face.indices {
                    if index >= vertex_count {
                        return Err(MeshError::IndexOutOfRange {
                            surface: si,
                            face: fi,
                            index,
                            vertex_count,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// An ordered sequence of primitives.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

impl Mesh {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Mesh { primitives }
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

/// A node in the scene hierarchy: meshes plus child nodes. Only the emptiness
/// pass cares about this shape; everything else works per primitive.
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    pub meshes: Vec<Mesh>,
    pub children: Vec<SceneNode>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vertex_sanitises_non_finite() {
        let v = Vertex::new(Point3::new(Real::NAN, 1.0, Real::INFINITY));
        assert_eq!(v.pos, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn face_triangle_runs() {
        let f = Face::new(vec![0, 1, 2, 0, 2, 3]);
        let runs: Vec<[usize; 3]> = f.triangles().collect();
        assert_eq!(runs, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn empty_primitive_has_no_bounding_box() {
        let p = Primitive::default();
        assert!(p.bounding_box().is_none());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let p = Primitive::new(
            vec![
                Vertex::new(Point3::origin()),
                Vertex::new(Point3::new(1.0, 0.0, 0.0)),
                Vertex::new(Point3::new(0.0, 1.0, 0.0)),
            ],
            vec![Surface::new(vec![Face::triangle(0, 1, 7)])],
        );
        assert!(matches!(
            p.validate(),
            Err(MeshError::IndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn validate_rejects_short_faces() {
        let p = Primitive::new(
            vec![Vertex::new(Point3::origin()); 3],
            vec![Surface::new(vec![Face::new(vec![0, 1])])],
        );
        assert!(matches!(p.validate(), Err(MeshError::TooFewIndices { .. })));
    }
}
