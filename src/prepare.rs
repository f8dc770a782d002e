//! The cleanup pipeline: degenerate pass, weld, compaction, normals.
//!
//! Everything here is synchronous and in-memory; a primitive is owned
//! exclusively by whoever prepares it, and the octree built during welding is
//! private to that call. With the `parallel` feature, independent primitives
//! of a mesh are prepared concurrently on the rayon pool.

use crate::mesh::{Mesh, Primitive};
use crate::normals;
use crate::topology;
use crate::weld::{WeldOptions, weld_primitive};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run the full preparation pipeline on one primitive:
/// degenerate-face removal, octree-accelerated welding, unused-vertex
/// compaction, then face and vertex normals.
pub fn prepare_primitive(primitive: &mut Primitive, options: &WeldOptions) {
    topology::remove_degenerate_faces(primitive);
    weld_primitive(primitive, options);
    topology::compact_vertices(primitive);
    normals::compute_face_normals(primitive);
    normals::compute_vertex_normals(primitive);
}

/// Prepare every primitive of a mesh.
#[cfg(not(feature = "parallel"))]
pub fn prepare_mesh(mesh: &mut Mesh, options: &WeldOptions) {
    for primitive in &mut mesh.primitives {
        prepare_primitive(primitive, options);
    }
}

/// Prepare every primitive of a mesh, in parallel. Each worker owns one
/// primitive exclusively for the duration of the pipeline.
#[cfg(feature = "parallel")]
pub fn prepare_mesh(mesh: &mut Mesh, options: &WeldOptions) {
    mesh.primitives
        .par_iter_mut()
        .for_each(|primitive| prepare_primitive(primitive, options));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::float_types::Real;
    use crate::mesh::{Face, Surface, Vertex};
    use nalgebra::Point3;

    fn v(x: Real, y: Real, z: Real) -> Vertex {
        Vertex::new(Point3::new(x, y, z))
    }

    #[test]
    fn pipeline_leaves_a_clean_primitive() {
        // a quad plus a sliver of unreferenced and degenerate leftovers
        let mut primitive = Primitive::new(
            vec![
                v(0.0, 0.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(0.0, 1.0, 0.0),
                v(1.0, 0.0, 0.0), // duplicate of 1
                v(1.0, 1.0, 0.0),
                v(0.0, 1.0, 0.0), // duplicate of 2
                v(5.0, 5.0, 5.0), // referenced only by the degenerate face
                v(6.0, 6.0, 6.0),
                v(7.0, 7.0, 7.0),
            ],
            vec![Surface::new(vec![
                Face::triangle(0, 1, 2),
                Face::triangle(3, 4, 5),
                Face::triangle(6, 7, 8), // collinear
            ])],
        );
        prepare_primitive(&mut primitive, &WeldOptions::with_tolerance(1e-6));

        assert_eq!(primitive.vertices.len(), 4);
        assert_eq!(primitive.triangle_count(), 2);
        primitive.validate().expect("pipeline output is valid");
        assert!(
            primitive.vertices.iter().all(|vx| vx.normal.is_some()),
            "every surviving vertex got a normal"
        );
    }
}
