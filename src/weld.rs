//! Tolerance-based vertex welding, accelerated by the spatial octree.
//!
//! Welding groups spatially (and optionally attribute-) coincident vertices
//! into weld classes, rewrites face indices to the canonical "master" vertex
//! of each class, and drops triangles that degenerate as a result. All
//! coincidence tests are local to one octree leaf: vertices landing in
//! different leaves are never compared, which turns the worst-case global
//! O(n²) scan into a sum of much smaller per-leaf scans.

use crate::float_types::{Real, tolerance};
use crate::mesh::{Primitive, Vertex};
use crate::octree::{Octree, OctreeConfig, OctreeContent};
use hashbrown::HashMap;
use log::debug;
use nalgebra::Point3;

/// Octree limits used while welding. Cells split while they hold at least 50
/// vertices, never deeper than 10 levels, never smaller than 1.0 model units.
const WELD_MAX_DEPTH: u32 = 10;
const WELD_SPLIT_THRESHOLD: usize = 50;
const WELD_MIN_CELL_SIZE: Real = 1.0;

/// Which attributes participate in the weld decision, and how close two
/// positions must be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldOptions {
    /// Positional tolerance; two vertices at exactly this distance still weld.
    pub tolerance: Real,
    pub compare_uv: bool,
    pub compare_normal: bool,
    pub compare_color: bool,
    pub compare_batch_id: bool,
}

impl Default for WeldOptions {
    fn default() -> Self {
        WeldOptions {
            tolerance: tolerance(),
            compare_uv: false,
            compare_normal: false,
            compare_color: false,
            compare_batch_id: false,
        }
    }
}

impl WeldOptions {
    pub fn with_tolerance(tolerance: Real) -> Self {
        WeldOptions {
            tolerance,
            ..Default::default()
        }
    }
}

/// Octree content handle: a vertex index plus its position, so the tree never
/// borrows the primitive it indexes.
#[derive(Debug, Clone, Copy)]
struct WeldPoint {
    index: usize,
    pos: Point3<Real>,
}

impl OctreeContent for WeldPoint {
    fn representative_point(&self) -> Point3<Real> {
        self.pos
    }
}

/// Can `a` and `b` be merged under `options`?
///
/// Every enabled check must pass, or be inapplicable because the attribute is
/// missing on either side. The batch-id check is the exception: when enabled
/// it is authoritative, requiring exact equality of the two (optional) ids.
pub fn is_weldable(a: &Vertex, b: &Vertex, options: &WeldOptions) -> bool {
    if (a.pos - b.pos).norm() > options.tolerance {
        return false;
    }
    if options.compare_uv {
        if let (Some(ua), Some(ub)) = (a.uv, b.uv) {
            if (ua - ub).norm() > options.tolerance {
                return false;
            }
        }
    }
    if options.compare_normal {
        if let (Some(na), Some(nb)) = (a.normal, b.normal) {
            if 1.0 - na.dot(&nb) > options.tolerance {
                return false;
            }
        }
    }
    if options.compare_color {
        if let (Some(ca), Some(cb)) = (a.color, b.color) {
            for channel in 0..4 {
                let delta = (ca[channel] as i16 - cb[channel] as i16).abs() as Real;
                if delta > options.tolerance {
                    return false;
                }
            }
        }
    }
    if options.compare_batch_id {
        return a.batch_id == b.batch_id;
    }
    true
}

/// Weld a primitive in place.
///
/// A primitive with no vertices is a no-op, never an error. Triangles whose
/// corners collapse onto one another are dropped with a debug log; welding
/// itself never fails.
pub fn weld_primitive(primitive: &mut Primitive, options: &WeldOptions) {
    let Some(bounds) = primitive.bounding_box() else {
        debug!("weld: primitive has no vertices, skipping");
        return;
    };

    // Cube-shaped root cell, anchored at the min corner, so octree cells do
    // not skew along the primitive's longest axis.
    let mut tree: Octree<WeldPoint> = Octree::new(
        bounds.grow_to_cube(),
        OctreeConfig {
            max_depth: WELD_MAX_DEPTH,
            split_threshold: WELD_SPLIT_THRESHOLD,
            min_cell_size: WELD_MIN_CELL_SIZE,
        },
    );
    tree.add_contents(
        primitive
            .vertices
            .iter()
            .enumerate()
            .map(|(index, v)| WeldPoint { index, pos: v.pos }),
    );
    tree.build_by_min_content_count();

    // Pairwise candidate detection, leaf-local only. Each vertex maps to a
    // master: itself, or the first-encountered vertex of its weld group.
    let vertex_count = primitive.vertices.len();
    let mut master: Vec<usize> = (0..vertex_count).collect();
    let mut visited = vec![false; vertex_count];
    for node_id in tree.nodes_with_contents() {
        let contents = &tree.node(node_id).contents;
        for i in 0..contents.len() {
            let a = contents[i].index;
            if visited[a] {
                continue;
            }
            visited[a] = true;
            for j in (i + 1)..contents.len() {
                let b = contents[j].index;
                if visited[b] {
                    continue;
                }
                if is_weldable(&primitive.vertices[a], &primitive.vertices[b], options) {
                    master[b] = a;
                    visited[b] = true;
                }
            }
        }
    }

    // Distinct masters, in original vertex order, become the new vertex array.
    let mut master_to_new: HashMap<usize, usize> = HashMap::new();
    let mut new_vertices: Vec<Vertex> = Vec::new();
    for (i, vertex) in primitive.vertices.iter().enumerate() {
        if master[i] == i {
            master_to_new.insert(i, new_vertices.len());
            new_vertices.push(vertex.clone());
        }
    }

    // Rewrite face indices onto the master array; a triangle with a repeated
    // corner after rewriting is degenerate and dropped.
    let mut dropped_triangles = 0usize;
    for surface in &mut primitive.surfaces {
        surface.faces.retain_mut(|face| {
            let mut kept = Vec::with_capacity(face.indices.len());
            for tri in face.indices.chunks_exact(3) {
                let a = master_to_new[&master[tri[0]]];
                let b = master_to_new[&master[tri[1]]];
                let c = master_to_new[&master[tri[2]]];
                if a == b || b == c || a == c {
                    dropped_triangles += 1;
                    continue;
                }
                kept.extend_from_slice(&[a, b, c]);
            }
            face.indices = kept;
            !face.indices.is_empty()
        });
    }
    if dropped_triangles > 0 {
        debug!("weld: dropped {} triangle(s) degenerated by welding", dropped_triangles);
    }

    primitive.vertices = new_vertices;
    primitive.invalidate_bounding_box();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::{Face, Surface};
    use nalgebra::{Point2, Vector3};

    fn v(x: Real, y: Real, z: Real) -> Vertex {
        Vertex::new(Point3::new(x, y, z))
    }

    #[test]
    fn weldable_at_exact_tolerance_boundary() {
        let options = WeldOptions::with_tolerance(0.5);
        let a = v(0.0, 0.0, 0.0);
        // distance exactly 0.5: welds
        assert!(is_weldable(&a, &v(0.5, 0.0, 0.0), &options));
        // one ulp-ish beyond: does not
        assert!(!is_weldable(&a, &v(0.5 + 1e-12, 0.0, 0.0), &options));
    }

    #[test]
    fn missing_attributes_are_skipped() {
        let options = WeldOptions {
            compare_uv: true,
            compare_normal: true,
            ..WeldOptions::with_tolerance(1e-4)
        };
        let a = v(0.0, 0.0, 0.0).with_uv(Point2::new(0.0, 0.0));
        let b = v(0.0, 0.0, 0.0); // no uv, no normal
        assert!(is_weldable(&a, &b, &options), "absent attribute is inapplicable");

        let c = v(0.0, 0.0, 0.0).with_uv(Point2::new(0.5, 0.0));
        assert!(!is_weldable(&a, &c, &options), "present-but-distant uv blocks the weld");
    }

    #[test]
    fn normal_comparison_uses_one_minus_dot() {
        let options = WeldOptions {
            compare_normal: true,
            ..WeldOptions::with_tolerance(1e-4)
        };
        let a = v(0.0, 0.0, 0.0).with_normal(Vector3::z());
        let same = v(0.0, 0.0, 0.0).with_normal(Vector3::z());
        let tilted = v(0.0, 0.0, 0.0).with_normal(Vector3::new(0.0, 0.1, 0.9).normalize());
        assert!(is_weldable(&a, &same, &options));
        assert!(!is_weldable(&a, &tilted, &options));
    }

    #[test]
    fn batch_id_is_authoritative() {
        let options = WeldOptions {
            compare_batch_id: true,
            ..WeldOptions::with_tolerance(1e-4)
        };
        let a = v(0.0, 0.0, 0.0).with_batch_id(3.0);
        let same = v(0.0, 0.0, 0.0).with_batch_id(3.0);
        let other = v(0.0, 0.0, 0.0).with_batch_id(4.0);
        let none = v(0.0, 0.0, 0.0);
        assert!(is_weldable(&a, &same, &options));
        assert!(!is_weldable(&a, &other, &options));
        assert!(!is_weldable(&a, &none, &options), "missing vs present id never welds");
        assert!(is_weldable(&none, &v(0.0, 0.0, 0.0), &options));
    }

    #[test]
    fn color_comparison_is_per_channel() {
        let options = WeldOptions {
            compare_color: true,
            ..WeldOptions::with_tolerance(1e-4)
        };
        let a = v(0.0, 0.0, 0.0).with_color([10, 20, 30, 255]);
        let same = v(0.0, 0.0, 0.0).with_color([10, 20, 30, 255]);
        let off = v(0.0, 0.0, 0.0).with_color([10, 21, 30, 255]);
        assert!(is_weldable(&a, &same, &options));
        assert!(!is_weldable(&a, &off, &options));
    }

    #[test]
    fn welding_collapses_duplicates_and_rewrites_faces() {
        // two triangles sharing an edge, stored fully unwelded (6 vertices)
        let mut primitive = Primitive::new(
            vec![
                v(0.0, 0.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(0.0, 1.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(1.0, 1.0, 0.0),
                v(0.0, 1.0, 0.0),
            ],
            vec![Surface::new(vec![Face::triangle(0, 1, 2), Face::triangle(3, 4, 5)])],
        );
        weld_primitive(&mut primitive, &WeldOptions::with_tolerance(1e-6));

        assert_eq!(primitive.vertices.len(), 4, "shared edge vertices merged");
        assert_eq!(primitive.triangle_count(), 2);
        primitive.validate().expect("indices stay in bounds");
    }

    #[test]
    fn welding_drops_triangles_that_degenerate() {
        // a sliver: two corners within tolerance of each other
        let mut primitive = Primitive::new(
            vec![v(0.0, 0.0, 0.0), v(1e-7, 0.0, 0.0), v(1.0, 1.0, 0.0)],
            vec![Surface::new(vec![Face::triangle(0, 1, 2)])],
        );
        weld_primitive(&mut primitive, &WeldOptions::with_tolerance(1e-6));

        assert_eq!(primitive.triangle_count(), 0);
        assert!(primitive.surfaces[0].faces.is_empty(), "empty face removed outright");
    }

    #[test]
    fn welding_is_idempotent() {
        let mut primitive = Primitive::new(
            vec![
                v(0.0, 0.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(0.0, 1.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(1.0, 1.0, 0.0),
                v(0.0, 1.0, 0.0),
            ],
            vec![Surface::new(vec![Face::triangle(0, 1, 2), Face::triangle(3, 4, 5)])],
        );
        let options = WeldOptions::with_tolerance(1e-6);
        weld_primitive(&mut primitive, &options);
        let vertices_after_first = primitive.vertices.clone();
        let indices_after_first: Vec<Vec<usize>> = primitive
            .faces_iter()
            .map(|f| f.indices.clone())
            .collect();

        weld_primitive(&mut primitive, &options);
        assert_eq!(primitive.vertices, vertices_after_first);
        let indices_after_second: Vec<Vec<usize>> = primitive
            .faces_iter()
            .map(|f| f.indices.clone())
            .collect();
        assert_eq!(indices_after_second, indices_after_first);
    }

    #[test]
    fn empty_primitive_is_a_noop() {
        let mut primitive = Primitive::default();
        weld_primitive(&mut primitive, &WeldOptions::default());
        assert!(primitive.vertices.is_empty());
    }
}
