//! Tessellating polygon footprints into primitives, the way extrusion and
//! GIS-surface builders feed the preparation pipeline.

use meshprep::float_types::Real;
use meshprep::prepare::prepare_primitive;
use meshprep::tessellate::{tessellate, tessellate_with_holes};
use meshprep::{Face, Primitive, Surface, Vertex, WeldOptions};
use nalgebra::Point3;

fn ring_z0(coords: &[(Real, Real)]) -> Vec<Point3<Real>> {
    coords.iter().map(|&(x, y)| Point3::new(x, y, 0.0)).collect()
}

fn primitive_from_triangles(points: &[Point3<Real>], triangles: &[[usize; 3]]) -> Primitive {
    let vertices = points.iter().map(|p| Vertex::new(*p)).collect();
    let faces = triangles
        .iter()
        .map(|t| Face::triangle(t[0], t[1], t[2]))
        .collect();
    Primitive::new(vertices, vec![Surface::new(faces)])
}

#[test]
fn simple_polygon_emits_n_minus_2_triangles() {
    for n in 3..12 {
        let ring: Vec<Point3<Real>> = (0..n)
            .map(|i| {
                let angle = std::f64::consts::TAU as Real * i as Real / n as Real;
                Point3::new(angle.cos(), angle.sin(), 0.0)
            })
            .collect();
        let triangles = tessellate(&ring);
        assert_eq!(triangles.len(), n - 2, "{}-gon", n);
    }
}

#[test]
fn footprint_with_hole_flows_through_the_pipeline() {
    let exterior = ring_z0(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
    let hole = ring_z0(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
    let triangles = tessellate_with_holes(&exterior, &[hole.clone()]);

    let all_points: Vec<Point3<Real>> = exterior.iter().chain(hole.iter()).copied().collect();
    let mut primitive = primitive_from_triangles(&all_points, &triangles);
    prepare_primitive(&mut primitive, &WeldOptions::with_tolerance(1e-9));

    primitive.validate().expect("tessellated footprint is valid");
    assert_eq!(
        primitive.vertices.len(),
        8,
        "all exterior and hole points used, nothing else"
    );

    let area: Real = primitive
        .faces_iter()
        .flat_map(|f| f.triangles())
        .map(|t| {
            let a = primitive.vertices[t[0]].pos;
            let b = primitive.vertices[t[1]].pos;
            let c = primitive.vertices[t[2]].pos;
            (b - a).cross(&(c - a)).norm() * 0.5
        })
        .sum();
    assert!((area - 12.0).abs() < 1e-9, "exterior minus hole area");
}

#[test]
fn unresolvable_hole_degrades_to_exterior_only() {
    let exterior = ring_z0(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
    // a "hole" lying entirely outside the exterior: every bridge must cross
    // the exterior boundary, so it is left unmerged
    let stray = ring_z0(&[(10.0, 10.0), (11.0, 10.0), (11.0, 11.0), (10.0, 11.0)]);
    let triangles = tessellate_with_holes(&exterior, &[stray]);

    assert_eq!(triangles.len(), 2, "exterior tessellated as if there were no hole");
    assert!(triangles.iter().flatten().all(|&i| i < 4));
}

#[test]
fn degenerate_footprints_never_panic() {
    assert!(tessellate(&[]).is_empty());
    assert!(tessellate(&ring_z0(&[(0.0, 0.0)])).is_empty());
    assert!(tessellate(&ring_z0(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)])).is_empty());
    // needle polygon: all points on one line
    assert!(tessellate(&ring_z0(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)])).is_empty());
}
