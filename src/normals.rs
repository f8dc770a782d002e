//! Face and vertex normal computation over cleaned topology.
//!
//! Face normals come straight from the triangle winding; vertex normals are
//! the normalized unweighted sum of the normals of every incident triangle,
//! gathered through a vertex-to-incident-faces map over the whole primitive.

use crate::float_types::Real;
use crate::mesh::Primitive;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

/// Normal of one triangle: `normalize(cross(p2 − p1, p3 − p2))`.
///
/// A zero-area or otherwise non-finite result is substituted with
/// `normalize(1,1,1)` so NaN never propagates downstream.
pub fn face_normal(p1: &Point3<Real>, p2: &Point3<Real>, p3: &Point3<Real>) -> Vector3<Real> {
    let cross = (p2 - p1).cross(&(p3 - p2));
    let norm = cross.norm();
    if norm > 0.0 && norm.is_finite() {
        let n = cross / norm;
        if n.iter().all(|c| c.is_finite()) {
            return n;
        }
    }
    Vector3::new(1.0, 1.0, 1.0).normalize()
}

/// Cache a normal on every face, taken from its first triangle run.
pub fn compute_face_normals(primitive: &mut Primitive) {
    let vertices = std::mem::take(&mut primitive.vertices);
    for face in primitive.faces_iter_mut() {
        if let Some(tri) = face.indices.chunks_exact(3).next() {
            face.normal = Some(face_normal(
                &vertices[tri[0]].pos,
                &vertices[tri[1]].pos,
                &vertices[tri[2]].pos,
            ));
        }
    }
    primitive.vertices = vertices;
}

/// Accumulate each vertex's incident triangle normals and normalize the sum.
/// A vertex touched by no face keeps its normal unset.
pub fn compute_vertex_normals(primitive: &mut Primitive) {
    let mut accumulated: HashMap<usize, Vector3<Real>> = HashMap::new();
    for surface in &primitive.surfaces {
        for face in &surface.faces {
            for tri in face.indices.chunks_exact(3) {
                let n = face_normal(
                    &primitive.vertices[tri[0]].pos,
                    &primitive.vertices[tri[1]].pos,
                    &primitive.vertices[tri[2]].pos,
                );
                for &corner in tri {
                    *accumulated.entry(corner).or_insert_with(Vector3::zeros) += n;
                }
            }
        }
    }

    for (index, sum) in accumulated {
        let norm = sum.norm();
        let normal = if norm > 0.0 && norm.is_finite() {
            sum / norm
        } else {
            Vector3::new(1.0, 1.0, 1.0).normalize()
        };
        primitive.vertices[index].normal = Some(normal);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::{Face, Surface, Vertex};
    use approx::assert_relative_eq;

    fn v(x: Real, y: Real, z: Real) -> Vertex {
        Vertex::new(Point3::new(x, y, z))
    }

    #[test]
    fn ccw_triangle_in_xy_plane_points_up() {
        let n = face_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_fall_back_instead_of_nan() {
        let n = face_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
        );
        assert_relative_eq!(n, Vector3::new(1.0, 1.0, 1.0).normalize(), epsilon = 1e-12);
        assert!(n.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn vertex_normals_average_incident_faces() {
        // two triangles forming a right-angle "tent" over the shared edge x-axis
        let mut p = Primitive::new(
            vec![
                v(0.0, 0.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(0.0, 1.0, 0.0), // flat triangle, normal +z
                v(0.0, 0.0, 1.0), // wall triangle, normal -y
            ],
            vec![Surface::new(vec![
                Face::triangle(0, 1, 2),
                Face::triangle(0, 1, 3),
            ])],
        );
        compute_vertex_normals(&mut p);

        // shared vertices get the normalized sum of (0,0,1) and (0,-1,0)
        let expected = Vector3::new(0.0, -1.0, 1.0).normalize();
        assert_relative_eq!(p.vertices[0].normal.unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(p.vertices[1].normal.unwrap(), expected, epsilon = 1e-12);
        // unshared vertices carry their single face normal
        assert_relative_eq!(p.vertices[2].normal.unwrap(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(
            p.vertices[3].normal.unwrap(),
            -Vector3::y(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn untouched_vertex_keeps_no_normal() {
        let mut p = Primitive::new(
            vec![
                v(0.0, 0.0, 0.0),
                v(1.0, 0.0, 0.0),
                v(0.0, 1.0, 0.0),
                v(9.0, 9.0, 9.0), // referenced by nothing
            ],
            vec![Surface::new(vec![Face::triangle(0, 1, 2)])],
        );
        compute_vertex_normals(&mut p);
        assert!(p.vertices[3].normal.is_none());
    }

    #[test]
    fn face_normals_are_cached_on_faces() {
        let mut p = Primitive::new(
            vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0)],
            vec![Surface::new(vec![Face::triangle(0, 1, 2)])],
        );
        compute_face_normals(&mut p);
        let cached = p.surfaces[0].faces[0].normal.expect("normal cached");
        assert_relative_eq!(cached, Vector3::z(), epsilon = 1e-12);
    }
}
