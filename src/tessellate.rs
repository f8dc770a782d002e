//! Triangulation of arbitrary simple 3D polygons, with optional interior
//! holes, into index triangles over the original point sequence.
//!
//! The pipeline is: robust polygon-normal estimation, projection onto the
//! least-distorting coordinate plane, ring cleaning, then either a plain
//! triangle fan (convex) or recursive splitting at concave vertices until
//! every piece is convex. Holes are eliminated first by bridging each one
//! into the exterior ring, closest hole first.
//!
//! Degenerate inputs degrade instead of failing: an unresolvable hole is
//! ignored, a concave region with no valid split emits no triangles for that
//! branch, and zero-length vectors or zero-area cross products are skipped
//! rather than propagated as NaN.

use crate::float_types::Real;
use log::warn;
use nalgebra::{Point2, Point3, Vector2, Vector3};

/// Two consecutive edge directions whose |dot| reaches this are collinear and
/// the shared point is removed during ring cleaning.
const COLLINEAR_DOT: Real = 1.0 - 1e-10;

/// A ring whose total turning angle magnitude falls below this is treated as
/// degenerate/self-intersecting: it gets no concave vertices, which
/// terminates the split recursion with a plain fan.
const DEGENERATE_TURNING: Real = 1e-4;

/// Absolute epsilon for 2D orientation and coincidence tests.
const EPS_2D: Real = 1e-10;

/// A projected 2D point carrying the index of the 3D point it came from.
/// The index is the identity handle used to map triangles back to the input.
#[derive(Debug, Clone, Copy)]
struct TessPoint {
    pos: Point2<Real>,
    source: usize,
}

type Ring = Vec<TessPoint>;

/// The coordinate plane a polygon is flattened onto: always the plane whose
/// normal is *least* aligned with the polygon normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionPlane {
    /// Dominant |nx|: drop x, keep (y, z).
    Yz,
    /// Dominant |ny|: drop y, keep (x, z).
    Xz,
    /// Dominant |nz|: drop z, keep (x, y).
    Xy,
}

/// Pick the projection plane that minimises distortion by dropping the axis
/// most aligned with `normal`.
pub fn best_projection_plane(normal: &Vector3<Real>) -> ProjectionPlane {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    if ax >= ay && ax >= az {
        ProjectionPlane::Yz
    } else if ay >= az {
        ProjectionPlane::Xz
    } else {
        ProjectionPlane::Xy
    }
}

fn project(plane: ProjectionPlane, p: &Point3<Real>) -> Point2<Real> {
    match plane {
        ProjectionPlane::Yz => Point2::new(p.y, p.z),
        ProjectionPlane::Xz => Point2::new(p.x, p.z),
        ProjectionPlane::Xy => Point2::new(p.x, p.y),
    }
}

/// A robust polygon normal for a closed 3D ring.
///
/// First tries the fast method: the first non-degenerate consecutive cross
/// product along the ring, normalized. That estimate is cross-checked against
/// the angle-weighted normal (per-vertex `cross(e_in, e_out)` scaled by the
/// turning angle, summed); when the fast normal is missing or disagrees in
/// sign, the weighted normal wins.
pub fn polygon_normal(points: &[Point3<Real>]) -> Option<Vector3<Real>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut fast = None;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let cross = (b - a).cross(&(c - b));
        let norm = cross.norm();
        if norm.is_finite() && norm > EPS_2D {
            fast = Some(cross / norm);
            break;
        }
    }

    let mut weighted = Vector3::zeros();
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let e_in = cur - prev;
        let e_out = next - cur;
        let (len_in, len_out) = (e_in.norm(), e_out.norm());
        if len_in <= EPS_2D || len_out <= EPS_2D {
            continue;
        }
        let cross = e_in.cross(&e_out);
        let cross_norm = cross.norm();
        if cross_norm <= EPS_2D {
            continue;
        }
        let sin = (cross_norm / (len_in * len_out)).clamp(-1.0, 1.0);
        let cos = (e_in.dot(&e_out) / (len_in * len_out)).clamp(-1.0, 1.0);
        let angle = sin.atan2(cos);
        weighted += (cross / cross_norm) * angle;
    }
    let weighted = (weighted.norm() > EPS_2D).then(|| weighted.normalize());

    match (fast, weighted) {
        (Some(f), Some(w)) => {
            if f.dot(&w) < 0.0 {
                Some(w)
            } else {
                Some(f)
            }
        },
        (Some(f), None) => Some(f),
        (None, Some(w)) => Some(w),
        (None, None) => None,
    }
}

/// Triangulate one simple (non-self-intersecting) 3D polygon.
///
/// Returns triangles as indices into `points`. A simple n-gon yields exactly
/// `n − 2` triangles; degenerate input yields an empty list.
pub fn tessellate(points: &[Point3<Real>]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }
    let Some(normal) = polygon_normal(points) else {
        warn!("tessellate: polygon has no usable normal, skipping");
        return Vec::new();
    };
    let plane = best_projection_plane(&normal);
    let ring = clean_ring(project_ring(points, plane, 0));
    if ring.len() < 3 {
        return Vec::new();
    }
    triangulate_ring(&ring)
}

/// Triangulate an exterior polygon with interior holes.
///
/// Triangle indices refer to the concatenated point sequence: exterior points
/// first, then each hole's points in the given order. Holes that cannot be
/// bridged into the exterior are ignored (with a warning) rather than failing
/// the whole polygon.
pub fn tessellate_with_holes(exterior: &[Point3<Real>], holes: &[Vec<Point3<Real>>]) -> Vec<[usize; 3]> {
    if holes.is_empty() {
        return tessellate(exterior);
    }
    if exterior.len() < 3 {
        return Vec::new();
    }
    let Some(normal) = polygon_normal(exterior) else {
        warn!("tessellate: exterior has no usable normal, skipping");
        return Vec::new();
    };
    let plane = best_projection_plane(&normal);

    let outer = clean_ring(project_ring(exterior, plane, 0));
    if outer.len() < 3 {
        return Vec::new();
    }
    let outer_sign = turning_total(&outer).signum();

    // Project each hole; source handles continue the exterior numbering in
    // input order, counting dropped points so handles stay stable.
    let mut offset = exterior.len();
    let mut hole_rings: Vec<Ring> = Vec::with_capacity(holes.len());
    for hole in holes {
        let mut ring = clean_ring(project_ring(hole, plane, offset));
        offset += hole.len();
        if ring.len() < 3 {
            continue;
        }
        // A hole wound like the exterior can never splice in while keeping
        // the exterior's orientation sign; flip it up front.
        if turning_total(&ring).signum() == outer_sign {
            ring.reverse();
        }
        hole_rings.push(ring);
    }

    // Closest hole first: sort by squared distance of each hole's extreme
    // point from the exterior's extreme point, so nested holes are absorbed
    // in a stable, deterministic order.
    let outer_extreme = ring_extreme_point(&outer);
    hole_rings.sort_by(|a, b| {
        let da = (ring_extreme_point(a) - outer_extreme).norm_squared();
        let db = (ring_extreme_point(b) - outer_extreme).norm_squared();
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged = outer;
    for hole in &hole_rings {
        match bridge_hole(&merged, hole, outer_sign) {
            Some(combined) => merged = combined,
            None => warn!("tessellate: no valid bridge for hole, leaving it unmerged"),
        }
    }

    triangulate_ring(&merged)
}

fn project_ring(points: &[Point3<Real>], plane: ProjectionPlane, first_source: usize) -> Ring {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| TessPoint {
            pos: project(plane, p),
            source: first_source + i,
        })
        .collect()
}

/// The most lower-left point of a ring (lexicographic: smallest x, then y).
fn ring_extreme_point(ring: &Ring) -> Point2<Real> {
    let mut best = ring[0].pos;
    for p in &ring[1..] {
        if p.pos.x < best.x || (p.pos.x == best.x && p.pos.y < best.y) {
            best = p.pos;
        }
    }
    best
}

/// Remove the explicit closing duplicate, consecutive duplicates, and
/// near-collinear middles, iterating until stable.
fn clean_ring(mut ring: Ring) -> Ring {
    // uroboros: the ring bites its own tail
    while ring.len() > 1 && coincident(&ring[0].pos, &ring[ring.len() - 1].pos) {
        ring.pop();
    }
    loop {
        let before = ring.len();
        remove_consecutive_duplicates(&mut ring);
        remove_collinear_points(&mut ring);
        if ring.len() == before || ring.len() < 3 {
            return ring;
        }
    }
}

#[inline]
fn coincident(a: &Point2<Real>, b: &Point2<Real>) -> bool {
    (a - b).norm_squared() <= EPS_2D * EPS_2D
}

fn remove_consecutive_duplicates(ring: &mut Ring) {
    let mut i = 0;
    while ring.len() > 1 && i < ring.len() {
        let next = (i + 1) % ring.len();
        if coincident(&ring[i].pos, &ring[next].pos) {
            ring.remove(next);
        } else {
            i += 1;
        }
    }
}

fn remove_collinear_points(ring: &mut Ring) {
    let mut i = 0;
    while ring.len() >= 3 && i < ring.len() {
        let n = ring.len();
        let prev = ring[(i + n - 1) % n].pos;
        let cur = ring[i].pos;
        let next = ring[(i + 1) % n].pos;
        let e_in = cur - prev;
        let e_out = next - cur;
        let (len_in, len_out) = (e_in.norm(), e_out.norm());
        if len_in > EPS_2D && len_out > EPS_2D {
            let dot = e_in.dot(&e_out) / (len_in * len_out);
            if dot.abs() >= COLLINEAR_DOT {
                ring.remove(i);
                continue;
            }
        }
        i += 1;
    }
}

/// Signed 2D cross product of the edges meeting at `i`.
fn corner_cross(ring: &Ring, i: usize) -> Real {
    let n = ring.len();
    let e_in = ring[i].pos - ring[(i + n - 1) % n].pos;
    let e_out = ring[(i + 1) % n].pos - ring[i].pos;
    e_in.perp(&e_out)
}

/// Total signed turning angle around the ring. Its sign is the ring's
/// orientation; a magnitude near zero marks a degenerate ring.
fn turning_total(ring: &Ring) -> Real {
    let n = ring.len();
    let mut total = 0.0;
    for i in 0..n {
        let e_in = ring[i].pos - ring[(i + n - 1) % n].pos;
        let e_out = ring[(i + 1) % n].pos - ring[i].pos;
        let (len_in, len_out) = (e_in.norm(), e_out.norm());
        if len_in <= EPS_2D || len_out <= EPS_2D {
            continue;
        }
        total += e_in.perp(&e_out).atan2(e_in.dot(&e_out));
    }
    total
}

/// Indices of concave vertices: corners whose turn disagrees with the ring's
/// overall orientation. A degenerate ring reports none.
fn concave_vertices(ring: &Ring) -> Vec<usize> {
    let total = turning_total(ring);
    if total.abs() < DEGENERATE_TURNING {
        return Vec::new();
    }
    let sign = total.signum();
    (0..ring.len())
        .filter(|&i| {
            let cross = corner_cross(ring, i);
            cross.abs() > EPS_2D && cross.signum() != sign
        })
        .collect()
}

/// The standard fan (0, i−1, i): valid whenever the ring is convex.
fn fan(ring: &Ring) -> Vec<[usize; 3]> {
    (2..ring.len())
        .map(|i| [ring[0].source, ring[i - 1].source, ring[i].source])
        .collect()
}

fn triangulate_ring(ring: &Ring) -> Vec<[usize; 3]> {
    if ring.len() < 3 {
        return Vec::new();
    }
    let concave = concave_vertices(ring);
    if concave.is_empty() {
        return fan(ring);
    }

    let parent_sign = turning_total(ring).signum();
    for &c in &concave {
        if let Some((first, second)) = split_at(ring, c, parent_sign) {
            let mut triangles = triangulate_ring(&first);
            triangles.extend(triangulate_ring(&second));
            return triangles;
        }
    }

    warn!("tessellate: concave ring with no valid split, emitting nothing for this branch");
    Vec::new()
}

/// Search for a split partner for the concave vertex `c`, nearest first, and
/// cut the ring in two along the first segment that neither crosses the
/// boundary nor flips either half's orientation (a flipped half would be a
/// self-intersecting "butterfly").
fn split_at(ring: &Ring, c: usize, parent_sign: Real) -> Option<(Ring, Ring)> {
    let n = ring.len();
    let mut candidates: Vec<usize> = (0..n).filter(|&d| d != c).collect();
    candidates.sort_by(|&a, &b| {
        let da = (ring[a].pos - ring[c].pos).norm_squared();
        let db = (ring[b].pos - ring[c].pos).norm_squared();
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    for d in candidates {
        // edge-adjacent partners reproduce an existing edge, not a split
        if d == (c + 1) % n || (d + 1) % n == c {
            continue;
        }
        if (ring[d].pos - ring[c].pos).norm() <= EPS_2D {
            continue;
        }
        if segment_blocked(ring, c, d) {
            continue;
        }

        let (lo, hi) = if c < d { (c, d) } else { (d, c) };
        let first: Ring = ring[lo..=hi].to_vec();
        let second: Ring = ring[hi..].iter().chain(ring[..=lo].iter()).copied().collect();
        if first.len() < 3 || second.len() < 3 {
            continue;
        }

        let t1 = turning_total(&first);
        let t2 = turning_total(&second);
        if t1.abs() < DEGENERATE_TURNING || t2.abs() < DEGENERATE_TURNING {
            continue;
        }
        if t1.signum() != parent_sign || t2.signum() != parent_sign {
            continue;
        }
        return Some((first, second));
    }
    None
}

/// Does the segment between ring vertices `c` and `d` hit any ring edge not
/// incident to either endpoint?
fn segment_blocked(ring: &Ring, c: usize, d: usize) -> bool {
    let n = ring.len();
    let p1 = ring[c].pos;
    let p2 = ring[d].pos;
    for a in 0..n {
        let b = (a + 1) % n;
        if a == c || a == d || b == c || b == d {
            continue;
        }
        if segments_cross(&p1, &p2, &ring[a].pos, &ring[b].pos) {
            return true;
        }
    }
    false
}

/// Segment/segment test between a candidate segment `p1p2` and a boundary
/// edge `q1q2`. Proper crossings count; so does an endpoint resting on the
/// other segment's interior. Touches at `p1`/`p2` themselves are exempt so
/// that rings containing duplicated bridge points still admit valid splits.
fn segments_cross(
    p1: &Point2<Real>,
    p2: &Point2<Real>,
    q1: &Point2<Real>,
    q2: &Point2<Real>,
) -> bool {
    let d1 = orient2d(q1, q2, p1);
    let d2 = orient2d(q1, q2, p2);
    let d3 = orient2d(p1, p2, q1);
    let d4 = orient2d(p1, p2, q2);

    if ((d1 > EPS_2D && d2 < -EPS_2D) || (d1 < -EPS_2D && d2 > EPS_2D))
        && ((d3 > EPS_2D && d4 < -EPS_2D) || (d3 < -EPS_2D && d4 > EPS_2D))
    {
        return true;
    }

    for q in [q1, q2] {
        if orient2d(p1, p2, q).abs() <= EPS_2D
            && within_bounds(p1, p2, q)
            && !coincident(q, p1)
            && !coincident(q, p2)
        {
            return true;
        }
    }
    for p in [p1, p2] {
        if orient2d(q1, q2, p).abs() <= EPS_2D
            && within_bounds(q1, q2, p)
            && !coincident(p, q1)
            && !coincident(p, q2)
        {
            return true;
        }
    }
    false
}

#[inline]
fn orient2d(a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>) -> Real {
    let ab: Vector2<Real> = b - a;
    let ac: Vector2<Real> = c - a;
    ab.perp(&ac)
}

#[inline]
fn within_bounds(a: &Point2<Real>, b: &Point2<Real>, p: &Point2<Real>) -> bool {
    p.x >= a.x.min(b.x) - EPS_2D
        && p.x <= a.x.max(b.x) + EPS_2D
        && p.y >= a.y.min(b.y) - EPS_2D
        && p.y <= a.y.max(b.y) + EPS_2D
}

/// Splice `hole` into `outer` along the first valid bridge.
///
/// Exterior candidates are tried in order of distance to the hole's extreme
/// point; for each, the bridge runs to the hole vertex nearest that
/// candidate. A bridge is accepted only if it crosses neither boundary and
/// the spliced ring keeps the exterior's orientation sign.
fn bridge_hole(outer: &Ring, hole: &Ring, outer_sign: Real) -> Option<Ring> {
    let hole_extreme = hole_extreme_index(hole);
    let anchor = hole[hole_extreme].pos;

    let mut exterior_candidates: Vec<usize> = (0..outer.len()).collect();
    exterior_candidates.sort_by(|&a, &b| {
        let da = (outer[a].pos - anchor).norm_squared();
        let db = (outer[b].pos - anchor).norm_squared();
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    for e in exterior_candidates {
        // the hole vertex nearest this exterior candidate
        let mut h = 0;
        let mut best = Real::MAX;
        for (i, hp) in hole.iter().enumerate() {
            let d = (hp.pos - outer[e].pos).norm_squared();
            if d < best {
                best = d;
                h = i;
            }
        }
        if best <= EPS_2D * EPS_2D {
            continue;
        }
        if bridge_blocked(outer, e, hole, h) {
            continue;
        }

        let spliced = splice(outer, e, hole, h);
        let total = turning_total(&spliced);
        if total.abs() >= DEGENERATE_TURNING && total.signum() == outer_sign {
            return Some(spliced);
        }
    }
    None
}

fn hole_extreme_index(ring: &Ring) -> usize {
    let mut best = 0;
    for i in 1..ring.len() {
        let (p, q) = (ring[i].pos, ring[best].pos);
        if p.x < q.x || (p.x == q.x && p.y < q.y) {
            best = i;
        }
    }
    best
}

/// Does the bridge from `outer[e]` to `hole[h]` hit either boundary?
fn bridge_blocked(outer: &Ring, e: usize, hole: &Ring, h: usize) -> bool {
    let p1 = outer[e].pos;
    let p2 = hole[h].pos;

    let n = outer.len();
    for a in 0..n {
        let b = (a + 1) % n;
        if a == e || b == e {
            continue;
        }
        if segments_cross(&p1, &p2, &outer[a].pos, &outer[b].pos) {
            return true;
        }
    }
    let m = hole.len();
    for a in 0..m {
        let b = (a + 1) % m;
        if a == h || b == h {
            continue;
        }
        if segments_cross(&p1, &p2, &hole[a].pos, &hole[b].pos) {
            return true;
        }
    }
    false
}

/// Walk the exterior from the bridge point all the way around back to itself,
/// then the hole ring fully around back to itself. The closure from the final
/// hole point back to the first exterior point is the return bridge.
fn splice(outer: &Ring, e: usize, hole: &Ring, h: usize) -> Ring {
    let n = outer.len();
    let m = hole.len();
    let mut out = Vec::with_capacity(n + m + 2);
    for k in 0..=n {
        out.push(outer[(e + k) % n]);
    }
    for k in 0..=m {
        out.push(hole[(h + k) % m]);
    }
    out
}
