//! Re-triangulation of non-convex polygons.
//!
//! Region merging can produce polygons that are no longer convex.
//! [`retriangulate_non_convex`] restores triangulated form for those facets:
//! each facet is projected into a local 2D frame, tested for convexity, and,
//! only if non-convex, split into triangles by a dynamic program over
//! polygon sub-chains.
//!
//! The cost of a candidate triangle is its largest interior angle, which
//! biases the optimum toward well-shaped triangles; a reflex corner or a
//! polygon vertex strictly inside the candidate disqualifies it via the
//! [`COST_REJECT`] sentinel. The search is O(n^4) in the vertex count, which
//! is acceptable because merged polygons are small (bounded by local mesh
//! connectivity).
//!
//! Failure is recoverable: a facet that cannot be triangulated is kept
//! untriangulated and a warning is logged.

use nalgebra::{Point2, Vector2, Vector3};
use tracing::warn;

use crate::cell::{CellMesh, FacetId, VertexId};
use crate::error::{ExtractError, Result};
use crate::predicates::Sign;

/// Sentinel cost disqualifying a candidate triangle.
pub const COST_REJECT: f64 = 1024.0;

#[inline]
fn det2(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// A vector orthogonal to `z`, built from its smallest component.
fn perpendicular(z: &Vector3<f64>) -> Vector3<f64> {
    let ax = z.x.abs();
    let ay = z.y.abs();
    let az = z.z.abs();
    let axis = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };
    z.cross(&axis)
}

/// Project a facet into the 2D frame spanned by its normal, with the origin
/// at its centroid. Returns the 2D polygon and the facet's vertex ids in loop
/// order.
pub fn facet_polygon2d(mesh: &CellMesh, f: FacetId) -> (Vec<Point2<f64>>, Vec<VertexId>) {
    let z = mesh
        .facet_normal(f)
        .try_normalize(f64::MIN_POSITIVE)
        .unwrap_or_else(Vector3::z);
    let x = perpendicular(&z)
        .try_normalize(f64::MIN_POSITIVE)
        .unwrap_or_else(Vector3::x);
    let y = z.cross(&x);
    let center = mesh.facet_centroid(f);

    let ids = mesh.facet(f).vertices.clone();
    let pts = ids
        .iter()
        .map(|&v| {
            let w = mesh.position(v) - center;
            Point2::new(w.dot(&x), w.dot(&y))
        })
        .collect();
    (pts, ids)
}

/// Test whether a 2D polygon is convex (consistent turn sign at every
/// vertex; collinear vertices are tolerated).
pub fn polygon_is_convex(pts: &[Point2<f64>]) -> bool {
    let n = pts.len();
    let mut s = Sign::Zero;
    for i in 0..n {
        let j = (i + 1) % n;
        let k = (j + 1) % n;
        let cur = Sign::from_f64(det2(pts[j] - pts[i], pts[k] - pts[j]));
        if i32::from(cur.to_i8()) * i32::from(s.to_i8()) == -1 {
            return false;
        }
        if s == Sign::Zero {
            s = cur;
        }
    }
    true
}

/// Score the triangle `(a, b, c)` of a closed CCW polygon.
///
/// Returns [`COST_REJECT`] if any corner of the triangle is a right turn
/// (reflex) or if another polygon vertex lies strictly inside it; otherwise
/// the triangle's largest interior angle (lower is better).
fn triangle_cost(pts: &[Point2<f64>], a: usize, b: usize, c: usize) -> f64 {
    let t = [pts[a], pts[b], pts[c]];
    let mut m: f64 = 0.0;
    for v in 0..3 {
        let e1 = t[(v + 1) % 3] - t[v];
        let e2 = t[(v + 2) % 3] - t[(v + 1) % 3];
        // Signed exterior angle: negative for right (reflex) turns.
        let angle = det2(e1, e2).atan2(e1.dot(&e2));
        if angle <= 0.0 {
            return COST_REJECT;
        }
        m = m.max(std::f64::consts::PI - angle);
    }

    for (other, p) in pts.iter().enumerate() {
        if other == a || other == b || other == c {
            continue;
        }
        let inside = (0..3).all(|l| det2(t[(l + 1) % 3] - t[l], p - t[l]) > 0.0);
        if inside {
            return COST_REJECT;
        }
    }
    m
}

/// Triangulate a (possibly non-convex) closed 2D polygon.
///
/// Dynamic program over sub-chains `[i..j]`: splitting at interior vertex
/// `k` costs `cost(i, k) + cost(k, j) + triangle_cost(i, k, j)`. Triangles
/// are returned as index triples into `pts`, root interval first.
///
/// # Errors
///
/// - [`ExtractError::PolygonTooSmall`] for fewer than 3 vertices.
/// - [`ExtractError::TriangulationFailed`] if the optimal cost reaches the
///   [`COST_REJECT`] sentinel (no valid triangulation exists, e.g. for a
///   clockwise or self-intersecting polygon).
pub fn triangulate_polygon(pts: &[Point2<f64>]) -> Result<Vec<[usize; 3]>> {
    let n = pts.len();
    if n < 3 {
        return Err(ExtractError::PolygonTooSmall { vertices: n });
    }
    if n == 3 {
        return Ok(vec![[0, 1, 2]]);
    }

    // cost[i * n + j] is the optimal cost for the sub-chain [i..j];
    // split[i * n + j] == k means the chain is covered by triangle (i, k, j).
    // Filled along diagonals; entries below the main diagonal stay unused.
    let mut cost = vec![0.0f64; n * n];
    let mut split = vec![usize::MAX; n * n];

    for size in 2..n {
        for i in 0..(n - size) {
            let j = i + size;
            let mut min_cost = f64::INFINITY;
            let mut min_k = usize::MAX;
            for k in (i + 1)..j {
                let val = cost[i * n + k] + cost[k * n + j] + triangle_cost(pts, i, k, j);
                if val < min_cost {
                    min_cost = val;
                    min_k = k;
                }
            }
            cost[i * n + j] = min_cost;
            split[i * n + j] = min_k;
        }
    }

    if cost[n - 1] >= COST_REJECT {
        return Err(ExtractError::TriangulationFailed { vertices: n });
    }

    // Replay the split table from the root interval outward.
    let mut triangles = Vec::with_capacity(n - 2);
    let mut queue = vec![n - 1]; // 0 * n + (n - 1)
    let mut t = 0;
    while t < queue.len() {
        let idx = queue[t];
        t += 1;
        let i = idx / n;
        let j = idx % n;
        let k = split[idx];
        debug_assert!(k != usize::MAX);
        triangles.push([i, k, j]);
        if k + 2 <= j {
            queue.push(k * n + j);
        }
        if i + 2 <= k {
            queue.push(i * n + k);
        }
    }
    Ok(triangles)
}

/// Replace every non-convex facet of the mesh by triangles.
///
/// Convex facets are untouched. Triangles inherit the facet's region and tet
/// attributes. Facets that cannot be triangulated are kept as-is with a
/// warning.
pub fn retriangulate_non_convex(mesh: &mut CellMesh) {
    let nf = mesh.num_facets();
    let mut to_delete: Vec<bool> = Vec::new();

    for f in 0..nf {
        let fid = FacetId::new(f);
        let (pts, ids) = facet_polygon2d(mesh, fid);
        if polygon_is_convex(&pts) {
            continue;
        }
        match triangulate_polygon(&pts) {
            Ok(triangles) => {
                if to_delete.is_empty() {
                    to_delete = vec![false; nf];
                }
                to_delete[f] = true;
                let region = mesh.facet(fid).region;
                let tet = mesh.facet(fid).tet;
                for tri in triangles {
                    mesh.add_facet(
                        vec![ids[tri[0]], ids[tri[1]], ids[tri[2]]],
                        region,
                        tet,
                    );
                }
            }
            Err(err) => {
                warn!("could not triangulate non-convex facet: {}", err);
            }
        }
    }

    if !to_delete.is_empty() {
        to_delete.resize(mesh.num_facets(), false);
        mesh.delete_facets(&to_delete);
    }
}
