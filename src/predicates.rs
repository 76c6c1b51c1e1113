//! Power-distance side predicates and the exact vertex classifier.
//!
//! Given a diagram vertex `q`, described symbolically by the constraints that
//! define it, and two weighted sites, [`classify`] decides which site's power
//! distance to `q` is smaller. The decision dispatches on the number of
//! input-surface facets bounding `q` (0 to 3) to one of four side-predicate
//! forms, mirroring how the vertex is geometrically determined:
//!
//! | boundary facets | vertex lies on | predicate |
//! |---|---|---|
//! | 0 | 3 bisectors (cell interior) | [`power_side4_3d`](PowerPredicates::power_side4_3d) |
//! | 1 | 1 surface facet + 2 bisectors | [`power_side3`](PowerPredicates::power_side3) |
//! | 2 | 1 surface edge + 1 bisector | [`power_side2`](PowerPredicates::power_side2) |
//! | 3 | 1 surface vertex | [`power_side1`](PowerPredicates::power_side1) |
//!
//! The predicate evaluators are collaborator services behind the
//! [`PowerPredicates`] trait; a robust implementation resolves degeneracies by
//! symbolic perturbation and never lets floating round-off flip a sign.
//! [`FloatPredicates`] is a plain-`f64` implementation suitable for
//! well-separated configurations and tests; it is *not* an exact evaluator.
//!
//! [`classify`] guarantees antisymmetry (`classify(q, a, b) ==
//! -classify(q, b, a)`) independently of the evaluator by canonically
//! orienting every predicate call on the site pair.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::{ExtractError, Result};
use crate::kernel::{SiteSet, TetSet};
use crate::sym::SymbolicVertex;

/// Sign of an exact geometric quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Strictly negative.
    Negative,
    /// Exactly zero.
    Zero,
    /// Strictly positive.
    Positive,
}

impl Sign {
    /// Sign of a floating-point value.
    pub fn from_f64(v: f64) -> Self {
        if v > 0.0 {
            Sign::Positive
        } else if v < 0.0 {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }

    /// Convert to -1, 0 or 1.
    pub fn to_i8(self) -> i8 {
        match self {
            Sign::Negative => -1,
            Sign::Zero => 0,
            Sign::Positive => 1,
        }
    }
}

impl std::ops::Neg for Sign {
    type Output = Sign;

    fn neg(self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Zero => Sign::Zero,
            Sign::Positive => Sign::Negative,
        }
    }
}

/// A site position together with its power-diagram weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    /// Site position.
    pub point: Point3<f64>,
    /// Site weight.
    pub weight: f64,
}

impl WeightedPoint {
    /// Create a weighted point.
    pub fn new(point: Point3<f64>, weight: f64) -> Self {
        Self { point, weight }
    }

    /// Power distance from this site to `x` (squared distance minus weight).
    pub fn power_distance(&self, x: &Point3<f64>) -> f64 {
        (x - self.point).norm_squared() - self.weight
    }
}

/// The four side-predicate primitives consumed by [`classify`].
///
/// Every method decides, for a diagram vertex defined by the listed
/// constraints, whether the vertex's power distance to `pi` is smaller than
/// its power distance to `pj`: `Positive` means the vertex favors `pi`,
/// `Negative` means it favors `pj`. A conforming robust implementation is
/// total: degenerate configurations are resolved deterministically (symbolic
/// perturbation) instead of returning `Zero`.
pub trait PowerPredicates {
    /// Side of the input-surface vertex `q` relative to the bisector of
    /// `pi` and `pj`.
    fn power_side1(&self, pi: &WeightedPoint, pj: &WeightedPoint, q: &Point3<f64>) -> Sign;

    /// Side of the vertex defined by the surface edge `[e0, e1]` and the
    /// bisector of `pi` and `b0`, relative to the bisector of `pi` and `pj`.
    fn power_side2(
        &self,
        pi: &WeightedPoint,
        b0: &WeightedPoint,
        pj: &WeightedPoint,
        e0: &Point3<f64>,
        e1: &Point3<f64>,
    ) -> Sign;

    /// Side of the vertex defined by the surface facet `(q0, q1, q2)` and the
    /// bisectors of `pi` with `b0` and `b1`, relative to the bisector of `pi`
    /// and `pj`.
    #[allow(clippy::too_many_arguments)]
    fn power_side3(
        &self,
        pi: &WeightedPoint,
        b0: &WeightedPoint,
        b1: &WeightedPoint,
        pj: &WeightedPoint,
        q0: &Point3<f64>,
        q1: &Point3<f64>,
        q2: &Point3<f64>,
    ) -> Sign;

    /// Side of the vertex defined by the bisectors of `pi` with `b0`, `b1`
    /// and `b2`, relative to the bisector of `pi` and `pj`. Ambient dimension
    /// 3 only (intrinsic dimension equals ambient dimension, so no embedding
    /// tetrahedron is needed).
    fn power_side4_3d(
        &self,
        pi: &WeightedPoint,
        b0: &WeightedPoint,
        b1: &WeightedPoint,
        b2: &WeightedPoint,
        pj: &WeightedPoint,
    ) -> Sign;
}

/// Classify a symbolic vertex against two weighted sites.
///
/// Returns `Positive` if `q`'s power distance to `site_i` is smaller than to
/// `site_j`, `Negative` for the converse. The call is canonically oriented on
/// `(site_i, site_j)` before reaching the evaluator, so
/// `classify(q, a, b) == -classify(q, b, a)` holds for any evaluator and
/// repeated calls with identical inputs return identical signs.
///
/// # Errors
///
/// - [`ExtractError::UnsupportedDimension`] if `q` lies in the cell interior
///   (0 boundary facets) and `ambient_dim != 3`. This configuration has no
///   fallback; callers must treat it as fatal.
/// - [`ExtractError::MalformedSymbolicVertex`] if `q`'s constraint counts are
///   inconsistent, or its boundary facets do not resolve to a surface edge or
///   vertex of the input mesh.
pub fn classify<P, T, S>(
    pred: &P,
    tets: &T,
    sites: &S,
    q: &SymbolicVertex,
    site_i: u32,
    site_j: u32,
    ambient_dim: usize,
) -> Result<Sign>
where
    P: PowerPredicates,
    T: TetSet,
    S: SiteSet,
{
    let (a, b, flipped) = if site_i <= site_j {
        (site_i, site_j, false)
    } else {
        (site_j, site_i, true)
    };
    let pi = weighted(sites, a);
    let pj = weighted(sites, b);

    let sign = match q.nb_boundary_facets() {
        0 => {
            // q is the intersection of three bisectors.
            if ambient_dim != 3 {
                return Err(ExtractError::UnsupportedDimension { dim: ambient_dim });
            }
            expect_bisectors(q, 3)?;
            let b0 = weighted(sites, q.bisector(0));
            let b1 = weighted(sites, q.bisector(1));
            let b2 = weighted(sites, q.bisector(2));
            pred.power_side4_3d(&pi, &b0, &b1, &b2, &pj)
        }
        1 => {
            // q is the intersection of one surface facet and two bisectors.
            expect_bisectors(q, 2)?;
            let b0 = weighted(sites, q.bisector(0));
            let b1 = weighted(sites, q.bisector(1));
            let [j0, j1, j2] = tets.facet_vertices(q.boundary_facet(0));
            pred.power_side3(
                &pi,
                &b0,
                &b1,
                &pj,
                &tets.vertex_point(j0),
                &tets.vertex_point(j1),
                &tets.vertex_point(j2),
            )
        }
        2 => {
            // q is the intersection of a surface edge (two facets) and one
            // bisector.
            expect_bisectors(q, 1)?;
            let b0 = weighted(sites, q.bisector(0));
            let (e0, e1) = boundary_edge(tets, q)?;
            pred.power_side2(
                &pi,
                &b0,
                &pj,
                &tets.vertex_point(e0),
                &tets.vertex_point(e1),
            )
        }
        3 => {
            // q coincides with a surface vertex (three facets).
            let v0 = boundary_vertex(tets, q)?;
            pred.power_side1(&pi, &pj, &tets.vertex_point(v0))
        }
        n => {
            return Err(ExtractError::MalformedSymbolicVertex {
                details: format!("{} boundary facets", n),
            })
        }
    };

    Ok(if flipped { -sign } else { sign })
}

fn weighted<S: SiteSet>(sites: &S, s: u32) -> WeightedPoint {
    WeightedPoint::new(sites.point(s), sites.weight(s))
}

fn expect_bisectors(q: &SymbolicVertex, n: usize) -> Result<()> {
    if q.nb_bisectors() != n {
        return Err(ExtractError::MalformedSymbolicVertex {
            details: format!(
                "{} boundary facets with {} bisectors",
                q.nb_boundary_facets(),
                q.nb_bisectors()
            ),
        });
    }
    Ok(())
}

/// Resolve the surface edge shared by `q`'s two boundary facets.
fn boundary_edge<T: TetSet>(tets: &T, q: &SymbolicVertex) -> Result<(u32, u32)> {
    let f0 = tets.facet_vertices(q.boundary_facet(0));
    let f1 = tets.facet_vertices(q.boundary_facet(1));
    let mut shared = f0.iter().copied().filter(|v| f1.contains(v));
    match (shared.next(), shared.next(), shared.next()) {
        (Some(e0), Some(e1), None) => Ok((e0, e1)),
        _ => Err(ExtractError::MalformedSymbolicVertex {
            details: "boundary facets do not share an edge".to_string(),
        }),
    }
}

/// Resolve the surface vertex shared by `q`'s three boundary facets.
fn boundary_vertex<T: TetSet>(tets: &T, q: &SymbolicVertex) -> Result<u32> {
    let f0 = tets.facet_vertices(q.boundary_facet(0));
    let f1 = tets.facet_vertices(q.boundary_facet(1));
    let f2 = tets.facet_vertices(q.boundary_facet(2));
    let mut shared = f0
        .iter()
        .copied()
        .filter(|v| f1.contains(v) && f2.contains(v));
    match (shared.next(), shared.next()) {
        (Some(v0), None) => Ok(v0),
        _ => Err(ExtractError::MalformedSymbolicVertex {
            details: "boundary facets do not share a vertex".to_string(),
        }),
    }
}

/// Plain floating-point implementation of [`PowerPredicates`].
///
/// Reconstructs each vertex by solving its defining constraint system in
/// `f64`, then compares power distances directly. Degenerate systems yield
/// [`Sign::Zero`] instead of a perturbed sign, so this implementation is only
/// reliable for well-separated configurations. Use a robust SOS evaluator for
/// production input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatPredicates;

impl FloatPredicates {
    /// The bisector of `pi` and `pk` as a plane `n . x = d`.
    fn bisector_plane(pi: &WeightedPoint, pk: &WeightedPoint) -> (Vector3<f64>, f64) {
        // power(pi, x) = power(pk, x)
        //   <=> 2 (pk - pi) . x = |pk|^2 - wk - |pi|^2 + wi
        let n = 2.0 * (pk.point - pi.point);
        let d = pk.point.coords.norm_squared() - pk.weight - pi.point.coords.norm_squared()
            + pi.weight;
        (n, d)
    }

    fn solve_planes(planes: [(Vector3<f64>, f64); 3]) -> Option<Point3<f64>> {
        let m = Matrix3::from_rows(&[
            planes[0].0.transpose(),
            planes[1].0.transpose(),
            planes[2].0.transpose(),
        ]);
        let rhs = Vector3::new(planes[0].1, planes[1].1, planes[2].1);
        m.lu().solve(&rhs).map(Point3::from)
    }

    fn compare(pi: &WeightedPoint, pj: &WeightedPoint, x: &Point3<f64>) -> Sign {
        Sign::from_f64(pj.power_distance(x) - pi.power_distance(x))
    }
}

impl PowerPredicates for FloatPredicates {
    fn power_side1(&self, pi: &WeightedPoint, pj: &WeightedPoint, q: &Point3<f64>) -> Sign {
        Self::compare(pi, pj, q)
    }

    fn power_side2(
        &self,
        pi: &WeightedPoint,
        b0: &WeightedPoint,
        pj: &WeightedPoint,
        e0: &Point3<f64>,
        e1: &Point3<f64>,
    ) -> Sign {
        // Intersect the line through [e0, e1] with the bisector of pi and b0.
        let (n, d) = Self::bisector_plane(pi, b0);
        let dir = e1 - e0;
        let denom = n.dot(&dir);
        if denom == 0.0 {
            return Sign::Zero;
        }
        let t = (d - n.dot(&e0.coords)) / denom;
        let x = e0 + dir * t;
        Self::compare(pi, pj, &x)
    }

    fn power_side3(
        &self,
        pi: &WeightedPoint,
        b0: &WeightedPoint,
        b1: &WeightedPoint,
        pj: &WeightedPoint,
        q0: &Point3<f64>,
        q1: &Point3<f64>,
        q2: &Point3<f64>,
    ) -> Sign {
        // Intersect the supporting plane of (q0, q1, q2) with two bisectors.
        let n = (q1 - q0).cross(&(q2 - q0));
        let plane = (n, n.dot(&q0.coords));
        match Self::solve_planes([
            plane,
            Self::bisector_plane(pi, b0),
            Self::bisector_plane(pi, b1),
        ]) {
            Some(x) => Self::compare(pi, pj, &x),
            None => Sign::Zero,
        }
    }

    fn power_side4_3d(
        &self,
        pi: &WeightedPoint,
        b0: &WeightedPoint,
        b1: &WeightedPoint,
        b2: &WeightedPoint,
        pj: &WeightedPoint,
    ) -> Sign {
        match Self::solve_planes([
            Self::bisector_plane(pi, b0),
            Self::bisector_plane(pi, b1),
            Self::bisector_plane(pi, b2),
        ]) {
            Some(x) => Self::compare(pi, pj, &x),
            None => Sign::Zero,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::TET_FACET_VERTEX;

    struct Sites(Vec<WeightedPoint>);

    impl SiteSet for Sites {
        fn num_sites(&self) -> usize {
            self.0.len()
        }

        fn point(&self, s: u32) -> Point3<f64> {
            self.0[s as usize].point
        }

        fn weight(&self, s: u32) -> f64 {
            self.0[s as usize].weight
        }
    }

    struct SingleTet([Point3<f64>; 4]);

    impl TetSet for SingleTet {
        fn num_tets(&self) -> usize {
            1
        }

        fn tet_vertex(&self, t: u32, lv: usize) -> u32 {
            assert_eq!(t, 0);
            lv as u32
        }

        fn tet_adjacent(&self, _t: u32, _lf: usize) -> Option<u32> {
            None
        }

        fn vertex_point(&self, v: u32) -> Point3<f64> {
            self.0[v as usize]
        }
    }

    fn fixture() -> (SingleTet, Sites) {
        let tets = SingleTet([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        ]);
        let sites = Sites(vec![
            WeightedPoint::new(Point3::new(0.2, 0.3, 0.2), 0.0),
            WeightedPoint::new(Point3::new(1.1, 0.4, 0.3), 0.1),
            WeightedPoint::new(Point3::new(0.4, 1.2, 0.4), 0.0),
            WeightedPoint::new(Point3::new(0.3, 0.4, 1.3), 0.05),
            WeightedPoint::new(Point3::new(0.8, 0.8, 0.8), 0.0),
        ]);
        (tets, sites)
    }

    fn sym_with(bisectors: &[u32], facets: &[u32]) -> SymbolicVertex {
        let mut s = SymbolicVertex::new();
        for &b in bisectors {
            s.add_bisector(b);
        }
        for &f in facets {
            s.add_boundary_facet(f);
        }
        s
    }

    #[test]
    fn test_sign_negation() {
        assert_eq!(-Sign::Positive, Sign::Negative);
        assert_eq!(-Sign::Zero, Sign::Zero);
        assert_eq!(Sign::from_f64(-2.5), Sign::Negative);
        assert_eq!(Sign::from_f64(0.0), Sign::Zero);
    }

    #[test]
    fn test_side1_favors_nearer_site() {
        let pred = FloatPredicates;
        let near = WeightedPoint::new(Point3::new(0.0, 0.0, 0.0), 0.0);
        let far = WeightedPoint::new(Point3::new(10.0, 0.0, 0.0), 0.0);
        let q = Point3::new(1.0, 1.0, 0.0);
        assert_eq!(pred.power_side1(&near, &far, &q), Sign::Positive);
        assert_eq!(pred.power_side1(&far, &near, &q), Sign::Negative);
    }

    #[test]
    fn test_side1_weight_shifts_balance() {
        let pred = FloatPredicates;
        let q = Point3::new(0.5, 0.0, 0.0);
        let a = WeightedPoint::new(Point3::new(0.0, 0.0, 0.0), 0.0);
        let b = WeightedPoint::new(Point3::new(1.0, 0.0, 0.0), 0.0);
        // Equidistant, equal weights.
        assert_eq!(pred.power_side1(&a, &b, &q), Sign::Zero);
        // A larger weight on b pulls the midpoint into b's region.
        let b = WeightedPoint::new(Point3::new(1.0, 0.0, 0.0), 0.2);
        assert_eq!(pred.power_side1(&a, &b, &q), Sign::Negative);
    }

    #[test]
    fn test_classify_antisymmetry_all_cases() {
        let (tets, sites) = fixture();
        let pred = FloatPredicates;

        let cases = [
            sym_with(&[1, 2, 3], &[]),
            sym_with(&[1, 2], &[0]),
            sym_with(&[1], &[0, 1]),
            sym_with(&[], &[0, 1, 2]),
        ];

        for q in &cases {
            for i in 0..5u32 {
                for j in 0..5u32 {
                    if i == j {
                        continue;
                    }
                    let ij = classify(&pred, &tets, &sites, q, i, j, 3).unwrap();
                    let ji = classify(&pred, &tets, &sites, q, j, i, 3).unwrap();
                    assert_eq!(ij, -ji, "classify must be antisymmetric ({}, {})", i, j);
                }
            }
        }
    }

    #[test]
    fn test_classify_deterministic() {
        let (tets, sites) = fixture();
        let pred = FloatPredicates;
        let q = sym_with(&[1, 2], &[0]);
        let first = classify(&pred, &tets, &sites, &q, 0, 4, 3).unwrap();
        for _ in 0..10 {
            assert_eq!(classify(&pred, &tets, &sites, &q, 0, 4, 3).unwrap(), first);
        }
    }

    #[test]
    fn test_classify_boundary_vertex_case() {
        let (tets, sites) = fixture();
        let pred = FloatPredicates;
        // Facets 1, 2, 3 of the tet share local vertex 0 (the origin).
        let q = sym_with(&[], &[1, 2, 3]);
        // Site 0 sits near the origin, site 4 far from it.
        let s = classify(&pred, &tets, &sites, &q, 0, 4, 3).unwrap();
        assert_eq!(s, Sign::Positive);
    }

    #[test]
    fn test_classify_unsupported_dimension() {
        let (tets, sites) = fixture();
        let pred = FloatPredicates;
        let q = sym_with(&[1, 2, 3], &[]);
        let err = classify(&pred, &tets, &sites, &q, 0, 4, 2).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::UnsupportedDimension { dim: 2 }
        ));
        // Boundary cases do not depend on the ambient dimension.
        let q = sym_with(&[], &[0, 1, 2]);
        assert!(classify(&pred, &tets, &sites, &q, 0, 4, 2).is_ok());
    }

    #[test]
    fn test_classify_malformed_descriptor() {
        let (tets, sites) = fixture();
        let pred = FloatPredicates;
        // 1 boundary facet must come with 2 bisectors.
        let q = sym_with(&[1], &[0]);
        assert!(matches!(
            classify(&pred, &tets, &sites, &q, 0, 4, 3),
            Err(ExtractError::MalformedSymbolicVertex { .. })
        ));
    }

    #[test]
    fn test_tet_facets_share_edges() {
        // Sanity check on the facet table the edge resolution relies on:
        // any two facets of a tet share exactly 2 vertices.
        for a in 0..4 {
            for b in (a + 1)..4 {
                let fa = TET_FACET_VERTEX[a];
                let fb = TET_FACET_VERTEX[b];
                let shared = fa.iter().filter(|v| fb.contains(v)).count();
                assert_eq!(shared, 2);
            }
        }
    }
}
