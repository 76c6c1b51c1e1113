//! Interfaces to the collaborating geometric kernel.
//!
//! rind does not own the weighted sites, the input tetrahedral mesh, or the
//! convex-cell enumerator: those live in an external kernel and are consumed
//! through the traits in this module.
//!
//! - [`SiteSet`] exposes positions and weights of the weighted sites.
//! - [`TetSet`] exposes the input tetrahedral mesh: per-tet vertices and
//!   neighbors, vertex positions, and decoding of global boundary-facet ids.
//! - [`DualCell`] exposes one convex cell in *dual* form. The cell's
//!   combinatorial "vertices" denote its facets and its "triangles" denote its
//!   vertices; recovering an ordinary facet loop means circulating around one
//!   dual vertex through the corner ring (see
//!   [`Extractor`](crate::extract::Extractor)).
//!
//! The traits are deliberately minimal: the extraction core only needs
//! corner circulation and attribute lookups, never the kernel's concrete
//! representation.

use nalgebra::Point3;

use crate::sym::SymbolicVertex;

/// Vertices of local facet `lf` of a tetrahedron, ordered so that the facet
/// normal points outward. Global facet ids encode `4 * tet + lf`.
pub const TET_FACET_VERTEX: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [0, 1, 2]];

/// A set of weighted sites (the generators of the power diagram).
pub trait SiteSet {
    /// Number of sites.
    fn num_sites(&self) -> usize;

    /// Position of site `s`.
    fn point(&self, s: u32) -> Point3<f64>;

    /// Weight of site `s`.
    fn weight(&self, s: u32) -> f64;
}

/// Random-access view of the input tetrahedral mesh.
pub trait TetSet {
    /// Number of tetrahedra.
    fn num_tets(&self) -> usize;

    /// Global index of local vertex `lv` (0..4) of tetrahedron `t`.
    fn tet_vertex(&self, t: u32, lv: usize) -> u32;

    /// Tetrahedron adjacent to `t` across local facet `lf` (0..4), or `None`
    /// on the mesh boundary.
    fn tet_adjacent(&self, t: u32, lf: usize) -> Option<u32>;

    /// Position of mesh vertex `v`.
    fn vertex_point(&self, v: u32) -> Point3<f64>;

    /// The three mesh vertices of global facet `f` (`4 * tet + local_facet`).
    fn facet_vertices(&self, f: u32) -> [u32; 3] {
        let t = f / 4;
        let lf = (f % 4) as usize;
        let lv = TET_FACET_VERTEX[lf];
        [
            self.tet_vertex(t, lv[0]),
            self.tet_vertex(t, lv[1]),
            self.tet_vertex(t, lv[2]),
        ]
    }
}

/// What lies on the other side of a cell facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetLink {
    /// The facet is a bisector against another site's cell.
    Seed(u32),
    /// The facet is internal: shared with the same cell restricted to another
    /// tetrahedron.
    Tet(u32),
    /// The facet lies on the boundary of the input mesh.
    Boundary,
}

/// A corner of a dual triangle: triangle index plus the slot (0..3) of one of
/// its dual vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualCorner {
    /// Dual triangle index.
    pub triangle: u32,
    /// Vertex slot within the triangle.
    pub slot: u8,
}

impl DualCorner {
    /// Create a corner.
    pub fn new(triangle: u32, slot: u8) -> Self {
        debug_assert!(slot < 3);
        Self { triangle, slot }
    }
}

/// A convex cell in dual form, as produced by the kernel's cell enumerator.
///
/// Dual vertices correspond to the cell's facets; dual triangles correspond
/// to the cell's vertices and carry a position and a
/// [`SymbolicVertex`] descriptor.
pub trait DualCell {
    /// Number of dual vertex slots (some may be unused).
    fn num_dual_vertices(&self) -> u32;

    /// One dual triangle incident to dual vertex `dv`, or `None` if the slot
    /// is unused in this cell.
    fn dual_vertex_triangle(&self, dv: u32) -> Option<u32>;

    /// What the facet corresponding to dual vertex `dv` borders.
    fn dual_vertex_link(&self, dv: u32) -> FacetLink;

    /// The corner of triangle `t` that references dual vertex `dv`.
    fn first_corner(&self, t: u32, dv: u32) -> DualCorner;

    /// The next corner around the same dual vertex.
    ///
    /// Repeatedly applying this from [`first_corner`](DualCell::first_corner)
    /// visits every dual triangle incident to the vertex exactly once and
    /// returns to the start, in the winding order of the primal facet loop.
    fn next_around_vertex(&self, c: DualCorner) -> DualCorner;

    /// Position of the cell vertex denoted by dual triangle `t`.
    fn position(&self, t: u32) -> Point3<f64>;

    /// Symbolic descriptor of the cell vertex denoted by dual triangle `t`.
    fn symbolic(&self, t: u32) -> &SymbolicVertex;
}
