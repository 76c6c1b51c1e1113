//! Dual-to-primal traversal and the extraction pipeline.
//!
//! The kernel's cell enumerator produces each restricted power-diagram cell
//! in *dual* form (see [`DualCell`](crate::kernel::DualCell)). The
//! [`Extractor`] walks that structure, reconstructs ordinary facet loops by
//! circulating the corner ring of each dual vertex, and delivers them to a
//! [`CellVisitor`] as a primal callback sequence:
//!
//! ```text
//! begin_cell(seed, cell)
//!   begin_facet(neighbor_seed, neighbor_tet)
//!     vertex(position, sym)*
//!   end_facet()
//! ...
//! end_cell()
//! ```
//!
//! # Pipelines
//!
//! Two pipeline variants exist, selected once at construction:
//!
//! - **Streaming**: every facet is forwarded to the visitor as soon as its
//!   loop is recovered; nothing is buffered.
//! - **Buffered**: facets are accumulated into a [`CellMesh`] with
//!   deduplicated vertices, optionally simplified and re-triangulated, and
//!   then replayed to the visitor in facet-index order.
//!
//! Buffering is implied by any option that needs the working mesh
//! (simplification, re-triangulation); it can also be requested explicitly.
//!
//! # Merging internal facets
//!
//! With [`ExtractOptions::merge_internal_facets`], consecutive cells sharing
//! a seed (the same site restricted to different tetrahedra) are treated as
//! one logical polyhedron: facets whose link is a tetrahedron
//! ([`FacetLink::Tet`]) are shared internal faces and are skipped entirely,
//! and the cell boundary is emitted only when the seed changes. Call
//! [`Extractor::finish`] after the last cell to flush the trailing group.
//!
//! # Example
//!
//! ```no_run
//! use rind::extract::{CellVisitor, ExtractOptions, Extractor};
//! use rind::sym::SymbolicVertex;
//! use nalgebra::Point3;
//!
//! struct Counter {
//!     facets: usize,
//! }
//!
//! impl CellVisitor for Counter {
//!     fn end_facet(&mut self) {
//!         self.facets += 1;
//!     }
//! }
//!
//! let options = ExtractOptions::default()
//!     .with_merge_internal_facets(true)
//!     .with_merge_coplanar_regions(true);
//! let mut extractor = Extractor::new(Counter { facets: 0 }, options);
//! // for (seed, tet, cell) in kernel_cells { extractor.process_cell(seed, tet, &cell); }
//! let counter = extractor.into_visitor();
//! println!("{} boundary facets", counter.facets);
//! ```

use nalgebra::Point3;
use tracing::warn;

use crate::algo::{retriangulate_non_convex, simplify_regions};
use crate::cell::{CellMesh, FacetId, VertexId, VertexMap};
use crate::kernel::{DualCell, FacetLink};
use crate::sym::SymbolicVertex;

/// Consumer of the primal callback sequence.
///
/// All methods default to no-ops, so implementations only handle the events
/// they care about.
pub trait CellVisitor {
    /// A cell (or merged cell group) of site `seed` begins. `cell` is the
    /// tetrahedron index of the first cell in the group.
    fn begin_cell(&mut self, seed: u32, cell: u32) {
        let _ = (seed, cell);
    }

    /// A facet begins. `neighbor_seed` identifies the site across this facet
    /// (`None` when the facet does not border another site's cell);
    /// `neighbor_tet` identifies the tetrahedron across it (`None` for
    /// cell-boundary facets).
    fn begin_facet(&mut self, neighbor_seed: Option<u32>, neighbor_tet: Option<u32>) {
        let _ = (neighbor_seed, neighbor_tet);
    }

    /// One vertex of the current facet loop, in loop order.
    fn vertex(&mut self, position: &Point3<f64>, sym: &SymbolicVertex) {
        let _ = (position, sym);
    }

    /// The current facet is complete.
    fn end_facet(&mut self) {}

    /// The current cell (or merged cell group) is complete.
    fn end_cell(&mut self) {}
}

/// Configuration toggles for the extraction pipeline.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Treat consecutive cells sharing a seed as one polyhedron and skip
    /// their shared internal facets.
    pub merge_internal_facets: bool,

    /// Merge adjacent same-region facets into coarser polygons
    /// (see [`simplify_regions`]). Implies buffering.
    pub merge_coplanar_regions: bool,

    /// Crease angle in degrees for region merging. `0.0` disables crease
    /// detection and preserves the outer region untouched. Negative or NaN
    /// values make the merge pass reject the mesh with a warning; facets are
    /// then replayed unmerged.
    pub crease_angle_deg: f64,

    /// Re-triangulate merged facets that turn out non-convex
    /// (see [`retriangulate_non_convex`]). Implies buffering.
    pub retriangulate_non_convex: bool,

    /// Buffer facets through the working mesh even when no processing is
    /// requested (deduplicates vertices before replay).
    pub buffer_mesh: bool,
}

impl ExtractOptions {
    /// Set whether internal facets of same-seed cell runs are merged away.
    pub fn with_merge_internal_facets(mut self, merge: bool) -> Self {
        self.merge_internal_facets = merge;
        self
    }

    /// Set whether same-region facets are merged into coarser polygons.
    pub fn with_merge_coplanar_regions(mut self, merge: bool) -> Self {
        self.merge_coplanar_regions = merge;
        self
    }

    /// Set the crease angle (degrees) for region merging.
    pub fn with_crease_angle_deg(mut self, angle: f64) -> Self {
        self.crease_angle_deg = angle;
        self
    }

    /// Set whether non-convex merged facets are re-triangulated.
    pub fn with_retriangulate_non_convex(mut self, retriangulate: bool) -> Self {
        self.retriangulate_non_convex = retriangulate;
        self
    }

    /// Force buffering through the working mesh.
    pub fn with_buffer_mesh(mut self, buffer: bool) -> Self {
        self.buffer_mesh = buffer;
        self
    }
}

/// Walks dual cells and replays them as primal facet loops to a visitor.
///
/// See the [module documentation](self) for the protocol and pipeline
/// variants.
pub struct Extractor<V: CellVisitor> {
    visitor: V,
    options: ExtractOptions,
    /// Pipeline variant; fixed at construction.
    buffered: bool,

    /// Seed of the open cell group, if any.
    last_seed: Option<u32>,
    seed: u32,
    tet: u32,
    facet_seed: Option<u32>,
    facet_tet: Option<u32>,
    facet_skipped: bool,

    mesh: CellMesh,
    vertex_map: VertexMap,
    current_facet: Vec<VertexId>,
}

impl<V: CellVisitor> Extractor<V> {
    /// Create an extractor delivering events to `visitor`.
    pub fn new(visitor: V, options: ExtractOptions) -> Self {
        let buffered = options.buffer_mesh
            || options.merge_coplanar_regions
            || options.retriangulate_non_convex;
        Self {
            visitor,
            options,
            buffered,
            last_seed: None,
            seed: 0,
            tet: 0,
            facet_seed: None,
            facet_tet: None,
            facet_skipped: false,
            mesh: CellMesh::new(),
            vertex_map: VertexMap::new(),
            current_facet: Vec::new(),
        }
    }

    /// Borrow the visitor.
    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    /// Process one cell of site `seed` restricted to tetrahedron `tet`.
    ///
    /// Cells must arrive grouped by seed when
    /// [`merge_internal_facets`](ExtractOptions::merge_internal_facets) is
    /// enabled; a seed change closes the previous group.
    pub fn process_cell<C: DualCell>(&mut self, seed: u32, tet: u32, cell: &C) {
        if self.options.merge_internal_facets {
            if self.last_seed != Some(seed) {
                if self.last_seed.is_some() {
                    self.end_cell_internal();
                }
                self.begin_cell_internal(seed, tet);
            }
        } else {
            self.begin_cell_internal(seed, tet);
        }

        // The cell is in dual form: its combinatorial vertices are facets and
        // its triangles are vertices. Each live dual vertex yields one facet
        // loop by circulating the corner ring.
        for dv in 0..cell.num_dual_vertices() {
            let Some(t) = cell.dual_vertex_triangle(dv) else {
                continue;
            };

            let (facet_seed, facet_tet) = match cell.dual_vertex_link(dv) {
                FacetLink::Seed(s) => (Some(s), None),
                FacetLink::Tet(t2) => (None, Some(t2)),
                FacetLink::Boundary => (None, None),
            };

            self.begin_facet_internal(facet_seed, facet_tet);
            let first = cell.first_corner(t, dv);
            let mut c = first;
            loop {
                self.vertex_internal(&cell.position(c.triangle), cell.symbolic(c.triangle));
                c = cell.next_around_vertex(c);
                if c == first {
                    break;
                }
            }
            self.end_facet_internal();
        }

        if !self.options.merge_internal_facets {
            self.end_cell_internal();
        }
    }

    /// Flush the trailing cell group.
    ///
    /// Required after the final [`process_cell`](Extractor::process_cell)
    /// in merge-internal mode; harmless otherwise.
    pub fn finish(&mut self) {
        if self.options.merge_internal_facets && self.last_seed.is_some() {
            self.end_cell_internal();
        }
        self.last_seed = None;
    }

    /// Flush any pending group and return the visitor.
    pub fn into_visitor(mut self) -> V {
        self.finish();
        self.visitor
    }

    fn begin_cell_internal(&mut self, seed: u32, tet: u32) {
        self.last_seed = Some(seed);
        self.seed = seed;
        self.tet = tet;
        if self.buffered {
            self.mesh.clear();
            self.vertex_map = VertexMap::new();
        } else {
            self.visitor.begin_cell(seed, tet);
        }
    }

    fn begin_facet_internal(&mut self, facet_seed: Option<u32>, facet_tet: Option<u32>) {
        self.facet_seed = facet_seed;
        self.facet_tet = facet_tet;
        // Internal facets are shared faces of the merged polyhedron and must
        // not appear in the boundary.
        self.facet_skipped = self.options.merge_internal_facets && facet_tet.is_some();
        if !self.facet_skipped && !self.buffered {
            self.visitor.begin_facet(facet_seed, facet_tet);
        }
    }

    fn vertex_internal(&mut self, position: &Point3<f64>, sym: &SymbolicVertex) {
        if self.facet_skipped {
            return;
        }
        if self.buffered {
            let (v, created) = self.vertex_map.find_or_create(self.seed, sym);
            if created {
                let id = self.mesh.add_vertex(*position, *sym);
                debug_assert_eq!(id, v);
            }
            self.current_facet.push(v);
        } else {
            self.visitor.vertex(position, sym);
        }
    }

    fn end_facet_internal(&mut self) {
        if !self.facet_skipped {
            if self.buffered {
                let vertices = std::mem::take(&mut self.current_facet);
                self.mesh.add_facet(vertices, self.facet_seed, self.facet_tet);
            } else {
                self.visitor.end_facet();
            }
        }
        self.facet_seed = None;
        self.facet_tet = None;
    }

    fn end_cell_internal(&mut self) {
        if self.buffered {
            self.mesh.connect();
            self.process_cell_mesh();
            self.mesh.clear();
        } else {
            self.visitor.end_cell();
        }
    }

    /// Post-process the buffered working mesh and replay it.
    fn process_cell_mesh(&mut self) {
        if self.options.merge_coplanar_regions {
            if let Err(err) = simplify_regions(&mut self.mesh, self.options.crease_angle_deg) {
                warn!("skipping region merge: {}", err);
            }
        }
        if self.options.retriangulate_non_convex {
            retriangulate_non_convex(&mut self.mesh);
        }

        self.visitor.begin_cell(self.seed, self.tet);
        for fi in 0..self.mesh.num_facets() {
            let facet = self.mesh.facet(FacetId::new(fi));
            self.visitor.begin_facet(facet.region, facet.tet);
            for &v in &facet.vertices {
                let vertex = self.mesh.vertex(v);
                self.visitor.vertex(&vertex.position, &vertex.sym);
            }
            self.visitor.end_facet();
        }
        self.visitor.end_cell();
    }
}
