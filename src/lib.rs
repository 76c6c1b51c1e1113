//! # Rind
//!
//! Boundary extraction for 3D restricted power diagrams.
//!
//! Rind turns the convex cells of a restricted power diagram, delivered in
//! dual form by an external geometric kernel, into a polygonal boundary mesh.
//! It recovers facet loops by corner circulation, deduplicates vertices
//! through their symbolic descriptors, and optionally simplifies the result
//! by merging coplanar regions and re-triangulating non-convex polygons.
//!
//! ## Features
//!
//! - **Dual-to-primal traversal**: a visitor-driven extraction pipeline with
//!   streaming and buffered variants
//! - **Symbolic vertices**: compact bisector/boundary-facet descriptors with
//!   order-independent identity, used for global deduplication
//! - **Region merging**: crease-aware facet merging with per-group rollback
//!   on degenerate borders
//! - **Re-triangulation**: minimal-largest-angle dynamic-programming
//!   triangulation of non-convex polygons
//! - **Exact classification**: dispatch of power-diagram side predicates by
//!   symbolic vertex degree
//!
//! ## Quick Start
//!
//! ```
//! use rind::prelude::*;
//! use nalgebra::Point3;
//!
//! // Collect the extracted boundary into flat buffers.
//! #[derive(Default)]
//! struct Collector {
//!     positions: Vec<Point3<f64>>,
//!     facet_sizes: Vec<usize>,
//!     current: usize,
//! }
//!
//! impl CellVisitor for Collector {
//!     fn vertex(&mut self, position: &Point3<f64>, _sym: &SymbolicVertex) {
//!         self.positions.push(*position);
//!         self.current += 1;
//!     }
//!
//!     fn end_facet(&mut self) {
//!         self.facet_sizes.push(self.current);
//!         self.current = 0;
//!     }
//! }
//!
//! let options = ExtractOptions::default()
//!     .with_merge_internal_facets(true)
//!     .with_merge_coplanar_regions(true)
//!     .with_crease_angle_deg(30.0)
//!     .with_retriangulate_non_convex(true);
//!
//! let mut extractor = Extractor::new(Collector::default(), options);
//! // for each cell produced by the kernel, grouped by seed:
//! //     extractor.process_cell(seed, tet, &cell);
//! let collector = extractor.into_visitor();
//! assert!(collector.positions.is_empty());
//! ```
//!
//! ## Working With Symbolic Vertices
//!
//! ```
//! use rind::sym::SymbolicVertex;
//!
//! let mut v = SymbolicVertex::new();
//! v.add_bisector(7);
//! v.add_bisector(3);
//! v.add_boundary_facet(12);
//! assert_eq!(v.nb_bisectors(), 2);
//! assert_eq!(v.nb_boundary_facets(), 1);
//! // Insertion order does not matter.
//! assert_eq!(v.bisector(0), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod cell;
pub mod error;
pub mod extract;
pub mod kernel;
pub mod predicates;
pub mod sym;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use rind::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cell::{CellMesh, FacetId, VertexId, VertexMap};
    pub use crate::error::{ExtractError, Result};
    pub use crate::extract::{CellVisitor, ExtractOptions, Extractor};
    pub use crate::kernel::{DualCell, DualCorner, FacetLink, SiteSet, TetSet};
    pub use crate::predicates::{PowerPredicates, Sign, WeightedPoint};
    pub use crate::sym::SymbolicVertex;
}

// Re-export nalgebra types for convenience
pub use nalgebra;
