//! Per-cell data structures.
//!
//! This module provides the scratch structures scoped to one cell's
//! processing:
//!
//! - [`CellMesh`]: the polygonal working mesh (vertex positions plus
//!   symbolic descriptors, facet loops plus neighbor attributes, per-corner
//!   adjacency),
//! - [`VertexMap`]: the deduplication map collapsing repeated traversal
//!   visits of the same diagram vertex,
//! - [`VertexId`] / [`FacetId`]: type-safe element indices.
//!
//! All of these live only for the duration of one cell (or seed group) inside
//! the [`Extractor`](crate::extract::Extractor); nothing here escapes a cell
//! boundary.

mod index;
mod mesh;
mod vertex_map;

pub use index::{FacetId, VertexId};
pub use mesh::{CellFacet, CellMesh, CellVertex};
pub use vertex_map::VertexMap;
