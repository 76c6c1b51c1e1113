//! Mesh post-processing algorithms.
//!
//! This module contains the algorithms applied to a per-cell working mesh
//! between buffering and replay:
//!
//! - **Simplification**: merging same-region adjacent facets into coarser
//!   polygons, honoring crease boundaries, with per-group rollback
//! - **Re-triangulation**: restoring triangulated form for merged polygons
//!   that turn out non-convex

pub mod simplify;
pub mod triangulate;

pub use simplify::{simplify_regions, MergeReject};
pub use triangulate::{polygon_is_convex, retriangulate_non_convex, triangulate_polygon};
