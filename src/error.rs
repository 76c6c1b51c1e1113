//! Error types for rind.
//!
//! This module defines all error types used throughout the library.
//!
//! Most failures in rind are recoverable by design: a region merge that would
//! corrupt the topology is rejected and the original facets are kept, and a
//! facet that cannot be re-triangulated is left untouched. The errors defined
//! here cover the remaining conditions that callers must handle explicitly.

use thiserror::Error;

/// Result type alias using [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur during power-diagram boundary extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Exact classification was requested for an unsupported ambient dimension.
    ///
    /// The classifier's all-bisector case is only implemented for ambient
    /// dimension 3 and has no fallback. Callers must treat this as fatal.
    #[error("exact classification is only implemented for ambient dimension 3 (got {dim})")]
    UnsupportedDimension {
        /// The requested ambient dimension.
        dim: usize,
    },

    /// A symbolic vertex descriptor is inconsistent with the input mesh.
    #[error("malformed symbolic vertex: {details}")]
    MalformedSymbolicVertex {
        /// Description of the inconsistency.
        details: String,
    },

    /// A polygon could not be triangulated.
    ///
    /// The dynamic program found no split of the polygon into triangles that
    /// avoids reflex corners and contained vertices.
    #[error("could not triangulate non-convex polygon with {vertices} vertices")]
    TriangulationFailed {
        /// Number of polygon vertices.
        vertices: usize,
    },

    /// A polygon with fewer than 3 vertices was passed to triangulation.
    #[error("polygon has {vertices} vertices, need at least 3")]
    PolygonTooSmall {
        /// Number of polygon vertices.
        vertices: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl ExtractError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        ExtractError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}
