//! Per-cell polygonal working mesh.
//!
//! [`CellMesh`] is the scratch structure the extractor materializes for one
//! cell (or one merged group of cells sharing a seed) when deferred
//! processing (region simplification or re-triangulation) is requested. It
//! is an arena scoped to that cell's processing: created at cell start,
//! mutated in place by the algorithms, replayed, and then cleared.
//!
//! Unlike a half-edge structure, facets are stored directly as ordered vertex
//! loops of arbitrary arity, because simplification produces general polygons.
//! Adjacency is per facet corner: `adjacent(f, c)` is the facet on the other
//! side of the edge leaving corner `c`, established by [`CellMesh::connect`]
//! from directed-edge hashing.
//!
//! Each vertex carries its position and symbolic descriptor; each facet
//! carries the neighbor-seed label (`region`, `None` meaning the
//! outer/unbounded region) and the neighbor-tetrahedron index (`tet`, `None`
//! meaning a cell-boundary facet).

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use super::index::{FacetId, VertexId};
use crate::sym::SymbolicVertex;

/// A vertex of the working mesh.
#[derive(Debug, Clone)]
pub struct CellVertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,
    /// Symbolic descriptor used for deduplication.
    pub sym: SymbolicVertex,
}

/// A polygonal facet of the working mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFacet {
    /// Ordered vertex loop.
    pub vertices: Vec<VertexId>,
    /// Facet on the other side of each corner's edge (`vertices[c]` to
    /// `vertices[c + 1]`). Invalid until [`CellMesh::connect`] runs; invalid
    /// entries denote border edges.
    pub adjacent: Vec<FacetId>,
    /// Neighbor-seed label. `None` is the outer/unbounded region.
    pub region: Option<u32>,
    /// Neighbor tetrahedron. `None` for cell-boundary facets.
    pub tet: Option<u32>,
}

impl CellFacet {
    /// Number of corners (== number of vertices) of this facet.
    #[inline]
    pub fn num_corners(&self) -> usize {
        self.vertices.len()
    }

    /// The corner following `c` in the loop.
    #[inline]
    pub fn next_corner(&self, c: usize) -> usize {
        (c + 1) % self.vertices.len()
    }
}

/// Ephemeral polygonal mesh for one cell's processing.
#[derive(Debug, Clone, Default)]
pub struct CellMesh {
    vertices: Vec<CellVertex>,
    facets: Vec<CellFacet>,
}

impl CellMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all vertices and facets, keeping allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.facets.clear();
    }

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of facets.
    #[inline]
    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, v: VertexId) -> &CellVertex {
        &self.vertices[v.index()]
    }

    /// Get a facet by ID.
    #[inline]
    pub fn facet(&self, f: FacetId) -> &CellFacet {
        &self.facets[f.index()]
    }

    /// Get a mutable facet by ID.
    #[inline]
    pub fn facet_mut(&mut self, f: FacetId) -> &mut CellFacet {
        &mut self.facets[f.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Iterate over all facet IDs.
    pub fn facet_ids(&self) -> impl Iterator<Item = FacetId> + '_ {
        (0..self.facets.len()).map(FacetId::new)
    }

    /// The facet across the edge leaving corner `c` of facet `f`, or `None`
    /// on a border edge.
    #[inline]
    pub fn adjacent(&self, f: FacetId, c: usize) -> Option<FacetId> {
        let a = self.facet(f).adjacent[c];
        a.is_valid().then_some(a)
    }

    /// Add a vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>, sym: SymbolicVertex) -> VertexId {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(CellVertex { position, sym });
        id
    }

    /// Add a facet from an ordered vertex loop and return its ID.
    ///
    /// Adjacency is left unset; call [`connect`](CellMesh::connect) after all
    /// facets are in place.
    pub fn add_facet(
        &mut self,
        vertices: Vec<VertexId>,
        region: Option<u32>,
        tet: Option<u32>,
    ) -> FacetId {
        debug_assert!(vertices.len() >= 3);
        let id = FacetId::new(self.facets.len());
        let n = vertices.len();
        self.facets.push(CellFacet {
            vertices,
            adjacent: vec![FacetId::invalid(); n],
            region,
            tet,
        });
        id
    }

    /// Establish facet adjacency from the stored vertex loops.
    ///
    /// Two facets are adjacent across an edge when one traverses it as
    /// `(a, b)` and the other as `(b, a)`. Edges traversed only once are
    /// borders.
    pub fn connect(&mut self) {
        let mut edge_map: HashMap<(VertexId, VertexId), FacetId> =
            HashMap::with_capacity(self.facets.iter().map(|f| f.vertices.len()).sum());

        for (fi, facet) in self.facets.iter().enumerate() {
            for c in 0..facet.num_corners() {
                let a = facet.vertices[c];
                let b = facet.vertices[facet.next_corner(c)];
                edge_map.insert((a, b), FacetId::new(fi));
            }
        }

        for facet in &mut self.facets {
            for c in 0..facet.vertices.len() {
                let a = facet.vertices[c];
                let b = facet.vertices[(c + 1) % facet.vertices.len()];
                facet.adjacent[c] = edge_map
                    .get(&(b, a))
                    .copied()
                    .unwrap_or_else(FacetId::invalid);
            }
        }
    }

    /// Compute the (unnormalized) Newell normal of a facet.
    ///
    /// Robust for arbitrary planar polygons and meaningful for slightly
    /// non-planar ones.
    pub fn facet_normal(&self, f: FacetId) -> Vector3<f64> {
        let facet = self.facet(f);
        let mut n = Vector3::zeros();
        for c in 0..facet.num_corners() {
            let p = self.position(facet.vertices[c]);
            let q = self.position(facet.vertices[facet.next_corner(c)]);
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
        }
        n
    }

    /// Compute the vertex-average centroid of a facet.
    pub fn facet_centroid(&self, f: FacetId) -> Point3<f64> {
        let facet = self.facet(f);
        let mut c = Vector3::zeros();
        for &v in &facet.vertices {
            c += self.position(v).coords;
        }
        Point3::from(c / facet.num_corners() as f64)
    }

    /// Delete the facets whose mask entry is `true`, compacting the rest in
    /// order. Adjacency becomes stale; re-run [`connect`](CellMesh::connect)
    /// if it is needed afterwards.
    pub fn delete_facets(&mut self, to_delete: &[bool]) {
        debug_assert_eq!(to_delete.len(), self.facets.len());
        let mut i = 0;
        self.facets.retain(|_| {
            let keep = !to_delete[i];
            i += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> (CellMesh, FacetId, FacetId) {
        // Two triangles forming the unit square, sharing the diagonal.
        let mut mesh = CellMesh::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0), SymbolicVertex::new());
        let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0), SymbolicVertex::new());
        let v2 = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0), SymbolicVertex::new());
        let v3 = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0), SymbolicVertex::new());
        let f0 = mesh.add_facet(vec![v0, v1, v2], Some(4), None);
        let f1 = mesh.add_facet(vec![v0, v2, v3], Some(4), None);
        mesh.connect();
        (mesh, f0, f1)
    }

    #[test]
    fn test_connect_shared_edge() {
        let (mesh, f0, f1) = quad_mesh();
        // f0 crosses to f1 over the diagonal (corner 2: v2 -> v0).
        assert_eq!(mesh.adjacent(f0, 2), Some(f1));
        assert_eq!(mesh.adjacent(f1, 0), Some(f0));
        // All other edges are borders.
        assert_eq!(mesh.adjacent(f0, 0), None);
        assert_eq!(mesh.adjacent(f0, 1), None);
        assert_eq!(mesh.adjacent(f1, 1), None);
        assert_eq!(mesh.adjacent(f1, 2), None);
    }

    #[test]
    fn test_newell_normal() {
        let (mesh, f0, _) = quad_mesh();
        let n = mesh.facet_normal(f0);
        assert!(n.z > 0.0);
        assert!(n.x.abs() < 1e-12 && n.y.abs() < 1e-12);
        // Newell normal has magnitude 2 * area.
        assert!((n.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid() {
        let (mesh, f0, _) = quad_mesh();
        let c = mesh.facet_centroid(f0);
        assert!((c - Point3::new(2.0 / 3.0, 1.0 / 3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_delete_facets_compacts_in_order() {
        let (mut mesh, _, f1) = quad_mesh();
        let second = mesh.facet(f1).clone();
        mesh.delete_facets(&[true, false]);
        assert_eq!(mesh.num_facets(), 1);
        assert_eq!(mesh.facet(FacetId::new(0)).vertices, second.vertices);
    }

    #[test]
    fn test_clear_keeps_nothing() {
        let (mut mesh, _, _) = quad_mesh();
        mesh.clear();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_facets(), 0);
    }
}
