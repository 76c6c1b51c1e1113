//! Vertex deduplication map.
//!
//! While walking one cell's dual structure, the same diagram vertex is
//! visited once per incident facet. [`VertexMap`] collapses these visits to a
//! single mesh-vertex index by keying on the cell seed and the vertex's
//! symbolic descriptor: an exact comparison, immune to floating-point noise
//! in the reconstructed coordinates.
//!
//! The map's lifetime matches the working mesh: it is dropped and recreated
//! at the start of each cell (or seed group).

use std::collections::HashMap;

use super::index::VertexId;
use crate::sym::SymbolicVertex;

/// Maps `(seed, symbolic descriptor)` keys to stable vertex indices.
#[derive(Debug, Default)]
pub struct VertexMap {
    map: HashMap<(u32, SymbolicVertex), VertexId>,
}

impl VertexMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct vertices seen so far.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Return the vertex index for `(seed, sym)`, allocating the next index
    /// on first sight.
    ///
    /// The boolean is `true` when the vertex was freshly allocated, in which
    /// case the caller must create the corresponding mesh vertex.
    pub fn find_or_create(&mut self, seed: u32, sym: &SymbolicVertex) -> (VertexId, bool) {
        let next = VertexId::new(self.map.len());
        match self.map.entry((seed, *sym)) {
            std::collections::hash_map::Entry::Occupied(e) => (*e.get(), false),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(next);
                (next, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(bisectors: &[u32]) -> SymbolicVertex {
        let mut s = SymbolicVertex::new();
        for &b in bisectors {
            s.add_bisector(b);
        }
        s
    }

    #[test]
    fn test_find_or_create_idempotent() {
        let mut map = VertexMap::new();
        let s = sym(&[1, 2, 3]);
        let (v0, created) = map.find_or_create(7, &s);
        assert!(created);
        let (v1, created) = map.find_or_create(7, &s);
        assert!(!created);
        assert_eq!(v0, v1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_distinct_descriptors_get_distinct_indices() {
        let mut map = VertexMap::new();
        let (a, _) = map.find_or_create(7, &sym(&[1, 2, 3]));
        let (b, _) = map.find_or_create(7, &sym(&[1, 2, 4]));
        assert_ne!(a, b);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn test_seed_is_part_of_the_key() {
        let mut map = VertexMap::new();
        let s = sym(&[1, 2, 3]);
        let (a, _) = map.find_or_create(7, &s);
        let (b, created) = map.find_or_create(8, &s);
        assert!(created);
        assert_ne!(a, b);
    }
}
