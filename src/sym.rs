//! Symbolic vertex descriptors.
//!
//! A vertex of a restricted power diagram is the intersection of exactly three
//! constraints in 3D: bisector planes between the cell's site and neighboring
//! sites, and boundary elements of the input tetrahedral mesh. A
//! [`SymbolicVertex`] records this combinatorial description exactly, so that
//! geometrically identical vertices produced by different traversal paths can
//! be recognized without comparing floating-point coordinates.
//!
//! The descriptor stores two small sorted sets:
//!
//! - up to 3 **bisector** site indices,
//! - up to 3 **boundary facet** ids, encoded as `4 * tet + local_facet`.
//!
//! The number of boundary facets determines what kind of input-mesh element
//! the vertex lies on: 0 = interior (three bisectors), 1 = on a facet,
//! 2 = on an edge (two facets), 3 = on an input vertex (three facets).
//!
//! # Example
//!
//! ```
//! use rind::sym::SymbolicVertex;
//!
//! let mut a = SymbolicVertex::new();
//! a.add_bisector(7);
//! a.add_bisector(2);
//! a.add_boundary_facet(13);
//!
//! let mut b = SymbolicVertex::new();
//! b.add_boundary_facet(13);
//! b.add_bisector(2);
//! b.add_bisector(7);
//!
//! // Insertion order does not matter.
//! assert_eq!(a, b);
//! assert_eq!(a.nb_bisectors(), 2);
//! assert_eq!(a.nb_boundary_facets(), 1);
//! ```

/// A sorted set of at most 3 ids.
///
/// Insertion keeps the elements sorted and unique, so two sets built in
/// different orders compare and hash identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct SmallSet {
    items: [u32; 3],
    len: u8,
}

impl SmallSet {
    fn new() -> Self {
        Self::default()
    }

    fn len(&self) -> usize {
        self.len as usize
    }

    fn get(&self, i: usize) -> u32 {
        debug_assert!(i < self.len());
        self.items[i]
    }

    fn contains(&self, id: u32) -> bool {
        self.items[..self.len()].contains(&id)
    }

    /// Insert `id`, keeping the set sorted. Duplicate insertions are ignored.
    fn insert(&mut self, id: u32) {
        if self.contains(id) {
            return;
        }
        debug_assert!(self.len() < 3, "symbolic vertex has more than 3 constraints");
        let mut i = self.len();
        // Shift larger elements up to keep sorted order.
        while i > 0 && self.items[i - 1] > id {
            self.items[i] = self.items[i - 1];
            i -= 1;
        }
        self.items[i] = id;
        self.len += 1;
    }
}

/// Exact combinatorial descriptor of a power-diagram vertex.
///
/// See the [module documentation](self) for the encoding. Two descriptors are
/// equal exactly when they denote the same diagram vertex, which makes this
/// type usable as a deduplication key (see
/// [`VertexMap`](crate::cell::VertexMap)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolicVertex {
    bisectors: SmallSet,
    boundary_facets: SmallSet,
}

impl SymbolicVertex {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bisectors defining this vertex (0 to 3).
    #[inline]
    pub fn nb_bisectors(&self) -> usize {
        self.bisectors.len()
    }

    /// Number of input-mesh boundary facets this vertex lies on (0 to 3).
    #[inline]
    pub fn nb_boundary_facets(&self) -> usize {
        self.boundary_facets.len()
    }

    /// Get the `i`-th bisector site index (in sorted order).
    ///
    /// # Panics
    /// Panics in debug builds if `i >= nb_bisectors()`.
    #[inline]
    pub fn bisector(&self, i: usize) -> u32 {
        self.bisectors.get(i)
    }

    /// Get the `i`-th boundary facet id (in sorted order).
    ///
    /// # Panics
    /// Panics in debug builds if `i >= nb_boundary_facets()`.
    #[inline]
    pub fn boundary_facet(&self, i: usize) -> u32 {
        self.boundary_facets.get(i)
    }

    /// Add a bisector site index.
    ///
    /// Duplicate ids are ignored. Adding a fourth distinct bisector is a
    /// contract violation (debug-asserted).
    pub fn add_bisector(&mut self, site: u32) {
        self.bisectors.insert(site);
    }

    /// Add a boundary facet id (`4 * tet + local_facet`).
    ///
    /// Duplicate ids are ignored. Adding a fourth distinct facet is a
    /// contract violation (debug-asserted).
    pub fn add_boundary_facet(&mut self, facet: u32) {
        self.boundary_facets.insert(facet);
    }
}
