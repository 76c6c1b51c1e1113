//! Region-based facet merging.
//!
//! [`simplify_regions`] replaces groups of connected facets that share a
//! region label with a single polygon per group. The region label of a facet
//! is its neighbor-seed attribute: facets of a cell that border the same
//! neighboring cell belong to one logical bisector polygon and can be merged,
//! as long as no sharp feature (crease) separates them.
//!
//! # Modes
//!
//! The crease angle selects between two modes:
//!
//! - `crease_angle_deg == 0.0` selects **keep outer region** mode: facets
//!   without a label (`region == None`) are preserved verbatim, and vertices
//!   touching both the outer region and an inner region become corners.
//! - `crease_angle_deg > 0.0`: unlabeled facets are flood-filled into fresh
//!   synthetic labels that never cross a crease edge (an edge whose dihedral
//!   angle exceeds the threshold), merged like any other region, and finally
//!   relabeled back to `None`.
//!
//! # Rollback
//!
//! A merge is computed fully before the mesh is touched. If a group's border
//! is non-manifold, does not close into a single cycle, consists of several
//! loops, or retains fewer than 3 corner vertices, the group is rejected: a
//! warning is logged, its original facets stay in place, and processing
//! continues with the next group. The mesh is never corrupted by a failed
//! merge.

use std::collections::HashMap;

use nalgebra::Vector3;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cell::{CellMesh, FacetId, VertexId};
use crate::error::{ExtractError, Result};

/// Why a region group could not be merged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeReject {
    /// A border vertex has more than one outgoing border edge.
    #[error("region has non-manifold border")]
    NonManifoldBorder,

    /// The border walk failed to close into a cycle.
    #[error("region has singular border topology")]
    SingularBorder,

    /// The border consists of more than one loop.
    #[error("region has multiple borders")]
    MultipleBorders,

    /// Fewer than 3 corner vertices survive elision.
    #[error("region border has fewer than 3 corners")]
    TooFewCorners,
}

/// Merge same-region adjacent facets into coarser polygons.
///
/// Facet adjacency must be current ([`CellMesh::connect`]) when this is
/// called. Merged groups are replaced by a single facet whose loop consists
/// of the group's corner vertices in border-walk order; consumed facets are
/// deleted. See the [module documentation](self) for modes and rollback.
///
/// Returns `Ok(true)` if every eligible group merged, `Ok(false)` if at
/// least one group was rejected (and kept as-is).
///
/// # Errors
///
/// [`ExtractError::InvalidParameter`] if `crease_angle_deg` is negative or
/// NaN; the mesh is untouched.
pub fn simplify_regions(mesh: &mut CellMesh, crease_angle_deg: f64) -> Result<bool> {
    if crease_angle_deg.is_nan() || crease_angle_deg < 0.0 {
        return Err(ExtractError::invalid_param(
            "crease_angle_deg",
            crease_angle_deg,
            "must be a non-negative angle in degrees",
        ));
    }
    let keep_outer = crease_angle_deg == 0.0;

    let mut creases: Option<Vec<Vec<bool>>> = None;
    let mut first_synthetic: Option<u32> = None;
    if !keep_outer {
        let flags = corner_creases(mesh, crease_angle_deg.to_radians());
        let start = max_region(mesh).map_or(0, |m| m + 1);
        split_regions_along_creases(mesh, &flags, start);
        creases = Some(flags);
        first_synthetic = Some(start);
    }

    let is_corner = find_corners(mesh, keep_outer);

    // Merges append facets; iteration stays bounded by the original count.
    let nf = mesh.num_facets();
    let mut visited = vec![false; nf];
    let mut to_delete = vec![false; nf];
    let mut all_ok = true;

    for f in 0..nf {
        if visited[f] {
            continue;
        }
        let region = mesh.facet(FacetId::new(f)).region;
        if keep_outer && region.is_none() {
            visited[f] = true;
            continue;
        }

        let group = collect_group(mesh, f, region, creases.as_deref(), &mut visited);
        match merge_group(mesh, &group, &is_corner) {
            Ok(corners) => {
                debug!(
                    facets = group.len(),
                    corners = corners.len(),
                    "merged region group"
                );
                mesh.add_facet(corners, region, None);
                for &g in &group {
                    to_delete[g] = true;
                }
            }
            Err(reject) => {
                warn!(facets = group.len(), "region merge rejected: {}", reject);
                all_ok = false;
            }
        }
    }

    to_delete.resize(mesh.num_facets(), false);
    mesh.delete_facets(&to_delete);

    // Synthetic labels only existed to drive the merge; restore the outer
    // region semantics.
    if let Some(start) = first_synthetic {
        for f in 0..mesh.num_facets() {
            let facet = mesh.facet_mut(FacetId::new(f));
            if matches!(facet.region, Some(r) if r >= start) {
                facet.region = None;
            }
        }
    }

    Ok(all_ok)
}

/// Maximum existing region label, ignoring unlabeled facets.
fn max_region(mesh: &CellMesh) -> Option<u32> {
    mesh.facet_ids()
        .filter_map(|f| mesh.facet(f).region)
        .max()
}

/// Per-corner crease flags: a corner's edge is a crease when the dihedral
/// angle between the two incident facet normals exceeds the threshold.
fn corner_creases(mesh: &CellMesh, threshold_rad: f64) -> Vec<Vec<bool>> {
    let normals: Vec<Vector3<f64>> = mesh
        .facet_ids()
        .map(|f| {
            mesh.facet_normal(f)
                .try_normalize(f64::MIN_POSITIVE)
                .unwrap_or_else(Vector3::zeros)
        })
        .collect();

    let mut flags = Vec::with_capacity(mesh.num_facets());
    for f in mesh.facet_ids() {
        let facet = mesh.facet(f);
        let mut row = vec![false; facet.num_corners()];
        for (c, flag) in row.iter_mut().enumerate() {
            if let Some(adj) = mesh.adjacent(f, c) {
                let cos = normals[f.index()].dot(&normals[adj.index()]).clamp(-1.0, 1.0);
                if cos.acos() > threshold_rad {
                    *flag = true;
                }
            }
        }
        flags.push(row);
    }
    flags
}

/// Flood-fill unlabeled facets into fresh labels, never crossing a crease.
fn split_regions_along_creases(mesh: &mut CellMesh, creases: &[Vec<bool>], first_label: u32) {
    let nf = mesh.num_facets();
    let mut next = first_label;
    for f in 0..nf {
        if mesh.facet(FacetId::new(f)).region.is_some() {
            continue;
        }
        mesh.facet_mut(FacetId::new(f)).region = Some(next);
        let mut stack = vec![f];
        while let Some(g) = stack.pop() {
            let gid = FacetId::new(g);
            for c in 0..mesh.facet(gid).num_corners() {
                if creases[g][c] {
                    continue;
                }
                if let Some(adj) = mesh.adjacent(gid, c) {
                    if mesh.facet(adj).region.is_none() {
                        mesh.facet_mut(adj).region = Some(next);
                        stack.push(adj.index());
                    }
                }
            }
        }
        next += 1;
    }
}

/// Vertices that must be preserved verbatim by merging.
///
/// A vertex touching 3 or more distinct region labels is a corner. In
/// keep-outer mode, a vertex touching both the outer region and an inner
/// region is also a corner.
fn find_corners(mesh: &CellMesh, keep_outer: bool) -> Vec<bool> {
    let nv = mesh.num_vertices();
    let mut is_corner = vec![false; nv];
    // Up to two distinct labels per vertex; a third makes it a corner.
    let mut slots: Vec<[Option<Option<u32>>; 2]> = vec![[None, None]; nv];

    for f in mesh.facet_ids() {
        let r = mesh.facet(f).region;
        for &v in &mesh.facet(f).vertices {
            let s = &mut slots[v.index()];
            if s[0] == Some(r) || s[1] == Some(r) {
                continue;
            }
            if s[0].is_none() {
                s[0] = Some(r);
            } else if s[1].is_none() {
                s[1] = Some(r);
            } else {
                is_corner[v.index()] = true;
            }
        }
    }

    if keep_outer {
        for (v, s) in slots.iter().enumerate() {
            if let [Some(a), Some(b)] = s {
                if a.is_none() != b.is_none() {
                    is_corner[v] = true;
                }
            }
        }
    }

    is_corner
}

/// Collect the connected group of facets sharing `region` with the facet at
/// `start`, crossing only non-crease corners. Marks every member visited.
fn collect_group(
    mesh: &CellMesh,
    start: usize,
    region: Option<u32>,
    creases: Option<&[Vec<bool>]>,
    visited: &mut [bool],
) -> Vec<usize> {
    visited[start] = true;
    let mut group = vec![start];
    let mut stack = vec![start];
    while let Some(f) = stack.pop() {
        let fid = FacetId::new(f);
        for c in 0..mesh.facet(fid).num_corners() {
            if let Some(cr) = creases {
                if cr[f][c] {
                    continue;
                }
            }
            if let Some(adj) = mesh.adjacent(fid, c) {
                let g = adj.index();
                if !visited[g] && mesh.facet(adj).region == region {
                    visited[g] = true;
                    group.push(g);
                    stack.push(g);
                }
            }
        }
    }
    group
}

/// Compute the merged polygon for one group without mutating the mesh.
///
/// Records a directed border edge for every group edge whose other side is
/// outside the group, walks the border cycle, and returns the corner vertices
/// in walk order.
fn merge_group(
    mesh: &CellMesh,
    group: &[usize],
    is_corner: &[bool],
) -> std::result::Result<Vec<VertexId>, MergeReject> {
    let mut in_group = vec![false; mesh.num_facets()];
    for &f in group {
        in_group[f] = true;
    }

    let mut border_next: HashMap<VertexId, VertexId> = HashMap::new();
    let mut walk_start: Option<VertexId> = None;

    for &f in group {
        let fid = FacetId::new(f);
        let facet = mesh.facet(fid);
        for c in 0..facet.num_corners() {
            let is_border = match mesh.adjacent(fid, c) {
                None => true,
                Some(adj) => !in_group[adj.index()],
            };
            if is_border {
                let v1 = facet.vertices[c];
                let v2 = facet.vertices[facet.next_corner(c)];
                if border_next.insert(v1, v2).is_some() {
                    return Err(MergeReject::NonManifoldBorder);
                }
                walk_start.get_or_insert(v1);
            }
        }
    }

    // A group without any border (a closed surface) has no polygon to build.
    let start = walk_start.ok_or(MergeReject::TooFewCorners)?;

    let mut corners = Vec::new();
    let mut nb_visited = 0usize;
    let mut v = start;
    loop {
        if is_corner[v.index()] {
            corners.push(v);
        }
        nb_visited += 1;
        v = *border_next.get(&v).ok_or(MergeReject::SingularBorder)?;
        if nb_visited > mesh.num_vertices() {
            return Err(MergeReject::SingularBorder);
        }
        if v == start {
            break;
        }
    }

    if nb_visited != border_next.len() {
        return Err(MergeReject::MultipleBorders);
    }
    if corners.len() < 3 {
        return Err(MergeReject::TooFewCorners);
    }

    Ok(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sym::SymbolicVertex;
    use nalgebra::Point3;

    /// Unit cube with each face split into two triangles along a diagonal.
    /// `regions[face]` labels both triangles of that face.
    fn split_cube(regions: [Option<u32>; 6]) -> CellMesh {
        let mut mesh = CellMesh::new();
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let v: Vec<VertexId> = p
            .iter()
            .map(|&q| mesh.add_vertex(q, SymbolicVertex::new()))
            .collect();
        // Outward-oriented quads: bottom, top, front, back, right, left.
        let faces = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [2, 3, 7, 6],
            [1, 2, 6, 5],
            [3, 0, 4, 7],
        ];
        for (q, &r) in faces.iter().zip(regions.iter()) {
            mesh.add_facet(vec![v[q[0]], v[q[1]], v[q[2]]], r, None);
            mesh.add_facet(vec![v[q[0]], v[q[2]], v[q[3]]], r, None);
        }
        mesh.connect();
        mesh
    }

    /// 3x3 grid of unit quads in the z=0 plane. `region(i, j)` labels the
    /// quad with lower-left grid corner `(i, j)`.
    fn grid3x3(region: impl Fn(usize, usize) -> Option<u32>) -> CellMesh {
        let mut mesh = CellMesh::new();
        let mut v = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                v.push(mesh.add_vertex(
                    Point3::new(i as f64, j as f64, 0.0),
                    SymbolicVertex::new(),
                ));
            }
        }
        let at = |i: usize, j: usize| v[j * 4 + i];
        for j in 0..3 {
            for i in 0..3 {
                mesh.add_facet(
                    vec![at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)],
                    region(i, j),
                    None,
                );
            }
        }
        mesh.connect();
        mesh
    }

    fn snapshot(mesh: &CellMesh) -> Vec<(Vec<VertexId>, Option<u32>)> {
        mesh.facet_ids()
            .map(|f| (mesh.facet(f).vertices.clone(), mesh.facet(f).region))
            .collect()
    }

    #[test]
    fn test_labeled_cube_faces_merge_to_quads() {
        // Every face pre-labeled: keep-outer mode merges each face's two
        // triangles into one quad.
        let mut mesh = split_cube([Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert!(simplify_regions(&mut mesh, 0.0).unwrap());
        assert_eq!(mesh.num_facets(), 6);
        let mut regions: Vec<Option<u32>> =
            mesh.facet_ids().map(|f| mesh.facet(f).region).collect();
        regions.sort();
        assert_eq!(
            regions,
            vec![Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
        for f in mesh.facet_ids() {
            assert_eq!(mesh.facet(f).num_corners(), 4);
        }
    }

    #[test]
    fn test_merged_quad_corners_in_border_order() {
        let mut mesh = split_cube([Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert!(simplify_regions(&mut mesh, 0.0).unwrap());
        // The bottom face was built over vertices 0, 3, 2, 1; the merged quad
        // must be a cyclic rotation of that loop.
        let bottom = mesh
            .facet_ids()
            .find(|&f| mesh.facet(f).region == Some(0))
            .unwrap();
        let loop_ids: Vec<usize> = mesh.facet(bottom).vertices.iter().map(|v| v.index()).collect();
        let expected = [0, 3, 2, 1];
        let offset = expected
            .iter()
            .position(|&e| e == loop_ids[0])
            .expect("merged loop uses original vertices");
        for (k, &got) in loop_ids.iter().enumerate() {
            assert_eq!(got, expected[(offset + k) % 4]);
        }
    }

    #[test]
    fn test_cube_flat_faces_merge_across_creases() {
        // Unlabeled cube, 30 degree crease: face diagonals (0 degrees) are
        // crossed, cube edges (90 degrees) are not. Each face merges into a
        // quad and the synthetic labels are restored to the outer region.
        let mut mesh = split_cube([None; 6]);
        assert!(simplify_regions(&mut mesh, 30.0).unwrap());
        assert_eq!(mesh.num_facets(), 6);
        for f in mesh.facet_ids() {
            assert_eq!(mesh.facet(f).num_corners(), 4);
            assert_eq!(mesh.facet(f).region, None);
        }
    }

    #[test]
    fn test_mixed_labels_merge_per_face() {
        // Side faces alternate between two labels, top and bottom are
        // unlabeled. Each face merges into its own quad: the unlabeled faces
        // through synthetic labels, the labeled ones within their label, and
        // no merge crosses a cube edge.
        let mut mesh = split_cube([None, None, Some(1), Some(1), Some(2), Some(2)]);
        assert!(simplify_regions(&mut mesh, 30.0).unwrap());
        assert_eq!(mesh.num_facets(), 6);
        let mut regions: Vec<Option<u32>> =
            mesh.facet_ids().map(|f| mesh.facet(f).region).collect();
        regions.sort();
        assert_eq!(
            regions,
            vec![None, None, Some(1), Some(1), Some(2), Some(2)]
        );
        for f in mesh.facet_ids() {
            assert_eq!(mesh.facet(f).num_corners(), 4);
        }
    }

    #[test]
    fn test_keep_outer_region_untouched() {
        // Center quad labeled, ring unlabeled. In keep-outer mode the ring
        // stays verbatim; the center merges (trivially) because its vertices
        // touch both the outer region and an inner one.
        let mut mesh = grid3x3(|i, j| (i == 1 && j == 1).then_some(0));
        let before = snapshot(&mesh);
        assert!(simplify_regions(&mut mesh, 0.0).unwrap());
        assert_eq!(mesh.num_facets(), 9);
        let after = snapshot(&mesh);
        // The 8 outer quads are byte-identical and come first.
        for (b, a) in before.iter().filter(|(_, r)| r.is_none()).zip(
            after.iter().filter(|(_, r)| r.is_none()),
        ) {
            assert_eq!(b, a);
        }
        // The center facet was rebuilt from its 4 corners.
        let center = after.iter().find(|(_, r)| *r == Some(0)).unwrap();
        assert_eq!(center.0.len(), 4);
    }

    #[test]
    fn test_multiple_borders_rolls_back() {
        // Ring of 8 quads around a differently-labeled center: the ring's
        // border is two disjoint loops, so its merge must be rejected and the
        // mesh left facet-for-facet identical.
        let mut mesh = grid3x3(|i, j| if i == 1 && j == 1 { Some(1) } else { Some(0) });
        let before = snapshot(&mesh);
        assert!(!simplify_regions(&mut mesh, 0.0).unwrap());
        assert_eq!(snapshot(&mesh), before);
    }

    #[test]
    fn test_non_manifold_border_rolls_back() {
        // Two holes (corner and center) touching at one grid vertex: the
        // surrounding group's border pinches at that vertex.
        let mut mesh = grid3x3(|i, j| {
            if (i == 0 && j == 0) || (i == 1 && j == 1) {
                Some(9)
            } else {
                Some(0)
            }
        });
        let before = snapshot(&mesh);
        assert!(!simplify_regions(&mut mesh, 0.0).unwrap());
        assert_eq!(snapshot(&mesh), before);
    }

    #[test]
    fn test_flat_island_too_few_corners_rolls_back() {
        // A uniformly-labeled flat patch has no corner vertices at all.
        let mut mesh = grid3x3(|_, _| Some(0));
        let before = snapshot(&mesh);
        assert!(!simplify_regions(&mut mesh, 0.0).unwrap());
        assert_eq!(snapshot(&mesh), before);
    }

    #[test]
    fn test_negative_crease_angle_is_rejected() {
        let mut mesh = split_cube([None; 6]);
        let before = snapshot(&mesh);
        for bad in [-30.0, f64::NAN] {
            assert!(matches!(
                simplify_regions(&mut mesh, bad),
                Err(ExtractError::InvalidParameter { .. })
            ));
        }
        assert_eq!(snapshot(&mesh), before);
    }

    #[test]
    fn test_merge_reject_display() {
        assert_eq!(
            MergeReject::NonManifoldBorder.to_string(),
            "region has non-manifold border"
        );
        assert_eq!(
            MergeReject::MultipleBorders.to_string(),
            "region has multiple borders"
        );
    }
}
