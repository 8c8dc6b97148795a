//! Single-pass merging of overlapping proposals.
//!
//! Roots are visited in input order. A root claims every proposal that
//! collides with it and has not been claimed yet; claimed proposals never
//! become roots themselves. Collision is therefore not transitively closed:
//! with A–B and B–C colliding but not A–C, input order A, B, C yields
//! `{A, B}` and `C` rather than one group of three.

use nalgebra::Vector2;
use tracing::debug;

use crate::geometry::Hull;
use crate::sensor::DepthFrame;

use super::SegmentationConfig;
use super::proposal::Proposal;
use super::refit::refit;

/// Union of two proposals, refitted against `frame`.
///
/// The footprint is the convex hull of both world footprints and the height
/// range encloses both world ranges. The first proposal's id is kept.
pub fn merge_pair(frame: &DepthFrame, a: &Proposal, b: &Proposal) -> Proposal {
    let mut xy: Vec<Vector2<f64>> = a.hull.world_footprint(&a.pose);
    xy.extend(b.hull.world_footprint(&b.pose));

    let (a0, a1) = a.world_z_range();
    let (b0, b1) = b.world_z_range();
    let (hull, pose) = Hull::from_world_points(&xy, a0.min(b0), a1.max(b1));

    let mut merged = Proposal::new(hull, pose);
    merged.id = a.id.clone();
    refit(frame, &mut merged);
    merged
}

/// Merge colliding proposals.
pub fn merge_overlapping(
    frame: &DepthFrame,
    proposals: Vec<Proposal>,
    config: &SegmentationConfig,
) -> Vec<Proposal> {
    let n = proposals.len();
    let mut claimed = vec![false; n];
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        if claimed[i] {
            continue;
        }
        for j in 0..n {
            if i == j || claimed[j] {
                continue;
            }
            let (pi, pj) = (&proposals[i], &proposals[j]);
            if pi.hull.collides(
                &pi.pose,
                &pj.hull,
                &pj.pose,
                config.merge_xy_padding,
                config.merge_z_tolerance,
            ) {
                debug!("Proposal {} absorbs proposal {}", i, j);
                members[i].push(j);
                claimed[j] = true;
            }
        }
    }

    let mut merged = Vec::with_capacity(n);
    for (i, p) in proposals.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        let root = members[i]
            .iter()
            .fold(p.clone(), |acc, &j| merge_pair(frame, &acc, &proposals[j]));
        merged.push(root);
    }

    debug!("Merging: {} proposals -> {}", n, merged.len());
    merged
}
