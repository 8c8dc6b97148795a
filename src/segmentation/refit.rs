//! Hull refit: re-derive a proposal's contributing pixels and height range
//! from the unfiltered frame.

use crate::geometry::Hull;
use crate::sensor::DepthFrame;

use super::foreground::extract_within;
use super::proposal::Proposal;

/// Slack on the prism height so points on the top or bottom face survive
/// the re-centring of the pose between refits.
const Z_SLACK: f64 = 1e-6;

/// Recompute the pixels inside the proposal's prism and tighten its height.
///
/// Footprint and pose XY are left untouched; the pose Z moves to the middle
/// of the contributing points' world Z range. With no pixels inside, the
/// proposal is emptied and its hull collapses to zero height at the current
/// pose Z.
pub fn refit(frame: &DepthFrame, proposal: &mut Proposal) {
    let prism_hull = Hull {
        points: proposal.hull.points.clone(),
        z_min: proposal.hull.z_min - Z_SLACK,
        z_max: proposal.hull.z_max + Z_SLACK,
    };
    let inside = extract_within(frame, &prism_hull.prism(), &proposal.pose);

    proposal.points.clear();
    proposal.pixel_indices.clear();

    let mut z_min = f64::INFINITY;
    let mut z_max = f64::NEG_INFINITY;
    for idx in inside.valid_indices() {
        let p = inside.point_at(&frame.camera, idx, inside.get(idx));
        let z = frame.sensor_pose.transform_point(&p).z;
        z_min = z_min.min(z);
        z_max = z_max.max(z);
        proposal.points.push(p);
        proposal.pixel_indices.push(idx);
    }

    if proposal.points.is_empty() {
        proposal.hull.z_min = 0.0;
        proposal.hull.z_max = 0.0;
        return;
    }

    let half = 0.5 * (z_max - z_min);
    proposal.pose.translation.z = 0.5 * (z_max + z_min);
    proposal.hull.z_min = -half;
    proposal.hull.z_max = half;
}

/// Two-pass refit that first reaches down to the supporting surface and
/// then pulls the bottom back up to drop the surface pixels.
pub fn refit_against_support(frame: &DepthFrame, proposal: &mut Proposal, grow: f64, shrink: f64) {
    proposal.hull.z_min -= grow;
    refit(frame, proposal);

    proposal.hull.z_min = (proposal.hull.z_min + shrink).min(proposal.hull.z_max);
    refit(frame, proposal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon;
    use crate::segmentation::{Clusterer, remove_known_background};
    use crate::test_support::*;
    use std::collections::BTreeSet;

    fn object_proposal(frame: &DepthFrame) -> Proposal {
        let fg = remove_known_background(
            &frame.depth,
            &static_world(),
            &frame.camera,
            &frame.sensor_pose,
            0.02,
            true,
        );
        let mut proposals = Clusterer::default().cluster(&fg, &frame.camera, &frame.sensor_pose);
        assert_eq!(proposals.len(), 1);
        proposals.remove(0)
    }

    fn pixel_set(p: &Proposal) -> BTreeSet<usize> {
        p.pixel_indices.iter().copied().collect()
    }

    #[test]
    fn test_refit_is_idempotent() {
        let frame = standard_frame();
        let mut p = object_proposal(&frame);

        refit(&frame, &mut p);
        let first = pixel_set(&p);
        let first_pose = p.pose;
        refit(&frame, &mut p);

        assert!(!first.is_empty());
        assert_eq!(pixel_set(&p), first);
        assert!((p.pose.translation.z - first_pose.translation.z).abs() < 1e-9);
    }

    #[test]
    fn test_refit_keeps_footprint_and_xy() {
        let frame = standard_frame();
        let mut p = object_proposal(&frame);
        let footprint = p.hull.points.clone();
        let (x, y) = (p.pose.translation.x, p.pose.translation.y);

        refit(&frame, &mut p);

        assert_eq!(p.hull.points, footprint);
        assert_eq!((p.pose.translation.x, p.pose.translation.y), (x, y));
        assert!(p.hull.z_min <= p.hull.z_max);
    }

    #[test]
    fn test_shrink_pass_is_subset_of_grow_pass() {
        let frame = standard_frame();
        let mut grown = object_proposal(&frame);
        grown.hull.z_min -= 0.04;
        refit(&frame, &mut grown);
        let grow_set = pixel_set(&grown);

        let mut both = object_proposal(&frame);
        refit_against_support(&frame, &mut both, 0.04, 0.01);
        let shrink_set = pixel_set(&both);

        assert!(!shrink_set.is_empty());
        assert!(shrink_set.is_subset(&grow_set));

        // The grow pass reaches down to the table top, the shrink pass lifts
        // the bottom again
        let (g0, _) = grown.world_z_range();
        let (s0, s1) = both.world_z_range();
        assert!(g0 < 0.765);
        assert!(s0 >= g0 + 0.0099);
        assert!(s1 > 0.94 && s1 < 0.951);
    }

    #[test]
    fn test_empty_refit_collapses_at_previous_z() {
        let frame = standard_frame();
        // A prism floating in free space above the table
        let (hull, pose) = Hull::from_world_points(&polygon::square(2.3, -0.3, 0.05), 1.8, 1.9);
        let mut p = Proposal::new(hull, pose);
        p.points.push(nalgebra::Vector3::zeros());
        p.pixel_indices.push(0);

        refit(&frame, &mut p);

        assert!(p.is_empty());
        assert!(p.pixel_indices.is_empty());
        assert_eq!(p.hull.z_min, 0.0);
        assert_eq!(p.hull.z_max, 0.0);
        assert!((p.pose.translation.z - 1.85).abs() < 1e-12);
        assert_eq!(p.pose.translation.x, pose.translation.x);
    }
}
