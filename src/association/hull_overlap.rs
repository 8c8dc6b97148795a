//! Footprint-overlap association.

use super::{AssociationConfig, Associator, greedy_assignment};
use crate::geometry::polygon;
use crate::segmentation::Proposal;
use crate::world::Entity;

#[derive(Debug, Clone, Default)]
pub struct HullOverlapAssociator {
    config: AssociationConfig,
}

impl HullOverlapAssociator {
    pub fn new(config: AssociationConfig) -> Self {
        Self { config }
    }

    /// Intersection area over the smaller footprint area.
    fn score(&self, entity: &Entity, proposal: &Proposal) -> f64 {
        let Some(pose) = entity.pose else {
            return 0.0;
        };
        if !entity.hull.is_valid() || !proposal.hull.is_valid() {
            return 0.0;
        }
        let a = entity.hull.world_footprint(&pose);
        let b = proposal.hull.world_footprint(&proposal.pose);
        let smaller = polygon::area(&a).min(polygon::area(&b));
        if smaller <= 0.0 {
            return 0.0;
        }
        let ratio = polygon::convex_intersection_area(&a, &b) / smaller;
        if ratio < self.config.min_overlap_ratio {
            return 0.0;
        }
        ratio
    }
}

impl Associator for HullOverlapAssociator {
    fn associate(&self, candidates: &[&Entity], proposals: &[&Proposal]) -> Vec<Option<usize>> {
        let scores: Vec<Vec<f64>> = proposals
            .iter()
            .map(|p| candidates.iter().map(|e| self.score(e, p)).collect())
            .collect();
        greedy_assignment(&scores, candidates.len())
    }
}
