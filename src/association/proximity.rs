//! Origin-distance association.

use super::{AssociationConfig, Associator, greedy_assignment};
use crate::segmentation::Proposal;
use crate::world::Entity;

#[derive(Debug, Clone, Default)]
pub struct ProximityAssociator {
    config: AssociationConfig,
}

impl ProximityAssociator {
    pub fn new(config: AssociationConfig) -> Self {
        Self { config }
    }

    /// `1 / (1 + 100·d²)`, zero beyond `max_distance`.
    ///
    /// Height differences are weighted by `z_weight`: objects stacked on top
    /// of each other share XY but are different entities.
    fn score(&self, entity: &Entity, proposal: &Proposal) -> f64 {
        let Some(pose) = entity.pose else {
            return 0.0;
        };
        let d = proposal.pose.translation - pose.translation;
        let d2 = d.x * d.x + d.y * d.y + self.config.z_weight * d.z * d.z;
        if d2 > self.config.max_distance * self.config.max_distance {
            return 0.0;
        }
        1.0 / (1.0 + 100.0 * d2)
    }
}

impl Associator for ProximityAssociator {
    fn associate(&self, candidates: &[&Entity], proposals: &[&Proposal]) -> Vec<Option<usize>> {
        let scores: Vec<Vec<f64>> = proposals
            .iter()
            .map(|p| candidates.iter().map(|e| self.score(e, p)).collect())
            .collect();
        greedy_assignment(&scores, candidates.len())
    }
}
