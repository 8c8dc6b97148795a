//! Proposal ↔ entity association.
//!
//! An [`Associator`] decides which tracked entity, if any, each proposal
//! belongs to. Strategies are selected by [`AssociationStrategy`] from the
//! configuration. [`associate_and_update`] turns the decision into update
//! commands and [`remove_unassociated`] evaluates the entities that were not
//! seen.

pub mod hull_overlap;
pub mod proximity;
pub mod removal;
pub mod update;

use serde::{Deserialize, Serialize};

use crate::segmentation::Proposal;
use crate::world::Entity;

pub use hull_overlap::HullOverlapAssociator;
pub use proximity::ProximityAssociator;
pub use removal::remove_unassociated;
pub use update::associate_and_update;

/// Association strategy.
pub trait Associator {
    /// For every proposal, the index into `candidates` it belongs to.
    ///
    /// The assignment is one-to-one: no candidate index appears twice.
    fn associate(&self, candidates: &[&Entity], proposals: &[&Proposal]) -> Vec<Option<usize>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationStrategy {
    /// Distance between hull origins.
    #[default]
    Proximity,
    /// Footprint intersection area.
    HullOverlap,
}

impl AssociationStrategy {
    pub fn build(self, config: &AssociationConfig) -> Box<dyn Associator> {
        match self {
            AssociationStrategy::Proximity => Box::new(ProximityAssociator::new(config.clone())),
            AssociationStrategy::HullOverlap => {
                Box::new(HullOverlapAssociator::new(config.clone()))
            }
        }
    }
}

/// Configuration for association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    pub strategy: AssociationStrategy,

    /// Maximum weighted origin distance for a proximity match (meters).
    /// Default: 0.2m
    pub max_distance: f64,

    /// Weight of the squared height difference in the proximity distance.
    /// Default: 4.0
    pub z_weight: f64,

    /// Minimum footprint overlap, as a fraction of the smaller footprint.
    /// Default: 0.1 (10%)
    pub min_overlap_ratio: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            strategy: AssociationStrategy::Proximity,
            max_distance: 0.2,
            z_weight: 4.0,
            min_overlap_ratio: 0.1,
        }
    }
}

impl AssociationConfig {
    pub fn build(&self) -> Box<dyn Associator> {
        self.strategy.build(self)
    }
}

/// Greedy one-to-one assignment over `scores[proposal][candidate]`.
///
/// Pairs are taken best score first; only strictly positive scores are
/// eligible. Equal scores resolve to the lower proposal, then candidate,
/// index.
pub(crate) fn greedy_assignment(scores: &[Vec<f64>], n_candidates: usize) -> Vec<Option<usize>> {
    let mut pairs: Vec<(f64, usize, usize)> = scores
        .iter()
        .enumerate()
        .flat_map(|(p, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, s)| **s > 0.0)
                .map(move |(c, s)| (*s, p, c))
        })
        .collect();
    // Stable sort keeps index order among equal scores
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut assignment = vec![None; scores.len()];
    let mut taken = vec![false; n_candidates];
    for (_, p, c) in pairs {
        if assignment[p].is_none() && !taken[c] {
            assignment[p] = Some(c);
            taken[c] = true;
        }
    }
    assignment
}
