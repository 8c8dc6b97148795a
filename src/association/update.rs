//! Bind proposals to entity ids and emit their update commands.

use tracing::{debug, info};

use super::Associator;
use crate::segmentation::Proposal;
use crate::sensor::DepthFrame;
use crate::world::{Entity, EntityIdGenerator, Measurement, UpdateBatch, WorldModel};

/// Existence gain for a re-observed entity.
///
/// Local policy: a matched entity ramps towards certainty instead of jumping
/// to 1.0, so a single re-observation does not fully restore a decayed one.
const EXISTENCE_GAIN: f64 = 0.1;

/// Associate `proposals` with `candidates` and record the outcome in `batch`.
///
/// Matched proposals take the candidate's id, unmatched ones a fresh id that
/// is not yet used in `world`. Proposals without points are skipped and keep
/// `id == None`. For every other proposal the batch receives `SetPose` and
/// `SetHull` (valid hulls only), `AddMeasurement` and
/// `SetExistenceProbability`.
pub fn associate_and_update(
    associator: &dyn Associator,
    candidates: &[&Entity],
    frame: &DepthFrame,
    proposals: &mut [Proposal],
    ids: &mut EntityIdGenerator,
    world: &WorldModel,
    batch: &mut UpdateBatch,
) {
    let live: Vec<usize> = (0..proposals.len()).filter(|&i| !proposals[i].is_empty()).collect();
    let assignment = {
        let refs: Vec<&Proposal> = live.iter().map(|&i| &proposals[i]).collect();
        associator.associate(candidates, &refs)
    };

    let mut matched = 0usize;
    let mut created = 0usize;
    for (&i, assigned) in live.iter().zip(assignment) {
        let proposal = &mut proposals[i];
        let (id, probability) = match assigned {
            Some(c) => {
                let entity = candidates[c];
                matched += 1;
                (
                    entity.id.clone(),
                    (entity.existence_probability + EXISTENCE_GAIN).min(1.0),
                )
            }
            None => {
                created += 1;
                (ids.next_id(|id| world.contains(id)), 1.0)
            }
        };
        debug!(
            "Proposal {} -> {} ({} points)",
            i,
            id,
            proposal.points.len()
        );

        if proposal.hull.is_valid() {
            batch.set_pose(id.clone(), proposal.pose);
            batch.set_hull(id.clone(), proposal.hull.clone());
        }
        batch.add_measurement(
            id.clone(),
            Measurement {
                pixel_indices: proposal.pixel_indices.clone(),
                points: proposal.points.clone(),
                sensor_pose: frame.sensor_pose,
                timestamp_ns: frame.timestamp_ns,
            },
        );
        batch.set_existence_probability(id.clone(), probability);
        proposal.id = Some(id);
    }

    info!(
        "Association: {} proposals, {} matched, {} new, {} skipped",
        proposals.len(),
        matched,
        created,
        proposals.len() - live.len()
    );
}
