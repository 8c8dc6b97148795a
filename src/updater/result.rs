use crate::segmentation::Proposal;
use crate::world::UpdateBatch;

/// Outcome of one successful update call.
#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    /// Commands to apply to the world model.
    pub batch: UpdateBatch,
    /// Final proposals, each bound to an entity id.
    pub entity_updates: Vec<Proposal>,
    /// Area description actually used (after memory lookup), if any.
    pub area_description: Option<String>,
}
