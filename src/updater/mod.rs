//! Update orchestration: one depth frame in, one command batch out.

pub mod error;
pub mod memory;
pub mod motion;
pub mod orchestrator;
pub mod request;
pub mod result;

pub use error::UpdateError;
pub use memory::AreaDescriptionMemory;
pub use motion::{restrict_motion, update_state_group_pose};
pub use orchestrator::Updater;
pub use request::{UpdateRequest, UpdateTarget};
pub use result::UpdateResult;
