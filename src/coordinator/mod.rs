mod coordinator;
mod error;
mod state_machine;
mod types;

pub use coordinator::SyncCoordinator;
pub use error::{SyncError, SyncResult};
pub use state_machine::UpdateStateMachine;
pub use types::{Operation, RunOutcome, SyncReport, UpdateEvent, UpdateOptions, UpdateState};
