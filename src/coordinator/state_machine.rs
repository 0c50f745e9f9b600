use crate::coordinator::error::{SyncError, SyncResult};
use crate::coordinator::types::{UpdateEvent, UpdateState};

/// Tracks an update run through
/// `Loaded → Fetched → Gated → Diffed → Transferring → {Committed | Held}`.
///
/// Owned by the run that drives it; not shared between runs.
#[derive(Debug)]
pub struct UpdateStateMachine {
    state: UpdateState,
    history: Vec<UpdateState>,
}

impl Default for UpdateStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateStateMachine {
    pub fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            history: vec![UpdateState::Idle],
        }
    }

    pub fn current_state(&self) -> &UpdateState {
        &self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[UpdateState] {
        &self.history
    }

    pub fn transition(&mut self, event: UpdateEvent) -> SyncResult<UpdateState> {
        let new_state = match (&self.state, &event) {
            (UpdateState::Idle, UpdateEvent::LocalLoaded) => UpdateState::Loaded,
            (UpdateState::Loaded, UpdateEvent::RemoteFetched) => UpdateState::Fetched,

            (UpdateState::Fetched, UpdateEvent::GatePassed) => UpdateState::Gated,
            (UpdateState::Fetched, UpdateEvent::SameVersion) => UpdateState::UpToDate,
            (UpdateState::Fetched, UpdateEvent::VersionRegression) => UpdateState::Refused,

            (UpdateState::Gated, UpdateEvent::Diffed) => UpdateState::Diffed,
            (UpdateState::Diffed, UpdateEvent::TransferStarted) => UpdateState::Transferring,

            (UpdateState::Transferring, UpdateEvent::TransferFinished { failures: 0 }) => {
                UpdateState::Committed
            }
            (UpdateState::Transferring, UpdateEvent::TransferFinished { .. }) => UpdateState::Held,

            (state, UpdateEvent::Abort { error }) if !state.is_terminal() => {
                UpdateState::Aborted {
                    error: error.clone(),
                }
            }

            _ => {
                return Err(SyncError::InvalidStateTransition(format!(
                    "Cannot handle {:?} in state {:?}",
                    event, self.state
                )));
            }
        };

        self.state = new_state.clone();
        self.history.push(new_state.clone());
        Ok(new_state)
    }
}
