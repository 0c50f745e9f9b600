use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lifecycle of one update run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Loaded,
    Fetched,
    Gated,
    Diffed,
    Transferring,
    /// New manifest written
    Committed,
    /// At least one file failed; old manifest kept
    Held,
    /// Remote version equals the local one
    UpToDate,
    /// Remote version is older and downgrades are not allowed
    Refused,
    Aborted { error: String },
}

impl UpdateState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UpdateState::Committed
                | UpdateState::Held
                | UpdateState::UpToDate
                | UpdateState::Refused
                | UpdateState::Aborted { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub enum UpdateEvent {
    LocalLoaded,
    RemoteFetched,
    GatePassed,
    SameVersion,
    VersionRegression,
    Diffed,
    TransferStarted,
    TransferFinished { failures: usize },
    Abort { error: String },
}

/// Overrides for the update gate and the unchanged-file check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Skip the name and version gate entirely
    pub force: bool,
    /// Accept a remote version older than the local one
    pub allow_downgrade: bool,
    /// Trust recorded size/hash for unchanged entries instead of re-hashing
    pub quick: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operation {
    Download,
    Verify,
    Update,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunOutcome {
    /// Manifest persisted
    Committed,
    /// Manifest not persisted because of failures or cancellation
    Held,
    UpToDate,
    Refused,
    /// Verification pass finished (errors, if any, are in the report)
    Checked,
}

/// Counters and error lines of one run. Owned by that run alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub operation: Operation,
    pub groups: usize,
    pub files: usize,
    pub fetched: usize,
    pub up_to_date: usize,
    pub removed: usize,
    pub errors: Vec<String>,
    pub outcome: Option<RunOutcome>,
    pub started_at: i64,
    pub finished_at: Option<i64>,
}

impl SyncReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            groups: 0,
            files: 0,
            fetched: 0,
            up_to_date: 0,
            removed: 0,
            errors: Vec::new(),
            outcome: None,
            started_at: chrono::Utc::now().timestamp(),
            finished_at: None,
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.errors.push(message);
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Process exit code: the number of recorded errors.
    pub fn exit_code(&self) -> i32 {
        i32::try_from(self.errors.len()).unwrap_or(i32::MAX)
    }

    pub(crate) fn finish(mut self, outcome: RunOutcome) -> Self {
        self.outcome = Some(outcome);
        self.finished_at = Some(chrono::Utc::now().timestamp());
        self
    }
}
