//! Observable outcomes of remote reconciliation.
//!
//! Local mutations never wait on the remote store. What happens remotely is
//! reported afterwards, either by awaiting the [`PendingSync`] a mutation
//! returned or by listening to [`SyncEvent`]s.

use std::fmt;
use tokio::task::JoinHandle;

use crate::import::ImportKind;
use crate::remote::{RemoteError, Table};

/// Remote write issued by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Insert => write!(f, "insert"),
            WriteOp::Update => write!(f, "update"),
            WriteOp::Delete => write!(f, "delete"),
        }
    }
}

/// Counts gathered by one run of the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub teachers: usize,
    pub assistants: usize,
    pub courses: usize,
    pub sessions: usize,
    /// Rows that did not decode into their entity
    pub skipped_rows: usize,
    /// Tables whose read failed and were loaded as empty
    pub failed_tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Loaded(LoadReport),
    /// A mutation's remote write failed; local state was kept.
    WriteFailed {
        table: Table,
        op: WriteOp,
        id: String,
        error: RemoteError,
    },
    ImportSynced { kind: ImportKind, count: usize },
    /// Deferred user notification for an import whose remote replay failed.
    ImportFailed { kind: ImportKind, message: String },
}

/// Result of the remote half of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Synced,
    Failed(RemoteError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }
}

impl From<Result<(), RemoteError>> for SyncOutcome {
    fn from(result: Result<(), RemoteError>) -> Self {
        match result {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => SyncOutcome::Failed(e),
        }
    }
}

/// Handle to a remote write running in the background.
///
/// Dropping it detaches the task; the write still runs to completion.
#[derive(Debug)]
pub struct PendingSync {
    handle: JoinHandle<SyncOutcome>,
}

impl PendingSync {
    pub(crate) fn new(handle: JoinHandle<SyncOutcome>) -> Self {
        Self { handle }
    }

    /// Waits for the remote write to finish and returns its outcome.
    pub async fn settled(self) -> SyncOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome::Failed(RemoteError::Message(format!(
                "sync task did not complete: {}",
                e
            ))),
        }
    }
}
