//! In-memory mirror of the remote tables with optimistic mutations.
//!
//! The [`SyncStore`] owns the current [`Snapshot`] of teachers, assistants,
//! courses and sessions. Every operation runs in two decoupled stages:
//!
//! 1. A synchronous local transition. A new snapshot is built and swapped in
//!    atomically, so readers never see a half-applied change.
//! 2. A remote write spawned on the tokio runtime. Its outcome is logged and
//!    published as a [`SyncEvent`]; it never reverts the local transition.
//!
//! Course statistics are re-derived through [`aggregate`] whenever session
//! membership can change.

pub mod aggregate;
mod events;
mod loader;
mod mutations;

pub use events::{LoadReport, PendingSync, SyncEvent, SyncOutcome, WriteOp};

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::models::{Course, Person, PersonType, ScheduleError, ScheduleParams, ScheduleParamsPatch, Session};
use crate::remote::{RemoteError, RemoteStore, Table};

const EVENT_CAPACITY: usize = 64;

/// Immutable view of the local collections at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub teachers: Vec<Person>,
    pub assistants: Vec<Person>,
    pub courses: Vec<Course>,
    pub sessions: Vec<Session>,
    pub schedule: ScheduleParams,
    /// True while the loader runs; collections must not be read meanwhile.
    pub loading: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            teachers: Vec::new(),
            assistants: Vec::new(),
            courses: Vec::new(),
            sessions: Vec::new(),
            schedule: ScheduleParams::default(),
            loading: true,
        }
    }
}

impl Snapshot {
    /// Local collection holding people of the given subtype.
    pub fn people(&self, kind: PersonType) -> &[Person] {
        match kind {
            PersonType::Teacher => &self.teachers,
            PersonType::Assistant => &self.assistants,
        }
    }

    pub(crate) fn people_mut(&mut self, kind: PersonType) -> &mut Vec<Person> {
        match kind {
            PersonType::Teacher => &mut self.teachers,
            PersonType::Assistant => &mut self.assistants,
        }
    }

    /// Finds a person in either collection.
    pub fn person(&self, id: &str) -> Option<&Person> {
        self.teachers
            .iter()
            .chain(self.assistants.iter())
            .find(|p| p.id == id)
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions_for_course<'a>(&'a self, course_id: &'a str) -> impl Iterator<Item = &'a Session> {
        self.sessions.iter().filter(move |s| s.course_id == course_id)
    }

    /// Sessions shown by the current schedule params, ordered by date and sequence.
    pub fn scheduled_sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self
            .sessions
            .iter()
            .filter(|s| self.schedule.includes(s))
            .collect();
        sessions.sort_by(|a, b| a.date.cmp(&b.date).then(a.sequence.cmp(&b.sequence)));
        sessions
    }
}

/// Client-side sync layer over a [`RemoteStore`].
///
/// Cloning is cheap; clones share the same snapshot and event channel.
#[derive(Clone)]
pub struct SyncStore {
    remote: Arc<dyn RemoteStore>,
    state: Arc<watch::Sender<Arc<Snapshot>>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncStore {
    /// Creates an empty store. Collections stay empty, with `loading` set,
    /// until [`SyncStore::load`] runs.
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        let (state, _) = watch::channel(Arc::new(Snapshot::default()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            state: Arc::new(state),
            events,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver notified on every snapshot swap.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.state.subscribe()
    }

    /// Receiver for remote reconciliation events.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Applies a partial update to the local schedule view state.
    ///
    /// Never touches the remote store. Invalid months leave the params as they were.
    pub fn update_schedule_params(
        &self,
        patch: ScheduleParamsPatch,
    ) -> Result<ScheduleParams, ScheduleError> {
        let next = self.snapshot().schedule.apply(patch)?;
        let schedule = next.clone();
        self.apply(move |snap| snap.schedule = schedule);
        Ok(next)
    }

    /// Swaps in a new snapshot built from the current one.
    pub(crate) fn apply(&self, f: impl FnOnce(&mut Snapshot)) {
        self.state.send_modify(|current| {
            let mut next = Snapshot::clone(current);
            f(&mut next);
            *current = Arc::new(next);
        });
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Runs a mutation's remote write in the background.
    ///
    /// Failures are logged and published; the local state is left as is.
    pub(crate) fn spawn_write<F>(&self, table: Table, op: WriteOp, id: String, write: F) -> PendingSync
    where
        F: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            match write.await {
                Ok(()) => {
                    tracing::debug!("Remote {} on {} {} succeeded", op, table, id);
                    SyncOutcome::Synced
                }
                Err(error) => {
                    tracing::error!("Remote {} on {} {} failed: {}", op, table, id, error);
                    let _ = events.send(SyncEvent::WriteFailed {
                        table,
                        op,
                        id,
                        error: error.clone(),
                    });
                    SyncOutcome::Failed(error)
                }
            }
        });
        PendingSync::new(handle)
    }
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("remote", &self.remote.name())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
