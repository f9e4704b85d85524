//! Classplan
//!
//! Client-side sync layer for a course-scheduling tool: an in-memory mirror
//! of teachers, assistants, courses and sessions with optimistic writes,
//! derived course statistics and bulk import against a remote table store.

pub mod auth;
pub mod config;
pub mod import;
pub mod models;
pub mod remote;
pub mod store;

pub use auth::{AuthError, AuthProvider, AuthSession, StaticAuth};
pub use config::{Backend, Config, ConfigError, ConfigSource, ConfigValue};
pub use import::{ImportError, ImportKind, ImportMode, ImportReport};
pub use models::{
    Course, Person, PersonType, Record, Row, ScheduleError, ScheduleParams, ScheduleParamsPatch,
    Session,
};
pub use remote::{Filter, MemoryStore, RemoteError, RemoteStore, RestStore, SqliteStore, Table};
pub use store::{LoadReport, PendingSync, Snapshot, SyncEvent, SyncOutcome, SyncStore, WriteOp};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
