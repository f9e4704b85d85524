//! Bulk import of loosely-typed records.
//!
//! Records are normalized per kind (see [`normalize`]), decoded into entities,
//! applied to the local snapshot in one swap and then replayed to the remote
//! store as delete-then-insert. A failed replay never undoes the local import;
//! it is published as [`SyncEvent::ImportFailed`].

pub mod normalize;

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::models::{Course, Person, PersonType, Record, Row, Session};
use crate::remote::{Filter, RemoteError, Table};
use crate::store::aggregate::recompute_all_course_stats;
use crate::store::{PendingSync, SyncEvent, SyncOutcome, SyncStore};

/// Entity collection targeted by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Teachers,
    Assistants,
    Courses,
    Sessions,
}

impl ImportKind {
    pub const ALL: [ImportKind; 4] = [
        ImportKind::Teachers,
        ImportKind::Assistants,
        ImportKind::Courses,
        ImportKind::Sessions,
    ];

    pub fn table(&self) -> Table {
        match self {
            ImportKind::Teachers | ImportKind::Assistants => Table::People,
            ImportKind::Courses => Table::Courses,
            ImportKind::Sessions => Table::Sessions,
        }
    }

    /// Remote rows removed by a replace import. Teachers and assistants
    /// share a table, so people are scoped by their `type` column.
    pub fn replace_scope(&self) -> Filter {
        match self {
            ImportKind::Teachers => Filter::eq("type", PersonType::Teacher.as_str()),
            ImportKind::Assistants => Filter::eq("type", PersonType::Assistant.as_str()),
            ImportKind::Courses | ImportKind::Sessions => Filter::All,
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Teachers => write!(f, "teachers"),
            ImportKind::Assistants => write!(f, "assistants"),
            ImportKind::Courses => write!(f, "courses"),
            ImportKind::Sessions => write!(f, "sessions"),
        }
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "teachers" | "teacher" => Ok(ImportKind::Teachers),
            "assistants" | "assistant" | "tas" | "ta" => Ok(ImportKind::Assistants),
            "courses" | "course" => Ok(ImportKind::Courses),
            "sessions" | "session" => Ok(ImportKind::Sessions),
            _ => Err(format!(
                "Invalid import kind '{}'. Valid options: teachers, assistants, courses, sessions",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    #[default]
    Append,
    /// Overwrite the target collection instead of extending it.
    Replace,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Append => write!(f, "append"),
            ImportMode::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "append" => Ok(ImportMode::Append),
            "replace" => Ok(ImportMode::Replace),
            _ => Err(format!(
                "Invalid import mode '{}'. Valid options: append, replace",
                s
            )),
        }
    }
}

/// Input rejected before anything was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    NotAnObject { index: usize },
    InvalidRecord { index: usize, reason: String },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotAnObject { index } => {
                write!(f, "Record {} is not an object", index)
            }
            ImportError::InvalidRecord { index, reason } => {
                write!(f, "Record {} is invalid: {}", index, reason)
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Result of the local half of an import.
#[derive(Debug)]
pub struct ImportReport {
    pub kind: ImportKind,
    pub mode: ImportMode,
    /// Number of records applied locally.
    pub count: usize,
    /// Remote replay, running in the background.
    pub sync: PendingSync,
}

fn decode_all<T: Record>(kind: ImportKind, records: Vec<Value>) -> Result<Vec<T>, ImportError> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let row = match value {
                Value::Object(row) => row,
                _ => return Err(ImportError::NotAnObject { index }),
            };
            T::from_row(normalize::normalize(kind, row)).map_err(|e| ImportError::InvalidRecord {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn extend_or_replace<T>(target: &mut Vec<T>, records: Vec<T>, mode: ImportMode) {
    match mode {
        ImportMode::Append => target.extend(records),
        ImportMode::Replace => *target = records,
    }
}

fn to_rows<T: Record>(records: &[T]) -> Result<Vec<Row>, RemoteError> {
    records
        .iter()
        .map(|r| r.to_row().map_err(RemoteError::from))
        .collect()
}

impl SyncStore {
    /// Imports raw records of one kind.
    ///
    /// Returns once the records are applied locally. The remote replay runs in
    /// the background; its outcome is published as an event and available
    /// through [`ImportReport::sync`].
    pub fn import_data(
        &self,
        kind: ImportKind,
        records: Vec<Value>,
        mode: ImportMode,
    ) -> Result<ImportReport, ImportError> {
        let (rows, count) = match kind {
            ImportKind::Teachers | ImportKind::Assistants => {
                let people: Vec<Person> = decode_all(kind, records)?;
                let rows = to_rows(&people);
                let person_type = if kind == ImportKind::Teachers {
                    PersonType::Teacher
                } else {
                    PersonType::Assistant
                };
                let count = people.len();
                self.apply(move |snap| extend_or_replace(snap.people_mut(person_type), people, mode));
                (rows, count)
            }
            ImportKind::Courses => {
                let courses: Vec<Course> = decode_all(kind, records)?;
                let rows = to_rows(&courses);
                let count = courses.len();
                self.apply(move |snap| extend_or_replace(&mut snap.courses, courses, mode));
                (rows, count)
            }
            ImportKind::Sessions => {
                let sessions: Vec<Session> = decode_all(kind, records)?;
                let rows = to_rows(&sessions);
                let count = sessions.len();
                self.apply(move |snap| {
                    extend_or_replace(&mut snap.sessions, sessions, mode);
                    snap.courses = recompute_all_course_stats(&snap.courses, &snap.sessions);
                });
                (rows, count)
            }
        };

        tracing::info!("Imported {} {} locally ({})", count, kind, mode);

        let sync = self.spawn_import_sync(kind, mode, rows, count);
        Ok(ImportReport {
            kind,
            mode,
            count,
            sync,
        })
    }

    fn spawn_import_sync(
        &self,
        kind: ImportKind,
        mode: ImportMode,
        rows: Result<Vec<Row>, RemoteError>,
        count: usize,
    ) -> PendingSync {
        let store = self.clone();
        let handle = tokio::spawn(async move {
            let result = replay(&store, kind, mode, rows).await;
            match result {
                Ok(()) => {
                    tracing::info!("Synced {} imported {} to {}", count, kind, store.remote().name());
                    store.emit(SyncEvent::ImportSynced { kind, count });
                    SyncOutcome::Synced
                }
                Err(error) => {
                    tracing::warn!("Import sync of {} failed, local data kept: {}", kind, error);
                    store.emit(SyncEvent::ImportFailed {
                        kind,
                        message: error.user_message(),
                    });
                    SyncOutcome::Failed(error)
                }
            }
        });
        PendingSync::new(handle)
    }
}

async fn replay(
    store: &SyncStore,
    kind: ImportKind,
    mode: ImportMode,
    rows: Result<Vec<Row>, RemoteError>,
) -> Result<(), RemoteError> {
    let rows = rows?;
    let remote = store.remote();
    let table = kind.table();

    if mode == ImportMode::Replace {
        remote.delete(table, &kind.replace_scope()).await?;
    }
    if !rows.is_empty() {
        remote.insert(table, rows).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryStore, Op};
    use serde_json::json;
    use std::sync::Arc;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(row) => row,
            _ => panic!("not an object"),
        }
    }

    struct TestContext {
        store: SyncStore,
        remote: Arc<MemoryStore>,
    }

    async fn setup(remote: MemoryStore) -> TestContext {
        let remote = Arc::new(remote);
        let store = SyncStore::new(remote.clone());
        store.load().await;
        TestContext { store, remote }
    }

    fn staffed() -> MemoryStore {
        MemoryStore::new().with_rows(
            Table::People,
            vec![
                row(json!({ "id": "t1", "type": "Teacher", "name": "Grace" })),
                row(json!({ "id": "a1", "type": "TA", "name": "Alan" })),
                row(json!({ "id": "a2", "type": "TA", "name": "Ada" })),
            ],
        )
    }

    #[test]
    fn test_parse_kind_and_mode() {
        assert_eq!("Sessions".parse::<ImportKind>().unwrap(), ImportKind::Sessions);
        assert_eq!("ta".parse::<ImportKind>().unwrap(), ImportKind::Assistants);
        assert!("rooms".parse::<ImportKind>().is_err());
        assert_eq!("REPLACE".parse::<ImportMode>().unwrap(), ImportMode::Replace);
        assert!("merge".parse::<ImportMode>().is_err());
    }

    #[tokio::test]
    async fn test_replace_teachers_keeps_assistants() {
        let ctx = setup(staffed()).await;

        let report = ctx
            .store
            .import_data(
                ImportKind::Teachers,
                vec![json!({ "id": "t9", "name": "Barbara" })],
                ImportMode::Replace,
            )
            .unwrap();
        let snap = ctx.store.snapshot();
        assert_eq!(snap.teachers.len(), 1);
        assert_eq!(snap.teachers[0].id, "t9");
        assert_eq!(snap.assistants.len(), 2);

        assert!(report.sync.settled().await.is_synced());

        let remote_ids: Vec<Value> = ctx
            .remote
            .rows(Table::People)
            .into_iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(remote_ids, vec![json!("a1"), json!("a2"), json!("t9")]);
    }

    #[tokio::test]
    async fn test_replace_assistants_keeps_teachers() {
        let ctx = setup(staffed()).await;

        ctx.store
            .import_data(ImportKind::Assistants, vec![], ImportMode::Replace)
            .unwrap()
            .sync
            .settled()
            .await;

        let snap = ctx.store.snapshot();
        assert!(snap.assistants.is_empty());
        assert_eq!(snap.teachers.len(), 1);
        let remote = ctx.remote.rows(Table::People);
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0]["type"], json!("Teacher"));
        // Nothing to insert after the scoped delete
        assert!(!ctx.remote.log().iter().any(|r| r.op == Op::Insert));
    }

    #[tokio::test]
    async fn test_append_people_only_inserts() {
        let ctx = setup(staffed()).await;

        let report = ctx
            .store
            .import_data(
                ImportKind::Assistants,
                vec![json!({ "name": "Linus", "sessionCount": 4, "durationHours": 2 })],
                ImportMode::Append,
            )
            .unwrap();
        report.sync.settled().await;

        let snap = ctx.store.snapshot();
        assert_eq!(snap.assistants.len(), 3);
        let linus = snap.assistants.iter().find(|p| p.name == "Linus").unwrap();
        assert_eq!(linus.kind, PersonType::Assistant);
        assert!(linus.extra.get("sessionCount").is_none());
        assert!(linus.extra.get("durationHours").is_none());

        assert!(!ctx.remote.log().iter().any(|r| r.op == Op::Delete));
        let stored = ctx
            .remote
            .rows(Table::People)
            .into_iter()
            .find(|r| r["name"] == json!("Linus"))
            .unwrap();
        assert!(stored.get("sessionCount").is_none());
        assert_eq!(stored["type"], json!("TA"));
    }

    #[tokio::test]
    async fn test_replace_sessions_recomputes_all_courses() {
        let remote = MemoryStore::new()
            .with_rows(
                Table::Courses,
                vec![
                    row(json!({ "id": "c1", "name": "Algebra" })),
                    row(json!({ "id": "c2", "name": "Biology" })),
                ],
            )
            .with_rows(
                Table::Sessions,
                vec![row(json!({ "id": "old", "courseId": "c2", "durationHours": 5 }))],
            );
        let ctx = setup(remote).await;
        assert_eq!(ctx.store.snapshot().course("c2").unwrap().total_hours, 5.0);

        let report = ctx
            .store
            .import_data(
                ImportKind::Sessions,
                vec![
                    json!({ "courseId": "c1", "durationHours": "1.25", "sequence": 1 }),
                    json!({ "courseId": "c1", "teacherIds": "t1" }),
                ],
                ImportMode::Replace,
            )
            .unwrap();

        let snap = ctx.store.snapshot();
        let missing = snap.sessions.iter().find(|s| s.sequence == 0).unwrap();
        assert_eq!(missing.duration_hours, 0.0);
        assert_eq!(missing.teacher_ids, vec!["t1".to_string()]);

        let c1 = snap.course("c1").unwrap();
        assert_eq!(c1.session_count, 2);
        assert_eq!(c1.total_hours, 1.25);
        let c2 = snap.course("c2").unwrap();
        assert_eq!((c2.session_count, c2.total_hours), (0, 0.0));

        assert!(report.sync.settled().await.is_synced());
        let rows = ctx.remote.rows(Table::Sessions);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["courseId"] == json!("c1")));
    }

    #[tokio::test]
    async fn test_imported_courses_start_with_zero_stats() {
        let ctx = setup(MemoryStore::new()).await;

        ctx.store
            .import_data(
                ImportKind::Courses,
                vec![json!({ "id": "c1", "name": "Algebra", "sessionCount": 7, "totalHours": 12 })],
                ImportMode::Append,
            )
            .unwrap();

        let snap = ctx.store.snapshot();
        let c1 = snap.course("c1").unwrap();
        assert_eq!((c1.session_count, c1.total_hours), (0, 0.0));
    }

    #[tokio::test]
    async fn test_failed_replay_keeps_local_import() {
        let ctx = setup(MemoryStore::new()).await;
        ctx.remote.fail(
            Table::Courses,
            Op::Insert,
            RemoteError::from_payload(json!({
                "message": "permission denied for table courses",
                "hint": "check row level security"
            })),
        );
        let mut events = ctx.store.events();

        let report = ctx
            .store
            .import_data(
                ImportKind::Courses,
                vec![json!({ "id": "c1", "name": "Algebra" })],
                ImportMode::Replace,
            )
            .unwrap();

        assert!(!report.sync.settled().await.is_synced());
        assert_eq!(ctx.store.snapshot().courses.len(), 1);

        match events.recv().await.unwrap() {
            SyncEvent::ImportFailed { kind, message } => {
                assert_eq!(kind, ImportKind::Courses);
                assert_eq!(
                    message,
                    "permission denied for table courses | check row level security"
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_loose_records_import() {
        let ctx = setup(MemoryStore::new()).await;

        ctx.store
            .import_data(
                ImportKind::Courses,
                vec![json!({ "id": "c1", "name": null })],
                ImportMode::Append,
            )
            .unwrap();
        let report = ctx
            .store
            .import_data(
                ImportKind::Sessions,
                vec![
                    json!({ "courseId": "c1", "durationHours": 1, "date": "" }),
                    json!({ "courseId": "c1", "durationHours": "2.5", "date": "2025-03-04T09:00:00" }),
                    json!({ "courseId": "c1", "durationHours": "-2", "topic": null }),
                ],
                ImportMode::Append,
            )
            .unwrap();
        assert_eq!(report.count, 3);

        let snap = ctx.store.snapshot();
        assert_eq!(snap.course("c1").unwrap().name, "");
        let dated: Vec<_> = snap.sessions.iter().filter_map(|s| s.date).collect();
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].to_string(), "2025-03-04");
        assert!(snap.sessions.iter().all(|s| s.duration_hours >= 0.0));

        let c1 = snap.course("c1").unwrap();
        assert_eq!((c1.session_count, c1.total_hours), (3, 3.5));
    }

    #[tokio::test]
    async fn test_invalid_record_rejects_whole_import() {
        let ctx = setup(staffed()).await;
        let before = ctx.store.snapshot();

        let err = ctx
            .store
            .import_data(
                ImportKind::Sessions,
                vec![json!({ "courseId": "c1" }), json!("not a record")],
                ImportMode::Replace,
            )
            .unwrap_err();
        assert_eq!(err, ImportError::NotAnObject { index: 1 });

        let err = ctx
            .store
            .import_data(ImportKind::Sessions, vec![json!({ "topic": "no course" })], ImportMode::Append)
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidRecord { index: 0, .. }));

        assert_eq!(ctx.store.snapshot(), before);
        assert!(ctx.remote.log().iter().all(|r| r.op == Op::Select));
    }
}
