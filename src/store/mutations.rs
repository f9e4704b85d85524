//! Optimistic create/update/delete for people, courses and sessions.
//!
//! Each method changes the local snapshot before returning and only then
//! issues the remote write. The returned [`PendingSync`] may be ignored.

use crate::models::{Course, Person, Record, Session};
use crate::remote::{Filter, Table};

use super::aggregate::{course_stats, recompute_course_stats};
use super::{PendingSync, Snapshot, SyncStore, WriteOp};

fn refresh_stats(snap: &mut Snapshot, course_id: &str) {
    snap.courses = recompute_course_stats(&snap.courses, &snap.sessions, course_id);
}

impl SyncStore {
    fn remote_insert<T: Record>(&self, table: Table, record: T) -> PendingSync {
        let remote = self.remote.clone();
        let id = record.id().to_string();
        self.spawn_write(table, WriteOp::Insert, id, async move {
            let row = record.to_row()?;
            remote.insert(table, vec![row]).await
        })
    }

    fn remote_update<T: Record>(&self, table: Table, record: T) -> PendingSync {
        let remote = self.remote.clone();
        let id = record.id().to_string();
        let target = id.clone();
        self.spawn_write(table, WriteOp::Update, id, async move {
            let patch = record.to_update_row()?;
            remote.update(table, patch, &target).await
        })
    }

    fn remote_delete(&self, table: Table, id: &str) -> PendingSync {
        let remote = self.remote.clone();
        let filter = Filter::id(id);
        self.spawn_write(table, WriteOp::Delete, id.to_string(), async move {
            remote.delete(table, &filter).await
        })
    }

    // ========== People ==========

    /// Adds a teacher or assistant, filed by its `kind`.
    pub fn add_person(&self, person: Person) -> PendingSync {
        let local = person.clone();
        self.apply(move |snap| snap.people_mut(local.kind).push(local));
        self.remote_insert(Table::People, person)
    }

    /// Replaces the person with the same id in whichever collection holds it.
    pub fn update_person(&self, person: Person) -> PendingSync {
        let local = person.clone();
        self.apply(move |snap| {
            let slot = snap
                .teachers
                .iter_mut()
                .chain(snap.assistants.iter_mut())
                .find(|p| p.id == local.id);
            match slot {
                Some(existing) => *existing = local,
                None => tracing::debug!("Person {} not held locally", local.id),
            }
        });
        self.remote_update(Table::People, person)
    }

    pub fn delete_person(&self, id: &str) -> PendingSync {
        self.apply(|snap| {
            snap.teachers.retain(|p| p.id != id);
            snap.assistants.retain(|p| p.id != id);
        });
        self.remote_delete(Table::People, id)
    }

    // ========== Courses ==========

    /// Adds a course. Its stats start from the sessions already held for it,
    /// whatever values the caller put in.
    pub fn add_course(&self, course: Course) -> PendingSync {
        let mut stored = course;
        self.apply(|snap| {
            let (count, total) = course_stats(&snap.sessions, &stored.id);
            stored.session_count = count;
            stored.total_hours = total;
            snap.courses.push(stored.clone());
        });
        self.remote_insert(Table::Courses, stored)
    }

    /// Replaces course metadata. Derived stats stay as currently held.
    ///
    /// For a course not held locally the stats columns are left out of the
    /// remote patch.
    pub fn update_course(&self, course: Course) -> PendingSync {
        let mut stored = course;
        let mut held = false;
        self.apply(|snap| {
            if let Some(existing) = snap.courses.iter_mut().find(|c| c.id == stored.id) {
                stored.session_count = existing.session_count;
                stored.total_hours = existing.total_hours;
                *existing = stored.clone();
                held = true;
            } else {
                tracing::debug!("Course {} not held locally", stored.id);
            }
        });
        if held {
            return self.remote_update(Table::Courses, stored);
        }

        let remote = self.remote.clone();
        let id = stored.id.clone();
        self.spawn_write(Table::Courses, WriteOp::Update, id.clone(), async move {
            let mut patch = stored.to_update_row()?;
            patch.remove("sessionCount");
            patch.remove("totalHours");
            remote.update(Table::Courses, patch, &id).await
        })
    }

    /// Deletes a course and every session referencing it.
    ///
    /// Remotely the sessions go first; if that fails the course row is kept so
    /// no session rows are left pointing at a missing course.
    pub fn delete_course(&self, id: &str) -> PendingSync {
        self.apply(|snap| {
            snap.courses.retain(|c| c.id != id);
            snap.sessions.retain(|s| s.course_id != id);
        });

        let remote = self.remote.clone();
        let sessions = Filter::eq("courseId", id);
        let course = Filter::id(id);
        self.spawn_write(Table::Courses, WriteOp::Delete, id.to_string(), async move {
            remote.delete(Table::Sessions, &sessions).await?;
            remote.delete(Table::Courses, &course).await
        })
    }

    // ========== Sessions ==========

    pub fn add_session(&self, session: Session) -> PendingSync {
        let local = session.clone();
        self.apply(move |snap| {
            let course_id = local.course_id.clone();
            snap.sessions.push(local);
            refresh_stats(snap, &course_id);
        });
        self.remote_insert(Table::Sessions, session)
    }

    /// Replaces a session and re-derives stats for its course, and for the
    /// course it previously belonged to when that changed.
    pub fn update_session(&self, session: Session) -> PendingSync {
        let local = session.clone();
        self.apply(move |snap| {
            let course_id = local.course_id.clone();
            let mut previous = None;
            if let Some(existing) = snap.sessions.iter_mut().find(|s| s.id == local.id) {
                previous = Some(existing.course_id.clone());
                *existing = local;
            } else {
                tracing::debug!("Session {} not held locally", local.id);
            }

            refresh_stats(snap, &course_id);
            if let Some(previous) = previous.filter(|p| *p != course_id) {
                refresh_stats(snap, &previous);
            }
        });
        self.remote_update(Table::Sessions, session)
    }

    pub fn delete_session(&self, id: &str) -> PendingSync {
        self.apply(|snap| {
            let course_id = snap.session(id).map(|s| s.course_id.clone());
            snap.sessions.retain(|s| s.id != id);
            if let Some(course_id) = course_id {
                refresh_stats(snap, &course_id);
            }
        });
        self.remote_delete(Table::Sessions, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonType;
    use crate::remote::{MemoryStore, Op, RemoteError};
    use crate::store::{SyncEvent, SyncOutcome};
    use serde_json::json;
    use std::sync::Arc;

    struct TestContext {
        store: SyncStore,
        remote: Arc<MemoryStore>,
    }

    async fn setup() -> TestContext {
        let remote = Arc::new(MemoryStore::new());
        let store = SyncStore::new(remote.clone());
        store.load().await;
        TestContext { store, remote }
    }

    fn assert_stats_consistent(snap: &Snapshot) {
        for course in &snap.courses {
            let (count, total) = course_stats(&snap.sessions, &course.id);
            assert_eq!(course.session_count, count, "count of {}", course.id);
            assert_eq!(course.total_hours, total, "hours of {}", course.id);
        }
    }

    #[tokio::test]
    async fn test_two_sessions_scenario() {
        let ctx = setup().await;
        let store = &ctx.store;

        store.add_course(Course::new("Algebra").with_id("C1"));
        store.add_session(Session::new("C1", 1.5).with_id("s1"));
        store.add_session(Session::new("C1", 2.333).with_id("s2"));

        let snap = store.snapshot();
        let c1 = snap.course("C1").unwrap();
        assert_eq!(c1.session_count, 2);
        assert_eq!(c1.total_hours, 3.83);
    }

    #[tokio::test]
    async fn test_local_change_visible_before_remote_write() {
        let ctx = setup().await;

        let pending = ctx.store.add_course(Course::new("Algebra").with_id("c1"));

        // The spawned write has not run yet on the current-thread runtime
        assert!(ctx.store.snapshot().course("c1").is_some());
        assert!(ctx.remote.rows(Table::Courses).is_empty());

        assert_eq!(pending.settled().await, SyncOutcome::Synced);
        assert_eq!(ctx.remote.rows(Table::Courses).len(), 1);
    }

    #[tokio::test]
    async fn test_add_course_ignores_caller_stats() {
        let ctx = setup().await;
        let mut course = Course::new("Algebra").with_id("c1");
        course.session_count = 12;
        course.total_hours = 30.0;

        ctx.store.add_course(course).settled().await;

        let snap = ctx.store.snapshot();
        assert_eq!(snap.course("c1").unwrap().session_count, 0);
        let rows = ctx.remote.rows(Table::Courses);
        assert_eq!(rows[0]["sessionCount"], json!(0));
    }

    #[tokio::test]
    async fn test_stats_consistent_after_every_session_op() {
        let ctx = setup().await;
        let store = &ctx.store;
        store.add_course(Course::new("A").with_id("A"));
        store.add_course(Course::new("B").with_id("B"));

        store.add_session(Session::new("A", 1.25).with_id("s1"));
        assert_stats_consistent(&store.snapshot());
        store.add_session(Session::new("A", 0.5).with_id("s2"));
        assert_stats_consistent(&store.snapshot());
        store.add_session(Session::new("B", 3.0).with_id("s3"));
        assert_stats_consistent(&store.snapshot());
        store.update_session(Session::new("A", 2.0).with_id("s2"));
        assert_stats_consistent(&store.snapshot());
        store.update_session(Session::new("B", 1.0).with_id("s1"));
        assert_stats_consistent(&store.snapshot());
        store.delete_session("s3");
        assert_stats_consistent(&store.snapshot());
        store.delete_session("missing");
        assert_stats_consistent(&store.snapshot());

        let snap = store.snapshot();
        assert_eq!(snap.course("A").unwrap().total_hours, 2.0);
        assert_eq!(snap.course("B").unwrap().session_count, 1);
    }

    #[tokio::test]
    async fn test_moving_session_recomputes_both_courses() {
        let ctx = setup().await;
        let store = &ctx.store;
        store.add_course(Course::new("A").with_id("A"));
        store.add_course(Course::new("B").with_id("B"));
        store.add_session(Session::new("A", 2.0).with_id("s1"));

        store.update_session(Session::new("B", 2.0).with_id("s1"));

        let snap = store.snapshot();
        let a = snap.course("A").unwrap();
        let b = snap.course("B").unwrap();
        assert_eq!((a.session_count, a.total_hours), (0, 0.0));
        assert_eq!((b.session_count, b.total_hours), (1, 2.0));
    }

    #[tokio::test]
    async fn test_update_session_sends_all_fields_but_id() {
        let ctx = setup().await;
        ctx.store.add_course(Course::new("A").with_id("A"));
        ctx.store
            .add_session(Session::new("A", 1.0).with_id("s1"))
            .settled()
            .await;

        let outcome = ctx
            .store
            .update_session(Session::new("A", 4.5).with_id("s1").with_topic("Review"))
            .settled()
            .await;

        assert!(outcome.is_synced());
        let rows = ctx.remote.rows(Table::Sessions);
        assert_eq!(rows[0]["durationHours"], json!(4.5));
        assert_eq!(rows[0]["topic"], json!("Review"));
        assert_eq!(rows[0]["id"], json!("s1"));
    }

    #[tokio::test]
    async fn test_delete_course_cascades_only_its_sessions() {
        let ctx = setup().await;
        let store = &ctx.store;
        store.add_course(Course::new("A").with_id("A"));
        store.add_course(Course::new("B").with_id("B"));
        store.add_session(Session::new("A", 1.0).with_id("a1"));
        store.add_session(Session::new("A", 1.0).with_id("a2"));
        store
            .add_session(Session::new("B", 2.5).with_id("b1"))
            .settled()
            .await;
        let b_before = store.snapshot().course("B").cloned();

        let outcome = store.delete_course("A").settled().await;

        let snap = store.snapshot();
        assert!(snap.course("A").is_none());
        let ids: Vec<&str> = snap.sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b1"]);
        assert_eq!(snap.course("B").cloned(), b_before);

        assert!(outcome.is_synced());
        assert_eq!(ctx.remote.rows(Table::Sessions).len(), 1);
        assert_eq!(ctx.remote.rows(Table::Courses).len(), 1);

        let deletes: Vec<Table> = ctx
            .remote
            .log()
            .iter()
            .filter(|r| r.op == Op::Delete)
            .map(|r| r.table)
            .collect();
        assert_eq!(deletes, vec![Table::Sessions, Table::Courses]);
    }

    #[tokio::test]
    async fn test_failed_session_cascade_keeps_remote_course() {
        let ctx = setup().await;
        ctx.store.add_course(Course::new("A").with_id("A"));
        ctx.store
            .add_session(Session::new("A", 1.0).with_id("a1"))
            .settled()
            .await;
        ctx.remote.fail(
            Table::Sessions,
            Op::Delete,
            RemoteError::Message("permission denied".into()),
        );

        let outcome = ctx.store.delete_course("A").settled().await;

        assert!(!outcome.is_synced());
        // Local delete stands, remote keeps both rows
        assert!(ctx.store.snapshot().course("A").is_none());
        assert_eq!(ctx.remote.rows(Table::Courses).len(), 1);
        assert_eq!(ctx.remote.rows(Table::Sessions).len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_roll_back() {
        let ctx = setup().await;
        ctx.remote.fail(
            Table::People,
            Op::Insert,
            RemoteError::from_payload(json!({ "message": "JWT expired" })),
        );
        let mut events = ctx.store.events();

        let outcome = ctx
            .store
            .add_person(Person::teacher("Grace").with_id("t1"))
            .settled()
            .await;

        assert!(matches!(outcome, SyncOutcome::Failed(_)));
        assert_eq!(ctx.store.snapshot().teachers.len(), 1);
        assert!(ctx.remote.rows(Table::People).is_empty());

        match events.recv().await.unwrap() {
            SyncEvent::WriteFailed { table, op, id, .. } => {
                assert_eq!(table, Table::People);
                assert_eq!(op, WriteOp::Insert);
                assert_eq!(id, "t1");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_people_filed_by_type() {
        let ctx = setup().await;
        let store = &ctx.store;

        store.add_person(Person::teacher("Grace").with_id("t1"));
        store.add_person(Person::assistant("Alan").with_id("a1"));

        let snap = store.snapshot();
        assert_eq!(snap.people(PersonType::Teacher).len(), 1);
        assert_eq!(snap.people(PersonType::Assistant)[0].id, "a1");
    }

    #[tokio::test]
    async fn test_update_person_in_its_collection() {
        let ctx = setup().await;
        let store = &ctx.store;
        store.add_person(Person::teacher("Grace").with_id("t1"));
        store
            .add_person(Person::assistant("Alan").with_id("a1"))
            .settled()
            .await;

        store
            .update_person(Person::assistant("Alan T.").with_id("a1").with_email("alan@example.com"))
            .settled()
            .await;

        let snap = store.snapshot();
        assert_eq!(snap.assistants[0].name, "Alan T.");
        assert_eq!(snap.teachers[0].name, "Grace");
        let rows = ctx.remote.rows(Table::People);
        let alan = rows.iter().find(|r| r["id"] == json!("a1")).unwrap();
        assert_eq!(alan["email"], json!("alan@example.com"));
    }

    #[tokio::test]
    async fn test_delete_person() {
        let ctx = setup().await;
        let store = &ctx.store;
        store
            .add_person(Person::assistant("Alan").with_id("a1"))
            .settled()
            .await;

        store.delete_person("a1").settled().await;

        assert!(store.snapshot().assistants.is_empty());
        assert!(ctx.remote.rows(Table::People).is_empty());
    }

    #[tokio::test]
    async fn test_update_course_keeps_derived_stats() {
        let ctx = setup().await;
        let store = &ctx.store;
        store.add_course(Course::new("Algebra").with_id("c1"));
        store.add_session(Session::new("c1", 1.5).with_id("s1"));

        let mut edited = Course::new("Algebra II").with_id("c1").with_code("MATH-2");
        edited.total_hours = 100.0;
        store.update_course(edited).settled().await;

        let snap = store.snapshot();
        let c1 = snap.course("c1").unwrap();
        assert_eq!(c1.name, "Algebra II");
        assert_eq!(c1.session_count, 1);
        assert_eq!(c1.total_hours, 1.5);
    }

    #[tokio::test]
    async fn test_update_unheld_course_leaves_remote_stats() {
        let mut stats = crate::models::Row::new();
        stats.insert("id".into(), json!("c9"));
        stats.insert("name".into(), json!("Chemistry"));
        stats.insert("sessionCount".into(), json!(4));
        stats.insert("totalHours".into(), json!(6.5));
        let remote = Arc::new(MemoryStore::new().with_rows(Table::Courses, vec![stats]));
        // Never loaded, so c9 is not held locally
        let store = SyncStore::new(remote.clone());

        let mut edited = Course::new("Chemistry II").with_id("c9");
        edited.session_count = 40;
        edited.total_hours = 100.0;
        assert!(store.update_course(edited).settled().await.is_synced());

        assert!(store.snapshot().course("c9").is_none());
        let row = &remote.rows(Table::Courses)[0];
        assert_eq!(row["name"], json!("Chemistry II"));
        assert_eq!(row["sessionCount"], json!(4));
        assert_eq!(row["totalHours"], json!(6.5));
    }

    #[tokio::test]
    async fn test_negative_duration_counts_as_zero() {
        let ctx = setup().await;
        ctx.store.add_course(Course::new("Algebra").with_id("c1"));
        ctx.store.add_session(Session::new("c1", 2.0).with_id("s1"));
        ctx.store.add_session(Session::new("c1", -5.0).with_id("s2"));

        let snap = ctx.store.snapshot();
        let c1 = snap.course("c1").unwrap();
        assert_eq!((c1.session_count, c1.total_hours), (2, 2.0));
    }

    #[tokio::test]
    async fn test_reload_restores_remote_truth() {
        let ctx = setup().await;
        ctx.remote.fail(
            Table::Courses,
            Op::Insert,
            RemoteError::Message("offline".into()),
        );
        ctx.store
            .add_course(Course::new("Ghost").with_id("g1"))
            .settled()
            .await;
        assert!(ctx.store.snapshot().course("g1").is_some());

        ctx.remote.clear_failures();
        ctx.store.load().await;

        assert!(ctx.store.snapshot().course("g1").is_none());
    }
}
