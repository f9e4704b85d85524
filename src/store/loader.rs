use crate::models::{Course, Person, PersonType, Record, Session};
use crate::remote::{Filter, RemoteError, Table};

use super::aggregate::recompute_all_course_stats;
use super::{LoadReport, SyncEvent, SyncStore};

/// Rows of one table decoded into entities, plus how many were unreadable.
struct Fetched<T> {
    records: Vec<T>,
    skipped: usize,
}

impl SyncStore {
    /// Replaces the local collections with the current remote contents.
    ///
    /// The three tables are read concurrently. A table whose read fails is
    /// loaded as empty with a warning; the others still load. Stored course
    /// stats are discarded and re-derived from the fetched sessions.
    pub async fn load(&self) -> LoadReport {
        self.apply(|snap| snap.loading = true);

        let (people, courses, sessions) = futures::join!(
            self.fetch::<Person>(Table::People),
            self.fetch::<Course>(Table::Courses),
            self.fetch::<Session>(Table::Sessions),
        );

        let mut report = LoadReport::default();
        let people = settle(Table::People, people, &mut report);
        let courses = settle(Table::Courses, courses, &mut report);
        let sessions = settle(Table::Sessions, sessions, &mut report);

        let (teachers, assistants): (Vec<Person>, Vec<Person>) = people
            .into_iter()
            .partition(|p| p.kind == PersonType::Teacher);
        let courses = recompute_all_course_stats(&courses, &sessions);

        report.teachers = teachers.len();
        report.assistants = assistants.len();
        report.courses = courses.len();
        report.sessions = sessions.len();

        self.apply(move |snap| {
            snap.teachers = teachers;
            snap.assistants = assistants;
            snap.courses = courses;
            snap.sessions = sessions;
            snap.loading = false;
        });

        tracing::info!(
            "Loaded {} teacher(s), {} assistant(s), {} course(s), {} session(s) from {}",
            report.teachers,
            report.assistants,
            report.courses,
            report.sessions,
            self.remote.name()
        );
        self.emit(SyncEvent::Loaded(report.clone()));

        report
    }

    async fn fetch<T: Record>(&self, table: Table) -> Result<Fetched<T>, RemoteError> {
        let rows = self.remote.select(table, &Filter::All).await?;
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;

        for row in rows {
            let id = row
                .get("id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<no id>".to_string());
            match T::from_row(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable {} row {}: {}", table, id, e);
                    skipped += 1;
                }
            }
        }

        Ok(Fetched { records, skipped })
    }
}

fn settle<T>(
    table: Table,
    result: Result<Fetched<T>, RemoteError>,
    report: &mut LoadReport,
) -> Vec<T> {
    match result {
        Ok(fetched) => {
            report.skipped_rows += fetched.skipped;
            fetched.records
        }
        Err(e) => {
            tracing::warn!("Failed to load {}, continuing with none: {}", table, e);
            report.failed_tables.push(table);
            Vec::new()
        }
    }
}
